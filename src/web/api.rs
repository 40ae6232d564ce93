//! JSON API handlers for the dashboard.
//!
//! Each handler returns a `Response<Cursor<Vec<u8>>>` with JSON content.

use std::io::Cursor;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, StatusCode};

use crate::app::FileEngine;
use crate::engine::DimensionKey;
use crate::view::{RenderContext, ViewKind};

use super::content_type_json;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Body of `POST /api/subfilter/set` and `/unset`.
#[derive(Debug, Deserialize)]
struct ActionRequest {
    #[serde(default)]
    view: Option<String>,
    dimension: String,
    value: String,
}

/// Body of `POST /api/subfilter/clear`.
#[derive(Debug, Default, Deserialize)]
struct ClearRequest {
    #[serde(default)]
    view: Option<String>,
}

#[derive(Debug, Serialize)]
struct ActionResponse {
    view: ViewKind,
    dimension: Option<String>,
    value: Option<String>,
    changed: bool,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    records: usize,
    user: String,
    profiles_path: String,
    audit_log: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn json_response<T: Serialize>(data: &T) -> Result<Response<Cursor<Vec<u8>>>> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json()?)
        .with_status_code(StatusCode(200)))
}

/// Value of a query parameter, e.g. `view` from `/?view=items`.
pub(crate) fn query_param<'a>(url: &'a str, name: &str) -> Option<&'a str> {
    url.split_once('?')?.1.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == name && !v.is_empty()).then_some(v)
    })
}

/// The `view` query parameter, or `default` when absent.
pub(crate) fn view_param(url: &str, default: ViewKind) -> Result<ViewKind> {
    match query_param(url, "view") {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(default),
    }
}

fn parse_view(raw: Option<&str>, default: ViewKind) -> Result<ViewKind> {
    match raw {
        Some(raw) if !raw.is_empty() => Ok(raw.parse()?),
        _ => Ok(default),
    }
}

// ---------------------------------------------------------------------------
// API handlers
// ---------------------------------------------------------------------------

/// `GET /api/subfilter?view=V`: rendered panel and filtered records.
pub fn get_subfilter(
    engine: &mut FileEngine,
    ctx: &RenderContext,
    url: &str,
    default_view: ViewKind,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let view = view_param(url, default_view)?;
    let rendered = engine.render_pass(ctx, view)?;
    json_response(&rendered)
}

/// `POST /api/subfilter/set` or `/unset`.
pub fn post_action(
    engine: &mut FileEngine,
    ctx: &RenderContext,
    body: &str,
    set: bool,
    default_view: ViewKind,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let req: ActionRequest =
        serde_json::from_str(body).context("invalid JSON in subfilter action request")?;
    let view = parse_view(req.view.as_deref(), default_view)?;
    let dimension: DimensionKey = req.dimension.parse()?;

    let changed = if set {
        engine.set(ctx, view, dimension, &req.value)?
    } else {
        engine.unset(ctx, view, &dimension, &req.value)?
    };

    json_response(&ActionResponse {
        view,
        dimension: Some(req.dimension),
        value: Some(req.value),
        changed,
    })
}

/// `POST /api/subfilter/clear`.
pub fn post_clear(
    engine: &mut FileEngine,
    ctx: &RenderContext,
    body: &str,
    default_view: ViewKind,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let req: ClearRequest = if body.trim().is_empty() {
        ClearRequest::default()
    } else {
        serde_json::from_str(body).context("invalid JSON in clear request")?
    };
    let view = parse_view(req.view.as_deref(), default_view)?;
    engine.clear(ctx, view)?;

    json_response(&ActionResponse {
        view,
        dimension: None,
        value: None,
        changed: true,
    })
}

/// `GET /api/health`.
pub fn get_health(engine: &FileEngine, ctx: &RenderContext) -> Result<Response<Cursor<Vec<u8>>>> {
    json_response(&HealthResponse {
        status: "ok",
        records: engine.source().len(),
        user: ctx.user_id().to_string(),
        profiles_path: engine.store().path().display().to_string(),
        audit_log: engine.audit().path().map(|p| p.display().to_string()),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_extracts_value() {
        assert_eq!(query_param("/?view=items", "view"), Some("items"));
        assert_eq!(query_param("/api/subfilter?x=1&view=hosts", "view"), Some("hosts"));
        assert_eq!(query_param("/api/subfilter", "view"), None);
        assert_eq!(query_param("/?view=", "view"), None);
    }

    #[test]
    fn view_param_defaults_and_validates() {
        assert_eq!(view_param("/", ViewKind::Problems).unwrap(), ViewKind::Problems);
        assert_eq!(view_param("/?view=charts", ViewKind::Latest).unwrap(), ViewKind::Charts);
        assert!(view_param("/?view=nope", ViewKind::Latest).is_err());
    }

    #[test]
    fn action_request_deserializes() {
        let req: ActionRequest =
            serde_json::from_str(r#"{"view": "items", "dimension": "tag_pair", "value": "[\"env\",\"prod\"]"}"#)
                .unwrap();
        assert_eq!(req.view.as_deref(), Some("items"));
        assert_eq!(req.dimension.parse::<DimensionKey>().unwrap(), DimensionKey::TagPair);
        assert_eq!(req.value, r#"["env","prod"]"#);
    }

    #[test]
    fn action_response_serializes() {
        let json = serde_json::to_string(&ActionResponse {
            view: ViewKind::Latest,
            dimension: Some("host".to_string()),
            value: Some("10084".to_string()),
            changed: true,
        })
        .unwrap();
        assert!(json.contains("\"view\":\"latest\""));
        assert!(json.contains("\"changed\":true"));
    }
}
