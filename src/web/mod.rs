//! Embedded subfilter dashboard.
//!
//! A lightweight HTTP server (sync, via `tiny_http`) that serves:
//! - the rendered view page with its subfilter panel
//! - JSON endpoints to read the panel and to set, unset or clear values
//!
//! Launched via `subfilter serve` (default: `http://127.0.0.1:9747`).

mod api;
pub mod frontend;

use std::io::{Cursor, Read};

use anyhow::Result;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::app::FileEngine;
use crate::error::SubfilterError;
use crate::view::{RenderContext, ViewKind};

// ---------------------------------------------------------------------------
// Server entry point
// ---------------------------------------------------------------------------

/// Serve the dashboard on `addr`. Blocks the current thread and handles
/// requests one at a time; a failing request gets a JSON error response.
pub fn serve(addr: &str, mut engine: FileEngine, ctx: RenderContext, default_view: ViewKind) -> Result<()> {
    let server = Server::http(addr)
        .map_err(|e| anyhow::anyhow!("failed to start HTTP server on {addr}: {e}"))?;

    info!(addr, records = engine.source().len(), "subfilter dashboard started");
    println!("subfilter dashboard running at http://{addr}");
    println!("Press Ctrl+C to stop.\n");

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();

        let response = match read_body(&method, request.as_reader()) {
            Ok(body) => match dispatch(&mut engine, &ctx, default_view, &method, &url, body.as_deref()) {
                Ok(resp) => resp,
                Err(e) => error_response(&e),
            },
            Err(e) => {
                warn!(%method, url, error = %e, "unreadable request body");
                json_error(400, &format!("unreadable request body: {e}"))
            }
        };
        let status = response.status_code().0;
        let _ = request.respond(response);

        debug!(%method, url, status, "handled request");
    }

    Ok(())
}

/// Body of a request that carries one; must be valid UTF-8.
fn read_body(method: &Method, reader: &mut dyn Read) -> std::io::Result<Option<String>> {
    if !matches!(method, Method::Put | Method::Post | Method::Patch) {
        return Ok(None);
    }
    let mut buf = String::new();
    reader.read_to_string(&mut buf)?;
    Ok(Some(buf))
}

fn error_response(error: &anyhow::Error) -> Response<Cursor<Vec<u8>>> {
    json_error(status_for(error), &format!("{error:#}"))
}

fn json_error(status: u16, message: &str) -> Response<Cursor<Vec<u8>>> {
    let body = serde_json::json!({ "error": message }).to_string();
    let resp = Response::from_data(body.into_bytes()).with_status_code(StatusCode(status));
    match content_type_json() {
        Ok(header) => resp.with_header(header),
        Err(_) => resp,
    }
}

/// HTTP status for a failed request.
fn status_for(error: &anyhow::Error) -> u16 {
    match error.downcast_ref::<SubfilterError>() {
        Some(SubfilterError::AccessDenied { .. }) => 403,
        Some(
            SubfilterError::UnknownView(_)
            | SubfilterError::UnknownDimension(_)
            | SubfilterError::UnknownSeverity(_)
            | SubfilterError::UnknownOperator(_)
            | SubfilterError::InvalidTagCondition(_),
        ) => 400,
        _ if error.downcast_ref::<serde_json::Error>().is_some() => 400,
        _ => 500,
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn dispatch(
    engine: &mut FileEngine,
    ctx: &RenderContext,
    default_view: ViewKind,
    method: &Method,
    url: &str,
    body: Option<&str>,
) -> Result<Response<Cursor<Vec<u8>>>> {
    let path = url.split('?').next().unwrap_or(url);
    let body = body.unwrap_or("");

    match (method, path) {
        (&Method::Get, "/") | (&Method::Get, "/index.html") => {
            let view = api::view_param(url, default_view)?;
            let rendered = engine.render_pass(ctx, view)?;
            html_response(frontend::page(&rendered))
        }

        (&Method::Get, "/api/subfilter") => api::get_subfilter(engine, ctx, url, default_view),
        (&Method::Post, "/api/subfilter/set") => api::post_action(engine, ctx, body, true, default_view),
        (&Method::Post, "/api/subfilter/unset") => api::post_action(engine, ctx, body, false, default_view),
        (&Method::Post, "/api/subfilter/clear") => api::post_clear(engine, ctx, body, default_view),

        (&Method::Get, "/api/health") => api::get_health(engine, ctx),

        _ => not_found(),
    }
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn html_response(html: String) -> Result<Response<Cursor<Vec<u8>>>> {
    Ok(Response::from_data(html.into_bytes())
        .with_header(content_type_html()?)
        .with_status_code(StatusCode(200)))
}

fn not_found() -> Result<Response<Cursor<Vec<u8>>>> {
    let body = r#"{"error": "not found"}"#;
    Ok(Response::from_data(body.as_bytes().to_vec())
        .with_header(content_type_json()?)
        .with_status_code(StatusCode(404)))
}

pub(crate) fn content_type_json() -> Result<Header> {
    content_type("application/json; charset=utf-8")
}

fn content_type_html() -> Result<Header> {
    content_type("text/html; charset=utf-8")
}

fn content_type(value: &str) -> Result<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes())
        .map_err(|()| anyhow::anyhow!("invalid Content-Type header: {value}"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
