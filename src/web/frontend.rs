//! HTML for the subfilter dashboard.
//!
//! The page is rendered server-side from a [`SubfilterView`]. Facet links
//! carry their action in `data-*` attributes; a small inline script posts it
//! to the JSON API and reloads.

use std::fmt::Write;

use crate::engine::{FacetState, RenderedDimension, RenderedEntry, RenderedValue, SubfilterPanel, SubfilterView};
use crate::model::Record;
use crate::view::ViewKind;

const STYLE: &str = r#"
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; }
.app { max-width: 1200px; margin: 0 auto; padding: 24px; }
header { display: flex; align-items: center; justify-content: space-between; margin-bottom: 16px; padding-bottom: 16px; border-bottom: 1px solid var(--border); }
header h1 { font-size: 22px; font-weight: 600; }
nav a { color: var(--text-muted); margin-left: 16px; text-decoration: none; }
nav a.current { color: var(--accent); font-weight: 600; }
.subfilter { background: var(--surface); border: 1px solid var(--border); border-radius: 8px; padding: 12px 16px; margin-bottom: 16px; }
.subfilter h2 { font-size: 13px; color: var(--text-muted); text-transform: uppercase; margin-bottom: 8px; }
.subfilter table { border-collapse: collapse; }
.subfilter td { padding: 4px 8px; vertical-align: top; }
.subfilter td.label { color: var(--text-muted); white-space: nowrap; text-align: right; }
.facet { margin-right: 12px; white-space: nowrap; }
a.facet { color: var(--accent); cursor: pointer; text-decoration: none; }
a.facet.selected { color: var(--green); font-weight: 600; }
span.facet.disabled { color: var(--text-muted); opacity: 0.6; }
.facet em { font-style: italic; }
.facet sup { color: var(--text-muted); margin-left: 2px; }
.facet.stale { text-decoration: line-through; }
.ellipsis { color: var(--text-muted); }
.clear { float: right; color: var(--text-muted); cursor: pointer; }
table.records { width: 100%; border-collapse: collapse; }
table.records th, table.records td { text-align: left; padding: 6px 8px; border-bottom: 1px solid var(--border); }
table.records th { color: var(--text-muted); font-weight: 500; }
.tag { display: inline-block; border: 1px solid var(--border); border-radius: 4px; padding: 0 4px; margin-right: 4px; font-size: 12px; }
.footer { color: var(--text-muted); margin-top: 8px; }
"#;

const SCRIPT: &str = r#"
document.addEventListener('click', async (ev) => {
  const el = ev.target.closest('[data-action]');
  if (!el) return;
  ev.preventDefault();
  const body = { view: el.dataset.view, dimension: el.dataset.dimension, value: el.dataset.value };
  const resp = await fetch('/api/subfilter/' + el.dataset.action, {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify(body),
  });
  if (!resp.ok) {
    const err = await resp.json().catch(() => ({ error: resp.statusText }));
    alert(err.error || 'request failed');
    return;
  }
  window.location.reload();
});
"#;

/// Full dashboard page for one view.
pub fn page(view: &SubfilterView) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{} - subfilter</title>", html_escape(view.view.title()));
    let _ = writeln!(html, "<style>{STYLE}</style>\n</head>\n<body>\n<div class=\"app\">");

    html.push_str("<header>\n");
    let _ = writeln!(html, "<h1>{}</h1>", html_escape(view.view.title()));
    html.push_str("<nav>");
    for kind in ViewKind::ALL {
        let class = if kind == view.view { " class=\"current\"" } else { "" };
        let _ = write!(html, "<a href=\"/?view={kind}\"{class}>{}</a>", html_escape(kind.title()));
    }
    html.push_str("</nav>\n</header>\n");

    html.push_str(&panel_fragment(view.view, &view.panel));
    html.push_str(&records_fragment(&view.records));

    let _ = writeln!(
        html,
        "<p class=\"footer\">Displaying {} of {} found</p>",
        view.total(),
        view.base_total
    );
    let _ = writeln!(html, "</div>\n<script>{SCRIPT}</script>\n</body>\n</html>");
    html
}

/// The subfilter panel as an HTML fragment.
pub fn panel_fragment(view: ViewKind, panel: &SubfilterPanel) -> String {
    let mut html = String::from("<section class=\"subfilter\">\n");
    if panel.selection_active {
        let _ = write!(
            html,
            "<a class=\"clear\" data-action=\"clear\" data-view=\"{view}\">Reset</a>"
        );
    }
    html.push_str("<h2>Subfilter</h2>\n");

    if panel.is_empty() {
        html.push_str("<p class=\"ellipsis\">Nothing to refine.</p>\n");
    } else {
        html.push_str("<table>\n");
        for dimension in &panel.dimensions {
            html.push_str(&dimension_row(view, dimension));
        }
        html.push_str("</table>\n");
    }

    html.push_str("</section>\n");
    html
}

fn dimension_row(view: ViewKind, dimension: &RenderedDimension) -> String {
    let mut row = format!("<tr><td class=\"label\">{}</td><td>", html_escape(&dimension.label));
    for entry in &dimension.entries {
        match entry {
            RenderedEntry::Value(value) => row.push_str(&value_fragment(view, &dimension.key.to_string(), value)),
            RenderedEntry::Ellipsis { marker, hidden } => {
                let _ = write!(
                    row,
                    "<span class=\"ellipsis\" title=\"{hidden} more\">{}</span>",
                    html_escape(marker)
                );
            }
        }
    }
    row.push_str("</td></tr>\n");
    row
}

/// One facet value: a link for interactive states, a greyed span otherwise.
pub fn value_fragment(view: ViewKind, dimension: &str, value: &RenderedValue) -> String {
    let label = if value.is_empty {
        format!("<em>{}</em>", html_escape(&value.label))
    } else {
        html_escape(&value.label)
    };
    let count = format!("<sup>{}</sup>", value.count_label());
    let stale = if value.stale { " stale" } else { "" };

    match (value.state, value.action()) {
        (FacetState::Unavailable, _) | (_, None) => {
            format!("<span class=\"facet disabled{stale}\">{label}{count}</span>")
        }
        (state, Some(action)) => {
            let class = if state == FacetState::Selected { " selected" } else { "" };
            let action = match action {
                crate::engine::FacetAction::Set => "set",
                crate::engine::FacetAction::Unset => "unset",
            };
            format!(
                "<a class=\"facet{class}{stale}\" data-action=\"{action}\" data-view=\"{view}\" data-dimension=\"{}\" data-value=\"{}\">{label}{count}</a>",
                html_escape(dimension),
                html_escape(&value.id),
            )
        }
    }
}

fn records_fragment(records: &[Record]) -> String {
    let mut html = String::from(
        "<table class=\"records\">\n<tr><th>Host</th><th>Name</th><th>Severity</th><th>Tags</th></tr>\n",
    );
    if records.is_empty() {
        html.push_str("<tr><td colspan=\"4\" class=\"ellipsis\">No data found.</td></tr>\n");
    }
    for record in records {
        let host = record.host.as_ref().map(|h| h.name.as_str()).unwrap_or("");
        let severity = record.severity.map(|s| s.label()).unwrap_or("");
        let tags: String = record
            .tags
            .iter()
            .map(|t| {
                let text = if t.value.is_empty() {
                    t.name.clone()
                } else {
                    format!("{}: {}", t.name, t.value)
                };
                format!("<span class=\"tag\">{}</span>", html_escape(&text))
            })
            .collect();
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{tags}</td></tr>",
            html_escape(host),
            html_escape(&record.name),
            html_escape(severity),
        );
    }
    html.push_str("</table>\n");
    html
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
