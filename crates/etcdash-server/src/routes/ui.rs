//! Landing page at `/`.
//!
//! A single static page naming the backend mode and configured endpoints
//! and linking the read-only API routes. The interactive console is a
//! separate frontend that talks to `/api/*`.

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;

use crate::config::BackendMode;
use crate::state::AppState;

/// Build the UI router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(landing_page))
}

/// Read-only routes linked from the landing page.
const API_LINKS: &[(&str, &str)] = &[
    ("/api/dashboard", "Dashboard summary"),
    ("/api/cluster", "Cluster info"),
    ("/api/keys?path=/", "Key browser"),
    ("/api/auth/status", "Auth status"),
    ("/api/users", "Users"),
    ("/api/roles", "Roles"),
    ("/api/leases", "Leases"),
    ("/api/members", "Members"),
    ("/api/alarms", "Alarms"),
    ("/api/endpoints/health", "Endpoint health"),
    ("/api/endpoints/status", "Endpoint status"),
];

async fn landing_page(State(state): State<Arc<AppState>>) -> Html<String> {
    let mode = match state.mode {
        BackendMode::Mock => "mock (in-memory demo cluster)",
        BackendMode::Live => "live",
    };

    let mut endpoints = String::new();
    for ep in &state.endpoints {
        let _ = write!(endpoints, "<li><code>{}</code></li>", escape(ep));
    }

    let mut links = String::new();
    for (href, label) in API_LINKS {
        let _ = write!(links, r#"<li><a href="{href}">{label}</a> <code>{href}</code></li>"#);
    }

    let mut html = String::with_capacity(4096);
    html.push_str(LANDING_HEAD);
    html.push_str(
        &LANDING_BODY
            .replace("{{MODE}}", mode)
            .replace("{{ENDPOINTS}}", &endpoints)
            .replace("{{LINKS}}", &links),
    );
    Html(html)
}

/// Minimal HTML escaping for operator-supplied text.
fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const LANDING_HEAD: &str = r##"<!DOCTYPE html>
<html lang="en"><head><meta charset="utf-8"/><meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>etcdash</title>
<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
:root{--bg:#10161E;--text:#E3ECF5;--muted:#8394A6;--primary:#419EDA;--panel:rgba(255,255,255,.04);--border:rgba(255,255,255,.08)}
body{font-family:-apple-system,'Segoe UI',sans-serif;background:var(--bg);color:var(--text);line-height:1.6}
a{color:var(--primary);text-decoration:none}a:hover{text-decoration:underline}
code{font-family:ui-monospace,Menlo,monospace;font-size:13px;color:var(--muted)}
main{max-width:760px;margin:0 auto;padding:64px 24px}
h1{font-size:40px;font-weight:800;letter-spacing:-1px;margin-bottom:8px}
h2{font-size:16px;font-weight:700;margin:32px 0 12px;color:var(--muted);text-transform:uppercase;letter-spacing:1px}
.panel{background:var(--panel);border:1px solid var(--border);border-radius:12px;padding:20px 24px}
.panel li{list-style:none;padding:4px 0}
.mode{display:inline-block;padding:4px 12px;border-radius:50px;background:rgba(65,158,218,.12);color:var(--primary);font-size:13px;font-weight:600}
</style></head>
"##;

const LANDING_BODY: &str = r##"<body>
<main>
  <h1>etcdash</h1>
  <p>Administration console for etcd clusters.</p>
  <h2>Backend</h2>
  <div class="panel">
    <p><span class="mode">{{MODE}}</span></p>
    <ul>{{ENDPOINTS}}</ul>
  </div>
  <h2>API</h2>
  <div class="panel"><ul>{{LINKS}}</ul></div>
</main>
</body></html>
"##;
