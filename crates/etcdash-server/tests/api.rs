mod common;

use axum::http::StatusCode;
use common::{TestApp, empty_request};
use serde_json::json;
use tower::ServiceExt;

use etcdash_backend::{AlarmType, MemberId};

const LEADER: &str = "8e9e05c52164694d";
const FOLLOWER: &str = "91bc3c398fb3c146";
const LEARNER: &str = "fd422379fda50e48";
const SESSION_LEASE: &str = "694d7a3b0e1c2f01";

fn names(keys: &serde_json::Value) -> Vec<String> {
    keys.as_array()
        .expect("array")
        .iter()
        .map(|k| k["key"].as_str().expect("key").to_owned())
        .collect()
}

// ── Cluster ──────────────────────────────────────────────────────────

#[tokio::test]
async fn cluster_info_reports_demo_cluster() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/cluster").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clusterName"], "etcd-cluster");
    assert_eq!(body["leader"], LEADER);
    assert_eq!(body["endpoints"].as_array().map(Vec::len), Some(3));
    assert!(body["revision"].as_i64().expect("revision") > 1);
}

#[tokio::test]
async fn dashboard_bundles_everything() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/dashboard").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authStatus"]["enabled"], true);
    assert_eq!(body["members"].as_array().map(Vec::len), Some(3));
    assert_eq!(body["leases"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["alarms"][0]["alarm"], "NOSPACE");
    assert!(body["users"].as_array().expect("users").iter().any(|u| u["name"] == "root"));
}

// ── Keys ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_keys_projects_direct_children() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/keys?path=/config").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prefix"], "/config/");
    assert_eq!(names(&body["keys"]), vec!["db/", "features/", "flag"]);
    assert_eq!(body["total"], 3);

    let flag = &body["keys"][2];
    assert_eq!(flag["isDirectory"], false);
    assert!(flag["modRevision"].is_i64());
    let dir = &body["keys"][0];
    assert_eq!(dir["isDirectory"], true);
    assert!(dir.get("modRevision").is_none());
}

#[tokio::test]
async fn list_keys_filters_and_paginates() {
    let app = TestApp::new();
    let (_, body) = app.get("/api/keys?path=/config&filter=FL").await;
    assert_eq!(names(&body["keys"]), vec!["flag"]);

    let (_, body) = app.get("/api/keys?path=/config&page=2&page_size=2").await;
    assert_eq!(names(&body["keys"]), vec!["flag"]);
    assert_eq!(body["page"], 2);
    assert_eq!(body["totalPages"], 2);
}

#[tokio::test]
async fn root_listing_skips_empty_first_segment() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/keys?path=/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body["keys"]), vec!["registry/"]);
}

#[tokio::test]
async fn missing_key_is_empty_detail_not_error() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/keys/value?key=/does/not/exist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "value": "", "key": null }));
}

#[tokio::test]
async fn put_then_read_then_delete_key() {
    let app = TestApp::new();
    let (status, body) = app
        .put("/api/keys", json!({ "key": "/svc/api/port", "value": "8080" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = app.get("/api/keys/value?key=/svc/api/port").await;
    assert_eq!(body["value"], "8080");
    assert_eq!(body["key"]["key"], "port");

    let (status, _) = app.delete("/api/keys?key=/svc/api/port").await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/keys/value?key=/svc/api/port").await;
    assert_eq!(body["key"], serde_json::Value::Null);
}

#[tokio::test]
async fn empty_key_is_rejected() {
    let app = TestApp::new();
    let (status, body) = app.put("/api/keys", json!({ "key": "", "value": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_INPUT");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn browse_distinguishes_directories_and_leaves() {
    let app = TestApp::new();
    let (_, body) = app.get("/api/keys/browse?path=/config/db").await;
    assert_eq!(body["kind"], "directory");
    assert_eq!(names(&body["keys"]), vec!["host", "port"]);

    let (_, body) = app.get("/api/keys/browse?path=/config/db/host").await;
    assert_eq!(body["kind"], "leaf");
    assert_eq!(body["detail"]["value"], "10.0.0.10");
}

// ── Users & roles ────────────────────────────────────────────────────

#[tokio::test]
async fn user_lifecycle() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/users",
            json!({
                "name": "deploy",
                "password": "s3cret",
                "passwordConfirmation": "s3cret",
                "roles": ["reader"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "name": "deploy", "roles": ["reader"] }));

    let (_, body) = app.post("/api/users/deploy/roles", json!({ "role": "writer" })).await;
    assert_eq!(body["roles"], json!(["reader", "writer"]));

    let (_, body) = app.delete("/api/users/deploy/roles/reader").await;
    assert_eq!(body["roles"], json!(["writer"]));

    let (status, _) = app
        .post("/api/users/deploy/password", json!({ "password": "n3w" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete("/api/users/deploy").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = app.get("/api/users").await;
    assert!(body.as_array().expect("users").iter().all(|u| u["name"] != "deploy"));
}

#[tokio::test]
async fn password_confirmation_must_match() {
    let app = TestApp::new();
    let (status, body) = app
        .post(
            "/api/users",
            json!({ "name": "x", "password": "a", "passwordConfirmation": "b" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn grant_to_missing_user_is_null() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/users/ghost/roles", json!({ "role": "reader" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::Value::Null);
}

#[tokio::test]
async fn deleting_missing_user_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.delete("/api/users/ghost").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn duplicate_user_is_an_etcd_error() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/api/users", json!({ "name": "root", "password": "pw" }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "ETCD_ERROR");
    assert!(body["message"].as_str().expect("message").contains("already exists"));
}

#[tokio::test]
async fn role_permissions_grant_and_revoke() {
    let app = TestApp::new();
    let (status, _) = app.post("/api/roles", json!({ "name": "ops" })).await;
    assert_eq!(status, StatusCode::OK);

    let perm = json!({ "permType": "readwrite", "key": "/ops/", "prefix": true });
    let (_, body) = app
        .post("/api/roles/ops/permissions", json!({ "permission": perm.clone() }))
        .await;
    assert_eq!(body["permissions"][0]["key"], "/ops/");
    assert_eq!(body["permissions"][0]["permType"], "readwrite");

    let (_, body) = app
        .post("/api/roles/ops/permissions/revoke", json!({ "permission": perm }))
        .await;
    assert_eq!(body["permissions"], json!([]));

    let (status, _) = app.delete("/api/roles/ops").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn auth_status_route() {
    let app = TestApp::new();
    let (_, body) = app.get("/api/auth/status").await;
    assert_eq!(body, json!({ "enabled": true }));
}

// ── Leases ───────────────────────────────────────────────────────────

#[tokio::test]
async fn revoking_a_lease_removes_its_keys() {
    let app = TestApp::new();
    let (_, body) = app.get("/api/leases").await;
    assert_eq!(body[0]["id"], SESSION_LEASE);
    assert_eq!(body[0]["keys"], json!(["/app/sessions/7f3a"]));

    let (status, _) = app.delete(&format!("/api/leases/{SESSION_LEASE}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/keys/value?key=/app/sessions/7f3a").await;
    assert_eq!(body["key"], serde_json::Value::Null);

    let (status, body) = app.delete(&format!("/api/leases/{SESSION_LEASE}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn keepalive_resets_ttl() {
    let app = TestApp::new();
    let (status, body) = app
        .post(&format!("/api/leases/{SESSION_LEASE}/keepalive"), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ttl"], body["grantedTtl"]);

    let (_, body) = app.post("/api/leases/abc123/keepalive", json!({})).await;
    assert_eq!(body, serde_json::Value::Null);
}

#[tokio::test]
async fn malformed_lease_id_is_bad_request() {
    let app = TestApp::new();
    let (status, _) = app.delete("/api/leases/not-hex").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Members ──────────────────────────────────────────────────────────

#[tokio::test]
async fn promote_learner_then_move_leader() {
    let app = TestApp::new();
    let (_, body) = app.post(&format!("/api/members/{LEARNER}/promote"), json!({})).await;
    assert_eq!(body["isLearner"], false);

    let (status, body) = app.post(&format!("/api/members/{LEARNER}/leader"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "newLeaderId": LEARNER }));

    let (_, body) = app.get("/api/cluster").await;
    assert_eq!(body["leader"], LEARNER);
}

#[tokio::test]
async fn update_member_validates_peer_urls() {
    let app = TestApp::new();
    let (status, body) = app
        .put(
            &format!("/api/members/{FOLLOWER}"),
            json!({ "peerURLs": ["http://10.0.0.2:2380,http://10.0.0.3:2380"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["peerURLs"],
        json!(["http://10.0.0.2:2380", "http://10.0.0.3:2380"])
    );

    let (status, _) = app
        .put(&format!("/api/members/{FOLLOWER}"), json!({ "peerURLs": ["ftp://x"] }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn removing_the_leader_elects_another() {
    let app = TestApp::new();
    let (status, _) = app.delete(&format!("/api/members/{LEADER}")).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/members").await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    let (_, body) = app.get("/api/cluster").await;
    assert_eq!(body["leader"], FOLLOWER);

    let (status, _) = app.delete(&format!("/api/members/{LEADER}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Alarms ───────────────────────────────────────────────────────────

#[tokio::test]
async fn disarm_alarms() {
    let app = TestApp::new();
    let (status, _) = app
        .post(
            "/api/alarms/disarm",
            json!({ "memberID": FOLLOWER, "alarm": "NOSPACE" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/alarms").await;
    assert_eq!(body, json!([]));

    app.backend
        .raise_alarm(MemberId::new(0x8e9e_05c5_2164_694d), AlarmType::Corrupt)
        .await;
    app.backend
        .raise_alarm(MemberId::new(0x91bc_3c39_8fb3_c146), AlarmType::Nospace)
        .await;
    let (_, body) = app.post("/api/alarms/disarm-all", json!({})).await;
    assert_eq!(body["success"], true);
    let (_, body) = app.get("/api/alarms").await;
    assert_eq!(body, json!([]));
}

// ── Endpoints ────────────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_endpoint_shows_unhealthy_and_drops_from_status() {
    let app = TestApp::new();
    app.backend.set_unreachable("http://etcd-2:2379", true).await;

    let (status, body) = app.get("/api/endpoints/health").await;
    assert_eq!(status, StatusCode::OK);
    let health: Vec<bool> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|h| h["health"].as_bool().expect("health"))
        .collect();
    assert_eq!(health, vec![true, false, true]);
    assert!(body[0]["took"].as_str().expect("took").ends_with("ms"));

    let (_, body) = app.get("/api/endpoints/status").await;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    assert_eq!(body[0]["leader"], LEADER);
}

// ── Maintenance ──────────────────────────────────────────────────────

#[tokio::test]
async fn compact_defaults_to_current_revision() {
    let app = TestApp::new();
    let (_, info) = app.get("/api/cluster").await;
    let revision = info["revision"].as_i64().expect("revision");

    let (status, body) = app.send(empty_request("POST", "/api/maintenance/compact")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], format!("Compacted to revision {revision}"));

    let (status, body) = app
        .post("/api/maintenance/compact", json!({ "revision": revision + 100 }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "ETCD_ERROR");

    let (status, _) = app
        .post("/api/maintenance/compact", json!({ "revision": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn defragment_reports_endpoint_count() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/maintenance/defragment", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Defragmentation completed on 3 endpoint(s)");

    app.backend.set_unreachable("http://etcd-3:2379", true).await;
    let (status, body) = app.post("/api/maintenance/defragment", json!({})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn snapshot_writes_into_snapshot_dir() {
    let app = TestApp::new();
    let (status, body) = app.post("/api/maintenance/snapshot", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let path = std::path::PathBuf::from(body["path"].as_str().expect("path"));
    assert!(path.starts_with(app.snapshot_dir.path()));
    let written = std::fs::metadata(&path).expect("snapshot file").len();
    assert_eq!(body["size"].as_u64(), Some(written));
}

// ── Surface ──────────────────────────────────────────────────────────

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/api/cluster"))
        .await
        .expect("response");
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store");
}

#[tokio::test]
async fn landing_page_names_mode_and_endpoints() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let html = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(html.contains("mock (in-memory demo cluster)"));
    assert!(html.contains("http://etcd-1:2379"));
    assert!(html.contains("/api/dashboard"));
}
