use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use server::{
    AppState,
    middleware::{REQUEST_ID_HEADER, USER_ID_HEADER},
    routes,
};
use topology_engine::EngineConfig;
use tower::ServiceExt;

fn app() -> Router {
    routes::router(AppState::new(EngineConfig::default()).unwrap())
}

struct Reply {
    status: StatusCode,
    request_id: Option<String>,
    body: Value,
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, "netops");
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let request_id = response
        .headers()
        .get(REQUEST_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply {
        status,
        request_id,
        body,
    }
}

/// Topology 1 holding A(1) - B(2) - C(3), links 1 and 2 up
async fn seed_line(app: &Router) -> u64 {
    let created = call(
        app,
        Method::POST,
        "/v1/topologies",
        Some(json!({ "name": "campus", "type": "physical", "scope": "hq" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.body["data"]["id"].as_u64().unwrap();

    for name in ["a", "b", "c"] {
        let node = call(
            app,
            Method::POST,
            &format!("/v1/topologies/{id}/nodes"),
            Some(json!({ "device_id": format!("sw-{name}"), "label": name })),
        )
        .await;
        assert_eq!(node.status, StatusCode::CREATED);
    }
    for (source, target) in [(1, 2), (2, 3)] {
        let link = call(
            app,
            Method::POST,
            &format!("/v1/topologies/{id}/links"),
            Some(json!({ "source_node_id": source, "target_node_id": target, "status": "up" })),
        )
        .await;
        assert_eq!(link.status, StatusCode::CREATED);
    }
    id
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = app();
    let reply = call(&app, Method::GET, "/health", None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], json!(true));
    assert_eq!(reply.body["data"]["status"], json!("ok"));
    assert!(reply.request_id.is_some());
}

#[tokio::test]
async fn test_topology_crud_and_listing() {
    let app = app();
    let id = seed_line(&app).await;

    let detail = call(&app, Method::GET, &format!("/v1/topologies/{id}"), None).await;
    assert_eq!(detail.status, StatusCode::OK);
    let data = &detail.body["data"];
    assert_eq!(data["name"], json!("campus"));
    assert_eq!(data["type"], json!("physical"));
    assert_eq!(data["created_by"], json!("netops"));
    assert_eq!(data["node_count"], json!(3));
    assert_eq!(data["link_count"], json!(2));
    assert_eq!(data["version"], json!(6));

    call(
        &app,
        Method::POST,
        "/v1/topologies",
        Some(json!({ "name": "overlay", "type": "logical" })),
    )
    .await;
    let logical = call(&app, Method::GET, "/v1/topologies?type=logical", None).await;
    assert_eq!(logical.body["data"]["total"], json!(1));
    assert_eq!(logical.body["data"]["items"][0]["name"], json!("overlay"));

    let paged = call(&app, Method::GET, "/v1/topologies?page=1&page_size=1", None).await;
    assert_eq!(paged.body["data"]["total"], json!(2));
    assert_eq!(paged.body["data"]["items"].as_array().unwrap().len(), 1);

    let renamed = call(
        &app,
        Method::PUT,
        &format!("/v1/topologies/{id}"),
        Some(json!({ "name": "campus-east", "description": "east wing" })),
    )
    .await;
    assert_eq!(renamed.status, StatusCode::OK);
    assert_eq!(renamed.body["data"]["name"], json!("campus-east"));
    assert_eq!(renamed.body["data"]["version"], json!(6));

    let deleted = call(&app, Method::DELETE, &format!("/v1/topologies/{id}"), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let gone = call(&app, Method::GET, &format!("/v1/topologies/{id}"), None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["success"], json!(false));
    assert_eq!(gone.body["code"], json!("NotFound"));
}

#[tokio::test]
async fn test_path_and_impact_over_http() {
    let app = app();
    let id = seed_line(&app).await;

    let path = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/analyze/path"),
        Some(json!({ "source_node_id": 1, "target_node_id": 3, "algorithm": "shortest" })),
    )
    .await;
    assert_eq!(path.status, StatusCode::OK);
    assert_eq!(path.body["data"]["paths"][0]["nodes"], json!([1, 2, 3]));
    assert_eq!(path.body["data"]["paths"][0]["hop_count"], json!(2));

    let down = call(
        &app,
        Method::PATCH,
        &format!("/v1/topologies/{id}/links/2/status"),
        Some(json!({ "status": "down", "latency": 12.5 })),
    )
    .await;
    assert_eq!(down.status, StatusCode::OK);
    assert_eq!(down.body["data"]["status"], json!("down"));

    let cut = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/analyze/path"),
        Some(json!({ "source_node_id": 1, "target_node_id": 3 })),
    )
    .await;
    assert_eq!(cut.status, StatusCode::OK);
    assert_eq!(cut.body["data"]["paths"], json!([]));

    let impact = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/analyze/impact"),
        Some(json!({ "node_id": 2, "scenario": "failure" })),
    )
    .await;
    assert_eq!(impact.status, StatusCode::OK);
    let report = &impact.body["data"];
    assert_eq!(report["affected_nodes"], json!([1, 3]));
    assert!(report["isolated_nodes"].as_array().unwrap().contains(&json!(3)));
    assert_eq!(report["impact_level"], json!("high"));

    let ambiguous = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/analyze/impact"),
        Some(json!({ "node_id": 2, "link_id": 1 })),
    )
    .await;
    assert_eq!(ambiguous.status, StatusCode::BAD_REQUEST);
    assert_eq!(ambiguous.body["code"], json!("ValidationError"));
}

#[tokio::test]
async fn test_error_mapping() {
    let app = app();
    let id = seed_line(&app).await;

    let missing = call(&app, Method::GET, "/v1/topologies/999", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let dangling = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/links"),
        Some(json!({ "source_node_id": 1, "target_node_id": 42 })),
    )
    .await;
    assert_eq!(dangling.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(dangling.body["code"], json!("InvalidReference"));

    let stale = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/nodes?expected_version=1"),
        Some(json!({ "node_type": "cloud" })),
    )
    .await;
    assert_eq!(stale.status, StatusCode::CONFLICT);
    assert_eq!(stale.body["code"], json!("Conflict"));

    let current = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/nodes?expected_version=6"),
        Some(json!({ "node_type": "cloud" })),
    )
    .await;
    assert_eq!(current.status, StatusCode::CREATED);

    let no_device = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/nodes"),
        Some(json!({ "node_type": "device" })),
    )
    .await;
    assert_eq!(no_device.status, StatusCode::BAD_REQUEST);
    assert_eq!(no_device.body["code"], json!("ValidationError"));

    let malformed = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/links"),
        Some(json!({ "source_node_id": "one" })),
    )
    .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["success"], json!(false));
    assert_eq!(malformed.body["code"], json!("ValidationError"));

    let bad_path = call(&app, Method::GET, "/v1/topologies/abc", None).await;
    assert_eq!(bad_path.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_node_moves_and_batch_atomicity() {
    let app = app();
    let id = seed_line(&app).await;

    let moved = call(
        &app,
        Method::PATCH,
        &format!("/v1/topologies/{id}/nodes/1/position"),
        Some(json!({ "x": 10.0, "y": -5.0 })),
    )
    .await;
    assert_eq!(moved.status, StatusCode::OK);
    assert_eq!(moved.body["data"]["position"], json!({ "x": 10.0, "y": -5.0 }));

    let rejected = call(
        &app,
        Method::PATCH,
        &format!("/v1/topologies/{id}/nodes/batch"),
        Some(json!({ "nodes": [
            { "id": 2, "x": 1.0, "y": 1.0 },
            { "id": 77, "x": 2.0, "y": 2.0 },
            { "id": 3, "x": 3.0, "y": 3.0 }
        ] })),
    )
    .await;
    assert_eq!(rejected.status, StatusCode::NOT_FOUND);

    let detail = call(&app, Method::GET, &format!("/v1/topologies/{id}"), None).await;
    for node in detail.body["data"]["nodes"].as_array().unwrap() {
        if node["id"] != json!(1) {
            assert_eq!(node["position"], json!({ "x": 0.0, "y": 0.0 }));
        }
    }

    let applied = call(
        &app,
        Method::PATCH,
        &format!("/v1/topologies/{id}/nodes/batch"),
        Some(json!({ "nodes": [
            { "node_id": 2, "position_x": 1.0, "position_y": 1.0 },
            { "node_id": 3, "position_x": 3.0, "position_y": 3.0 }
        ] })),
    )
    .await;
    assert_eq!(applied.status, StatusCode::OK);
    assert_eq!(applied.body["data"]["updated"], json!(2));

    let locked = call(
        &app,
        Method::PUT,
        &format!("/v1/topologies/{id}/nodes/3"),
        Some(json!({ "is_locked": true, "label": null })),
    )
    .await;
    assert_eq!(locked.status, StatusCode::OK);
    assert_eq!(locked.body["data"]["is_locked"], json!(true));
    assert_eq!(locked.body["data"]["label"], json!(null));

    let removed = call(&app, Method::DELETE, &format!("/v1/topologies/{id}/nodes/2"), None).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["data"]["removed_link_ids"], json!([1, 2]));
}

#[tokio::test]
async fn test_layout_over_http() {
    let app = app();
    let id = seed_line(&app).await;

    let layout = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/layout"),
        Some(json!({ "algorithm": "circular" })),
    )
    .await;
    assert_eq!(layout.status, StatusCode::OK);
    let data = &layout.body["data"];
    assert_eq!(data["algorithm"], json!("circular"));
    assert_eq!(data["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(data["truncated"], json!(false));

    let detail = call(&app, Method::GET, &format!("/v1/topologies/{id}"), None).await;
    assert_eq!(detail.body["data"]["layout_algorithm"], json!("circular"));

    let invalid = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/layout"),
        Some(json!({ "algorithm": "spiral" })),
    )
    .await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_groups_over_http() {
    let app = app();
    let id = seed_line(&app).await;

    let core = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/groups"),
        Some(json!({ "name": "core" })),
    )
    .await;
    assert_eq!(core.status, StatusCode::CREATED);
    let edge = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/groups"),
        Some(json!({ "name": "edge", "parent_id": 1 })),
    )
    .await;
    assert_eq!(edge.status, StatusCode::CREATED);
    assert_eq!(edge.body["data"]["parent_id"], json!(1));

    let cycle = call(
        &app,
        Method::PUT,
        &format!("/v1/topologies/{id}/groups/1"),
        Some(json!({ "parent_id": 2 })),
    )
    .await;
    assert_eq!(cycle.status, StatusCode::UNPROCESSABLE_ENTITY);

    let deleted = call(&app, Method::DELETE, &format!("/v1/topologies/{id}/groups/1"), None).await;
    assert_eq!(deleted.status, StatusCode::OK);
    let detail = call(&app, Method::GET, &format!("/v1/topologies/{id}"), None).await;
    let groups = detail.body["data"]["groups"].as_array().unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["parent_id"], json!(null));
}

#[tokio::test]
async fn test_versions_over_http() {
    let app = app();
    let id = seed_line(&app).await;

    let first = call(&app, Method::POST, &format!("/v1/topologies/{id}/versions"), None).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.body["data"]["version"], json!(1));
    assert_eq!(first.body["data"]["changed_by"], json!("netops"));

    call(&app, Method::DELETE, &format!("/v1/topologies/{id}/nodes/1"), None).await;
    let second = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/versions"),
        Some(json!({ "description": "after removing a" })),
    )
    .await;
    assert_eq!(second.body["data"]["version"], json!(2));

    let listed = call(&app, Method::GET, &format!("/v1/topologies/{id}/versions"), None).await;
    let numbers: Vec<u64> = listed.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["version"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2]);

    let one = call(&app, Method::GET, &format!("/v1/topologies/{id}/versions/1"), None).await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.body["data"]["snapshot"]["nodes"].as_array().unwrap().len(), 3);

    let restored = call(
        &app,
        Method::POST,
        &format!("/v1/topologies/{id}/versions/1/restore"),
        None,
    )
    .await;
    assert_eq!(restored.status, StatusCode::OK);
    assert_eq!(restored.body["data"]["restored_from"], json!(1));
    assert_eq!(restored.body["data"]["pre_restore_snapshot"]["version"], json!(3));

    let detail = call(&app, Method::GET, &format!("/v1/topologies/{id}"), None).await;
    assert_eq!(detail.body["data"]["node_count"], json!(3));
    assert_eq!(detail.body["data"]["link_count"], json!(2));

    let missing = call(&app, Method::GET, &format!("/v1/topologies/{id}/versions/99"), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}
