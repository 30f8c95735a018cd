mod common;

use adiwiyata_ml::api::{self, AppState};
use adiwiyata_ml::{Config, Pipeline};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use common::Fixture;

fn app(config: Config) -> Router {
    api::router(AppState::new(Pipeline::new(config)))
}

async fn call(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn health_and_root() {
    let app = app(Config::default());

    let (status, body) = call(&app, "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = call(&app, "GET", "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn missing_sources_block_prepare() {
    let dir = tempfile::tempdir().unwrap();
    let app = app(Config::with_data_dir(dir.path()));

    let (status, body) = call(&app, "GET", "/api/sources").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 5);
    assert_eq!(body[0]["exists"], false);

    let (status, body) = call(&app, "POST", "/api/prepare").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "missing_sources");
    assert_eq!(body["sources"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn downstream_stages_require_prepare() {
    let fixture = Fixture::new();
    let app = app(fixture.config.clone());

    for uri in ["/api/regions", "/api/eda"] {
        let (status, body) = call(&app, "GET", uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_prepared");
    }

    let (status, body) = call(&app, "GET", "/api/model/results").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "no_results");
}

#[tokio::test]
async fn full_flow_over_http() {
    let fixture = Fixture::new();
    let app = app(fixture.config.clone());

    let (status, body) = call(&app, "POST", "/api/prepare").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reused"], false);
    assert_eq!(body["overview"]["total_regions"], 6);

    let (status, body) = call(&app, "GET", "/api/regions").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["KABKOT_STD"], "Kab. Badung");
    assert_eq!(body[3]["LUAS_WILAYAH"], Value::Null);

    let (status, body) = call(&app, "GET", "/api/eda").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dose_response"]["status"], "available");

    let (status, body) = call(&app, "POST", "/api/model/predict").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["confusion_matrix"], serde_json::json!([[2, 1], [1, 1]]));
    assert_eq!(body["report"]["classes"][1]["label"], "Tdk Selaras");

    let (status, _) = call(&app, "GET", "/api/model/results").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "POST", "/api/cache/invalidate").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, "GET", "/api/regions").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn model_load_failure_is_server_error() {
    let fixture = Fixture::new();
    std::fs::write(&fixture.config.model_path, b"\x80\x04\x95pickle").unwrap();
    let app = app(fixture.config.clone());

    call(&app, "POST", "/api/prepare").await;
    let (status, body) = call(&app, "POST", "/api/model/predict").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "model_load");
}

#[tokio::test]
async fn schema_mismatch_is_unprocessable() {
    let fixture = Fixture::new();
    std::fs::write(fixture.path(&fixture.config.files.air_quality), "Provinsi,Nilai\nBali,70\n").unwrap();
    let app = app(fixture.config.clone());

    let (status, body) = call(&app, "POST", "/api/prepare").await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "schema_mismatch");
}
