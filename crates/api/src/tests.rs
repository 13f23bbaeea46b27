use actix_web::{body::to_bytes, http::StatusCode, middleware::from_fn, test, web, App};
use chrono::Utc;
use tokio::sync::watch;
use tron_deposit_domain::model::{NewDeposit, TxHash, INITIAL_CONFIRMATIONS};
use tron_deposit_domain::services::telemetry::{init_telemetry, TelemetryConfig, TelemetryGuard};
use tron_deposit_domain::storage::{DepositStore, DepositTransaction};
use tron_deposit_domain::TronAddress;
use tron_deposit_monitor::LoopState;
use tron_deposit_storage::SeaOrmStorage;

use crate::application::{routes, track_requests};
use crate::handlers::deposit::DepositResponse;
use crate::state::AppState;

const TX: &str = "9f2c1d0b7a3e4f5566778899aabbccddeeff00112233445566778899aabbccdd";
const ADDRESS: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

async fn storage() -> SeaOrmStorage {
    SeaOrmStorage::connect("sqlite::memory:")
        .await
        .expect("storage inits")
}

fn telemetry() -> TelemetryGuard {
    let config = TelemetryConfig::from_env("API_TEST");
    init_telemetry(&config).expect("telemetry inits")
}

fn build_state(storage: SeaOrmStorage, loop_state: LoopState) -> AppState {
    let (_, receiver) = watch::channel(loop_state);
    AppState::new(storage, telemetry(), receiver)
}

async fn insert_deposit(storage: &SeaOrmStorage) {
    let mut tx = storage.begin().await.unwrap();
    tx.insert_deposit(&NewDeposit {
        tx_hash: TxHash::parse(TX).unwrap(),
        to_address: TronAddress::parse(ADDRESS).unwrap(),
        asset: "USDT".into(),
        amount: 5_000_000,
        confirmations: INITIAL_CONFIRMATIONS,
    })
    .await
    .unwrap();
    tx.commit().await.unwrap();
}

#[actix_web::test]
async fn returns_recorded_deposit() {
    let storage = storage().await;
    insert_deposit(&storage).await;
    let before = Utc::now();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(build_state(storage, LoopState::Idle)))
            .configure(routes),
    )
    .await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/deposits/{TX}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: DepositResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed.tx_hash, TX);
    assert_eq!(parsed.to_address, ADDRESS);
    assert_eq!(parsed.asset, "USDT");
    assert_eq!(parsed.amount, 5_000_000);
    assert_eq!(parsed.confirmations, 4);
    assert!(parsed.created_at <= before);
}

#[actix_web::test]
async fn unknown_deposit_is_not_found() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(build_state(storage().await, LoopState::Idle)))
            .configure(routes),
    )
    .await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/deposits/{TX}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["error"], "deposit not found");
}

#[actix_web::test]
async fn oversized_tx_hash_is_rejected() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(build_state(storage().await, LoopState::Idle)))
            .configure(routes),
    )
    .await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/deposits/{}", "a".repeat(200)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn health_reports_loop_state() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(build_state(
                storage().await,
                LoopState::Fetching,
            )))
            .configure(routes),
    )
    .await;
    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body = to_bytes(resp.into_body()).await.unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(parsed["status"], "ok");
    assert_eq!(parsed["loop_state"], "fetching");
}

#[actix_web::test]
async fn request_latency_and_size_are_exported() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(build_state(storage().await, LoopState::Idle)))
            .wrap(from_fn(track_requests))
            .configure(routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/healthz").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/metrics").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("http_request_duration_ms"));
    assert!(text.contains("route=\"/healthz\""));
    assert!(text.contains("http_response_size_bytes"));
}
