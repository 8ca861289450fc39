use actix_http::Request;
use actix_web::{App, HttpResponse, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::Value;
use serial_test::serial;
use std::net::SocketAddr;

use workdocs::{
    config::config,
    middleware::{LimitPolicy, RateLimiter, RateLimiters},
};

mod common;

fn peer(last_octet: u8) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, last_octet], 40_000))
}

#[actix_web::test]
#[serial]
async fn test_login_is_limited_per_ip() {
    let app = test::init_service(common::app()).await;

    // Malformed bodies never reach the database but still count
    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .peer_addr(peer(1))
            .set_json(serde_json::json!({}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(peer(1))
        .set_json(serde_json::json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap_or_default().contains("login"));

    // A different client still gets through
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(peer(2))
        .set_json(serde_json::json!({}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn login_request(peer_addr: SocketAddr) -> Request {
    test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .peer_addr(peer_addr)
        .set_json(serde_json::json!({}))
        .to_request()
}

#[actix_web::test]
#[serial]
async fn test_login_limit_is_shared_between_workers() {
    common::setup();
    let limiters = RateLimiters::from_config(config());

    // Two app instances stand in for two HttpServer workers
    let worker_a = test::init_service(common::app_with(limiters.clone())).await;
    let worker_b = test::init_service(common::app_with(limiters.clone())).await;

    for _ in 0..3 {
        let resp = test::call_service(&worker_a, login_request(peer(20))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
    for _ in 0..2 {
        let resp = test::call_service(&worker_b, login_request(peer(20))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    let resp = test::call_service(&worker_a, login_request(peer(20))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let resp = test::call_service(&worker_b, login_request(peer(20))).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(limiters.login.tracked_clients(), 1);
    assert_eq!(limiters.registration.tracked_clients(), 0);
}

#[actix_web::test]
#[serial]
async fn test_custom_limit() {
    let app = test::init_service(
        App::new()
            .wrap(RateLimiter::new(LimitPolicy::new("ping", 2, 60)))
            .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
    )
    .await;

    let mut statuses = Vec::new();
    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/ping")
            .peer_addr(peer(9))
            .to_request();
        statuses.push(test::call_service(&app, req).await.status());
    }

    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );
}

#[actix_web::test]
#[serial]
async fn test_requests_without_peer_address_are_not_limited() {
    let app = test::init_service(
        App::new()
            .wrap(RateLimiter::new(LimitPolicy::new("ping", 1, 60)))
            .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
    )
    .await;

    for _ in 0..3 {
        let req = test::TestRequest::get().uri("/ping").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
