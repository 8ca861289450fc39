use actix_web::{HttpResponse, Responder, get};

use crate::database;

#[get("/")]
pub async fn banner() -> impl Responder {
    HttpResponse::Ok().body(format!("WorkDocs API v{}", env!("CARGO_PKG_VERSION")))
}

/// Liveness plus a database round trip. Reports 503 when the pool cannot answer.
#[get("/health")]
pub async fn health() -> impl Responder {
    let database_ok = database::ping().await;
    let body = serde_json::json!({
        "status": if database_ok { "ok" } else { "degraded" },
        "database": if database_ok { "up" } else { "down" },
        "timestamp": chrono::Utc::now()
    });

    if database_ok {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
