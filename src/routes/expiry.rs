use actix_web::web;

use crate::handlers::expiry;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/expiry")
            .route("/scan", web::post().to(expiry::run_scan))
            .route("/upcoming", web::get().to(expiry::upcoming)),
    );
}
