use actix_web::web;

use crate::handlers::auth;
use crate::middleware::RateLimiters;

pub fn configure(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/register")
                    .wrap(limiters.registration.clone())
                    .route(web::post().to(auth::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(auth::login)),
            )
            .route("/me", web::get().to(auth::me))
            .route("/switch-company", web::post().to(auth::switch_company))
            .route("/change-password", web::post().to(auth::change_password)),
    );
}
