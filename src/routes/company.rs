use actix_web::web;

use crate::handlers::company;
use crate::middleware::RateLimiters;

pub fn configure(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    cfg.service(
        web::scope("/companies")
            .service(
                web::resource("")
                    .route(web::get().to(company::get_user_companies))
                    .route(web::post().to(company::create_company)),
            )
            .service(
                web::resource("/{id}")
                    .route(web::get().to(company::get_company))
                    .route(web::put().to(company::update_company)),
            )
            .service(
                // Membership changes get the stricter limiter
                web::resource("/{id}/members")
                    .wrap(limiters.sensitive.clone())
                    .route(web::get().to(company::get_members))
                    .route(web::post().to(company::add_member)),
            )
            .service(
                web::resource("/{id}/members/{user_id}")
                    .wrap(limiters.sensitive.clone())
                    .route(web::delete().to(company::remove_member)),
            )
            .service(
                web::resource("/{id}/members/{user_id}/role")
                    .wrap(limiters.sensitive.clone())
                    .route(web::put().to(company::update_member_role)),
            ),
    );
}
