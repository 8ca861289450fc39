use actix_web::web;

use crate::handlers::permissions;
use crate::middleware::RateLimiters;

pub fn configure(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    cfg.service(
        web::scope("/permissions")
            .route("", web::get().to(permissions::list_permissions))
            .route("/me", web::get().to(permissions::my_permissions))
            .service(
                web::resource("/users/{user_id}")
                    .wrap(limiters.sensitive.clone())
                    .route(web::get().to(permissions::get_user_permissions))
                    .route(web::post().to(permissions::grant_permissions)),
            )
            .service(
                web::resource("/users/{user_id}/{key}")
                    .wrap(limiters.sensitive.clone())
                    .route(web::delete().to(permissions::revoke_permission)),
            ),
    );
}
