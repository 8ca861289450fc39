use actix_web::web;

use crate::handlers::licenses;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/licenses")
            .route("", web::get().to(licenses::list_licenses))
            .route("", web::post().to(licenses::create_license))
            .route("/{id}", web::get().to(licenses::get_license))
            .route("/{id}", web::put().to(licenses::update_license))
            .route("/{id}", web::delete().to(licenses::delete_license)),
    );
}
