use actix_web::web;

use crate::handlers::workers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/workers")
            .route("", web::get().to(workers::list_workers))
            .route("", web::post().to(workers::create_worker))
            .route("/{id}", web::get().to(workers::get_worker))
            .route("/{id}", web::put().to(workers::update_worker))
            .route("/{id}", web::delete().to(workers::delete_worker))
            .route("/{id}/licenses", web::get().to(workers::get_worker_licenses)),
    );
}
