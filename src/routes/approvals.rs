use actix_web::web;

use crate::handlers::approvals;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/approvals")
            .route("", web::get().to(approvals::list_approvals))
            .route("/{id}", web::get().to(approvals::get_approval))
            .route("/{id}/approve", web::post().to(approvals::approve_request))
            .route("/{id}/reject", web::post().to(approvals::reject_request))
            .route("/{id}/cancel", web::post().to(approvals::cancel_request)),
    );
}
