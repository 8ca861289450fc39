use actix_web::web;

use crate::middleware::RateLimiters;

pub mod activity;
pub mod approvals;
pub mod auth;
pub mod company;
pub mod documents;
pub mod expiry;
pub mod licenses;
pub mod notifications;
pub mod permissions;
pub mod workers;

/// Mounts `/api/v1`. The limiters are shared clones, so every worker counts against the same windows.
pub fn configure(cfg: &mut web::ServiceConfig, limiters: &RateLimiters) {
    cfg.service(
        web::scope("/api/v1")
            .configure(|cfg| auth::configure(cfg, limiters))
            .configure(|cfg| company::configure(cfg, limiters))
            .configure(|cfg| permissions::configure(cfg, limiters))
            .configure(workers::configure)
            .configure(licenses::configure)
            .configure(documents::configure)
            .configure(approvals::configure)
            .configure(expiry::configure)
            .configure(notifications::configure)
            .configure(activity::configure),
    );
}
