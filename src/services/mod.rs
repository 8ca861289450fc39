pub mod activity_logger;
pub mod approval;
pub mod auth;
pub mod expiry;
pub mod permissions;
pub mod user_context;

pub use user_context::UserContext;
