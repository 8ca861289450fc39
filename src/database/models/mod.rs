pub mod activity;
pub mod approval;
pub mod company;
pub mod document;
pub mod expiry;
pub mod license;
pub(crate) mod macros;
pub mod notification;
pub mod permission;
pub mod user;
pub mod worker;

// Re-export all models for easy importing
pub use activity::*;
pub use approval::*;
pub use company::*;
pub use document::*;
pub use expiry::*;
pub use license::*;
pub use notification::*;
pub use permission::*;
pub use user::*;
pub use worker::*;
