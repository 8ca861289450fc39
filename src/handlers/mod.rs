pub mod activity;
pub mod approvals;
pub mod auth;
pub mod company;
pub mod documents;
pub mod expiry;
pub mod licenses;
pub mod notifications;
pub mod permissions;
pub mod shared;
pub mod system;
pub mod workers;
