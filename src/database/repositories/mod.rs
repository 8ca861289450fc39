pub mod activity;
pub mod approval;
pub mod company;
pub mod document;
pub mod license;
pub mod notification;
pub mod permission;
pub mod user;
pub mod worker;
