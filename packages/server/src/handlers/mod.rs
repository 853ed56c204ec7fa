pub mod attachment;
pub mod auth;
pub mod discussion;
pub mod image;
pub mod user;
