pub mod attachment;
pub mod auth;
pub mod discussion;
pub mod feed;
pub mod shared;
pub mod user;
