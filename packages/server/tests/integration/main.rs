mod attachment;
mod auth;
mod common;
mod user;
