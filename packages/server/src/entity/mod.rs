pub mod discussion;
pub mod file_attachment;
pub mod user;
