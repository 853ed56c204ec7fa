pub mod discussion;
pub mod hash;
pub mod jwt;
