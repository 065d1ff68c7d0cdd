pub mod session;
pub mod source;
pub mod types;
