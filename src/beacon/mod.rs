pub mod constants;
pub mod filter;
pub mod registry;
pub mod types;
