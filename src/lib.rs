pub mod config;
pub mod filter;
pub mod normalize;
pub mod record;
pub mod upload;
