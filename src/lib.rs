pub mod compare;
pub mod config;
pub mod error;
pub mod gaps;
pub mod history;
pub mod http_cache;
pub mod http_client;
pub mod predictions;
pub mod progression;
pub mod provider;
pub mod scoring;
pub mod standings;
pub mod teams;
pub mod validate;
