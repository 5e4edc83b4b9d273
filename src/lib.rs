pub mod aggregate;
pub mod cache_store;
pub mod config;
pub mod error;
pub mod fpl_api;
pub mod http_client;
pub mod model;
pub mod persist;
pub mod pipeline;
pub mod projection;
pub mod vector;
