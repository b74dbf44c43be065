pub mod client;
pub mod config;
pub mod delta;
pub mod error;
pub mod exchange_rate;
pub mod render;
pub mod routes;
pub mod transform;
pub mod view;
