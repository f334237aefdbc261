pub mod auth;
pub mod cli;
pub mod config;
pub mod defender;
pub mod entra;
pub mod errors;
pub mod fanout;
pub mod insights;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod upstream;
pub mod utils;
