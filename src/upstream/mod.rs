//! HTTP bindings for Microsoft Graph and the Defender REST API.

pub mod client;

pub use client::{ApiClient, ClientOptions};

pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com";
pub const DEFENDER_BASE_URL: &str = "https://api.security.microsoft.com";
