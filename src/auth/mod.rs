//! Access-token acquisition for the upstream APIs.

pub mod claims;
pub mod client_secret;
pub mod provider;

pub use client_secret::ClientSecretCredential;
pub use provider::{AccessToken, StaticToken, TokenProvider};

pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";
pub const DEFENDER_SCOPE: &str = "https://api.securitycenter.microsoft.com/.default";
