use data_encoding::BASE64URL_NOPAD;
use serde_json::Value;

use crate::errors::AdvisorError;

/// Decode the payload segment of a JWT without verifying it.
pub fn decode_payload(token: &str) -> Result<Value, AdvisorError> {
    let segment = token
        .split('.')
        .nth(1)
        .ok_or_else(|| AdvisorError::Authentication("Token is not a JWT".into()))?;
    let bytes = BASE64URL_NOPAD
        .decode(segment.trim_end_matches('=').as_bytes())
        .map_err(|e| AdvisorError::Authentication(format!("Invalid token payload encoding: {}", e)))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Application roles granted in the token, empty when absent or undecodable.
pub fn roles(token: &str) -> Vec<String> {
    decode_payload(token)
        .ok()
        .and_then(|claims| claims.get("roles").cloned())
        .and_then(|roles| serde_json::from_value(roles).ok())
        .unwrap_or_default()
}
