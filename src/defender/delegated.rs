//! Ingestion of Defender data collected out of band with delegated credentials.
//!
//! The blob is keyed by Defender API request name, each holding the payload
//! that request would have returned. Devices that cannot onboard an app
//! registration are covered this way; Graph Security is still fetched live.

use std::path::Path;

use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AdvisorError;
use super::aggregate::DefenderSource;
use super::requests::api;
use super::snapshot::DefenderSnapshot;

/// Request names accepted in a delegated blob, in fold order.
pub const DELEGATED_KEYS: &[&str] = &[
    api::INCIDENTS,
    api::MACHINES,
    api::VULNERABILITIES,
    api::RECOMMENDATIONS,
    api::SOFTWARE,
    api::EXPOSURE_SCORE,
];

impl DefenderSnapshot {
    /// Fold a delegated blob through the same aggregators as the live path.
    pub fn ingest_delegated(&mut self, blob: &Value) -> Result<(), AdvisorError> {
        let map = blob
            .as_object()
            .ok_or_else(|| AdvisorError::Delegated("Delegated Defender data must be a JSON object".into()))?;

        for key in map.keys().filter(|k| !DELEGATED_KEYS.contains(&k.as_str())) {
            warn!(key = %key, "Ignoring unrecognized key in delegated Defender data");
        }

        for key in DELEGATED_KEYS {
            let Some(payload) = map.get(*key) else { continue };
            if payload.is_null() {
                continue;
            }
            self.defender_api_available = true;
            self.absorb(DefenderSource::DefenderApi, key, payload);
        }
        self.refresh_availability();

        info!(
            devices = self.device_summary.total,
            incidents = self.defender_incident_summary.total,
            "Loaded delegated Defender data"
        );
        Ok(())
    }
}

/// Parse delegated data given either inline JSON or a path to a JSON file.
pub async fn load_delegated(source: &str) -> Result<Value, AdvisorError> {
    let trimmed = source.trim();
    if trimmed.starts_with('{') {
        return serde_json::from_str(trimmed)
            .map_err(|e| AdvisorError::Delegated(format!("Invalid delegated Defender JSON: {}", e)));
    }

    let path = Path::new(trimmed);
    if !path.exists() {
        return Err(AdvisorError::Delegated(format!(
            "Delegated Defender data file not found: {}",
            path.display()
        )));
    }
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content)
        .map_err(|e| AdvisorError::Delegated(format!("Invalid JSON in {}: {}", path.display(), e)))
}
