use serde_json::Value;
use tracing::{debug, info, warn};

use crate::errors::{Disposition, UpstreamError};
use crate::utils::truncation::truncate_error;
use super::fetcher::FanOutResults;
use super::status::CollectionStatus;

/// How one sub-API reports that its product is not provisioned.
#[derive(Debug, Clone, Copy)]
pub struct ActivationRule {
    /// Sub-API label used in log lines, e.g. "Graph Security API".
    pub source: &'static str,
    /// Product named in the activation message.
    pub product: &'static str,
    /// Case-insensitive phrases that mark a 403 as "not provisioned".
    pub markers: &'static [&'static str],
}

impl ActivationRule {
    pub fn activation_message(&self, error: &UpstreamError) -> String {
        format!("{} not activated: {}", self.product, truncate_error(&error.message))
    }
}

/// Successful payloads of one fan-out pass, in request order.
#[derive(Debug, Default)]
pub struct Triage {
    pub successes: Vec<(String, Value)>,
    pub attempted: usize,
}

impl Triage {
    pub fn any_success(&self) -> bool {
        !self.successes.is_empty()
    }

    pub fn payload(&self, name: &str) -> Option<&Value> {
        self.successes.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Route every outcome to its disposition, recording failures in `status`.
///
/// Outcomes are processed in request order, which makes the first activation
/// failure in that order the one whose message is kept.
pub fn triage(results: FanOutResults, rule: &ActivationRule, status: &mut CollectionStatus) -> Triage {
    let attempted = results.len();
    let mut successes = Vec::new();

    for (name, outcome) in results {
        match outcome {
            Ok(payload) => {
                debug!(source = rule.source, request = %name, "Request succeeded");
                successes.push((name, payload));
            }
            Err(error) => apply_failure(&name, &error, rule, status),
        }
    }

    info!(
        source = rule.source,
        fetched = successes.len(),
        attempted,
        "Datasets fetched"
    );

    Triage { successes, attempted }
}

fn apply_failure(name: &str, error: &UpstreamError, rule: &ActivationRule, status: &mut CollectionStatus) {
    let disposition = error.classify(rule.markers);
    match disposition {
        Disposition::ActivationNeeded => {
            info!(source = rule.source, request = name, product = rule.product, "Product not provisioned for tenant");
            status.record_activation(rule.activation_message(error));
        }
        Disposition::PermissionDenied => {
            warn!(source = rule.source, request = name, "Insufficient permissions (403)");
            status.record_permission_denied(name);
        }
        Disposition::NotLicensed => {
            warn!(source = rule.source, request = name, "Not available in current SKU (404)");
            status.record_missing_feature(name);
        }
        Disposition::Failed => {
            warn!(source = rule.source, request = name, error = %truncate_error(&error.to_string()), "Request failed");
            status.record_failure(name);
        }
    }
}
