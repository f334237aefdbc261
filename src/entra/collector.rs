use tracing::{info, warn};

use crate::auth::{TokenProvider, GRAPH_SCOPE};
use crate::config::CollectionSettings;
use crate::fanout::{fan_out, triage};
use crate::upstream::ApiClient;
use super::requests::{directory_requests, network_access_requests, ENTRA_RULE, GLOBAL_SECURE_ACCESS_RULE};
use super::snapshot::EntraSnapshot;

/// One Entra collection pass over Graph v1.0 and the Global Secure Access beta API.
pub struct EntraCollector<'a> {
    tokens: &'a dyn TokenProvider,
    settings: &'a CollectionSettings,
}

impl<'a> EntraCollector<'a> {
    pub fn new(tokens: &'a dyn TokenProvider, settings: &'a CollectionSettings) -> Self {
        Self { tokens, settings }
    }

    pub async fn collect(&self) -> EntraSnapshot {
        let mut snapshot = EntraSnapshot::new();

        let client = match ApiClient::connect(self.tokens, GRAPH_SCOPE, &self.settings.graph_base_url, &self.settings.client).await {
            Ok(client) => client,
            Err(e) => {
                warn!(source = ENTRA_RULE.source, error = %e, "Credential acquisition failed, skipping Entra collection");
                return snapshot;
            }
        };

        let (directory, network) = futures::join!(
            fan_out(directory_requests(&client)),
            fan_out(network_access_requests(&client)),
        );

        let outcome = triage(directory, &ENTRA_RULE, &mut snapshot.status);
        snapshot.ingest(&outcome);

        snapshot.record_network_access_status(&network);
        let outcome = triage(network, &GLOBAL_SECURE_ACCESS_RULE, &mut snapshot.status);
        snapshot.ingest_network_access(&outcome);

        info!(
            available = snapshot.available,
            ca_policies = snapshot.ca_summary.total,
            missing = snapshot.status.missing_features.len(),
            permission_denied = snapshot.status.permission_denied.len(),
            network_access = snapshot.network_access_summary.status.as_str(),
            "Entra collection complete"
        );
        snapshot
    }
}
