use serde_json::Value;
use tracing::{info, warn};

use crate::auth::{TokenProvider, DEFENDER_SCOPE, GRAPH_SCOPE};
use crate::config::CollectionSettings;
use crate::fanout::{fan_out, triage, FanOutResults};
use crate::upstream::ApiClient;
use super::aggregate::DefenderSource;
use super::requests::{defender_api_requests, graph_security_requests, DEFENDER_API_RULE, GRAPH_SECURITY_RULE};
use super::snapshot::DefenderSnapshot;

/// One Defender collection pass: Graph Security plus either the live
/// Defender API or a delegated blob.
pub struct DefenderCollector<'a> {
    tokens: &'a dyn TokenProvider,
    settings: &'a CollectionSettings,
    delegated: Option<Value>,
}

impl<'a> DefenderCollector<'a> {
    pub fn new(tokens: &'a dyn TokenProvider, settings: &'a CollectionSettings) -> Self {
        Self { tokens, settings, delegated: None }
    }

    /// Use delegated Defender API data instead of calling the API.
    pub fn with_delegated(mut self, blob: Value) -> Self {
        self.delegated = Some(blob);
        self
    }

    pub async fn collect(&self) -> DefenderSnapshot {
        let mut snapshot = DefenderSnapshot::new();

        let graph = self.fetch_graph_security();
        let defender = async {
            match self.delegated {
                Some(_) => None,
                None => self.fetch_defender_api().await,
            }
        };
        let (graph, defender) = futures::join!(graph, defender);

        if let Some(results) = graph {
            apply(&mut snapshot, DefenderSource::GraphSecurity, results);
        }
        match (&self.delegated, defender) {
            (Some(blob), _) => {
                if let Err(e) = snapshot.ingest_delegated(blob) {
                    warn!(error = %e, "Delegated Defender data rejected");
                }
            }
            (None, Some(results)) => apply(&mut snapshot, DefenderSource::DefenderApi, results),
            (None, None) => {}
        }

        info!(
            graph_security = snapshot.graph_security_available,
            defender_api = snapshot.defender_api_available,
            activation_needed = snapshot.status.activation_needed,
            missing = snapshot.status.missing_features.len(),
            "Defender collection complete"
        );
        snapshot
    }

    async fn fetch_graph_security(&self) -> Option<FanOutResults> {
        let client = self.connect(GRAPH_SCOPE, &self.settings.graph_base_url, GRAPH_SECURITY_RULE.source).await?;
        Some(fan_out(graph_security_requests(&client)).await)
    }

    async fn fetch_defender_api(&self) -> Option<FanOutResults> {
        let client = self.connect(DEFENDER_SCOPE, &self.settings.defender_base_url, DEFENDER_API_RULE.source).await?;
        Some(fan_out(defender_api_requests(&client, self.settings.lookback_days)).await)
    }

    async fn connect(&self, scope: &str, base_url: &str, source: &str) -> Option<ApiClient> {
        match ApiClient::connect(self.tokens, scope, base_url, &self.settings.client).await {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(source, error = %e, "Credential acquisition failed, skipping section");
                None
            }
        }
    }
}

fn apply(snapshot: &mut DefenderSnapshot, source: DefenderSource, results: FanOutResults) {
    let rule = match source {
        DefenderSource::GraphSecurity => &GRAPH_SECURITY_RULE,
        DefenderSource::DefenderApi => &DEFENDER_API_RULE,
    };
    let outcome = triage(results, rule, &mut snapshot.status);
    snapshot.ingest(source, &outcome);
}
