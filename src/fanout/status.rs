use serde::Serialize;

/// Side-channel record of why data is missing from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionStatus {
    pub activation_needed: bool,
    /// Set once, by the first activation failure classified.
    pub activation_message: String,
    /// Request names that answered 404 (capability not in the license tier).
    pub missing_features: Vec<String>,
    /// Request names refused with 403 and no provisioning marker.
    pub permission_denied: Vec<String>,
    /// Request names that failed for any other reason.
    pub failed: Vec<String>,
}

impl CollectionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_activation(&mut self, message: impl Into<String>) {
        self.activation_needed = true;
        if self.activation_message.is_empty() {
            self.activation_message = message.into();
        }
    }

    pub fn record_missing_feature(&mut self, name: &str) {
        push_unique(&mut self.missing_features, name);
    }

    pub fn record_permission_denied(&mut self, name: &str) {
        push_unique(&mut self.permission_denied, name);
    }

    pub fn record_failure(&mut self, name: &str) {
        push_unique(&mut self.failed, name);
    }

    pub fn is_missing(&self, name: &str) -> bool {
        self.missing_features.iter().any(|f| f == name)
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}
