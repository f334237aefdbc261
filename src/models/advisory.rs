use serde::{Deserialize, Serialize};

use crate::errors::AdvisorError;

/// Priority of an advisory that carries a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "High" => Some(Priority::High),
            "Medium" => Some(Priority::Medium),
            "Low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One advisory record as consumed by the report renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Advisory {
    pub service: String,
    pub feature: String,
    pub status: String,
    /// Empty when the advisory is an observation without a recommendation.
    pub priority: String,
    pub observation: String,
    pub recommendation: String,
    pub link_text: String,
    pub link_url: String,
}

impl Advisory {
    /// Build an advisory. `priority` must be High, Medium or Low whenever a
    /// recommendation is given; it is cleared when there is none.
    pub fn new(
        service: &str,
        feature: &str,
        observation: &str,
        recommendation: &str,
        priority: &str,
        status: &str,
    ) -> Result<Self, AdvisorError> {
        if service.is_empty() || feature.is_empty() || observation.is_empty() {
            return Err(AdvisorError::Validation(
                "Service, Feature, and Observation are required".into(),
            ));
        }
        let priority = if recommendation.is_empty() {
            String::new()
        } else {
            Priority::parse(priority)
                .ok_or_else(|| {
                    AdvisorError::Validation(format!(
                        "Priority must be 'High', 'Medium', or 'Low' when recommendation is provided, got '{}'",
                        priority
                    ))
                })?
                .as_str()
                .to_string()
        };
        Ok(Self {
            service: service.to_string(),
            feature: feature.to_string(),
            status: status.to_string(),
            priority,
            observation: observation.to_string(),
            recommendation: recommendation.to_string(),
            link_text: String::new(),
            link_url: String::new(),
        })
    }

    pub fn with_link(mut self, text: &str, url: &str) -> Self {
        self.link_text = text.to_string();
        self.link_url = url.to_string();
        self
    }
}

/// `"{base}. {metric, metric}"`, falling back to `clean` (or just `base`) when there are no metrics.
pub fn build_observation(base: &str, metrics: &[String], clean: &str) -> String {
    if !metrics.is_empty() {
        format!("{}. {}", base, metrics.join(", "))
    } else if !clean.is_empty() {
        format!("{}. {}", base, clean)
    } else {
        base.to_string()
    }
}
