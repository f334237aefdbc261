//! Derived sentences and recommended actions computed once per snapshot.
//!
//! Each concern area carries metric sentences (only for non-zero counts) and
//! at most one recommended action, chosen by a fixed priority.

pub mod defender;
pub mod entra;

use serde::Serialize;

use crate::errors::AdvisorError;
use crate::models::{build_observation, Advisory, Priority};

pub use defender::DefenderInsights;
pub use entra::EntraInsights;

/// Status recorded on advisories derived from collected data.
pub const ACTIVE_STATUS: &str = "Success";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Concern {
    pub metrics: Vec<String>,
    /// Empty when nothing needs doing.
    pub recommended_action: String,
}

impl Concern {
    pub fn has_findings(&self) -> bool {
        !self.metrics.is_empty()
    }

    pub(crate) fn metric(&mut self, sentence: impl Into<String>) {
        self.metrics.push(sentence.into());
    }

    /// Set the action unless a higher-priority one is already present.
    pub(crate) fn recommend(&mut self, action: impl Into<String>) {
        if self.recommended_action.is_empty() {
            self.recommended_action = action.into();
        }
    }

    pub fn observation(&self, base: &str, clean: &str) -> String {
        build_observation(base, &self.metrics, clean)
    }

    pub fn to_advisory(&self, service: &str, template: &AdvisoryTemplate) -> Result<Advisory, AdvisorError> {
        Advisory::new(
            service,
            template.feature,
            &self.observation(template.base, template.clean),
            &self.recommended_action,
            Priority::High.as_str(),
            ACTIVE_STATUS,
        )
        .map(|a| a.with_link(template.link_text, template.link_url))
    }
}

/// Fixed wording for the advisory rendered from one concern.
#[derive(Debug, Clone, Copy)]
pub struct AdvisoryTemplate {
    pub feature: &'static str,
    pub base: &'static str,
    /// Appended when the concern has no metrics.
    pub clean: &'static str,
    pub link_text: &'static str,
    pub link_url: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: AdvisoryTemplate = AdvisoryTemplate {
        feature: "Feature",
        base: "Feature is active",
        clean: "Nothing found",
        link_text: "Docs",
        link_url: "https://learn.microsoft.com",
    };

    #[test]
    fn test_first_recommendation_wins() {
        let mut concern = Concern::default();
        concern.recommend("first");
        concern.recommend("second");
        assert_eq!(concern.recommended_action, "first");
    }

    #[test]
    fn test_advisory_with_findings_is_high_priority() {
        let concern = Concern {
            metrics: vec!["2 open items".into()],
            recommended_action: "Close them".into(),
        };
        let advisory = concern.to_advisory("Entra", &TEMPLATE).unwrap();
        assert_eq!(advisory.observation, "Feature is active. 2 open items");
        assert_eq!(advisory.priority, "High");
        assert_eq!(advisory.link_text, "Docs");
    }

    #[test]
    fn test_clean_advisory_has_no_priority() {
        let advisory = Concern::default().to_advisory("Entra", &TEMPLATE).unwrap();
        assert_eq!(advisory.observation, "Feature is active. Nothing found");
        assert_eq!(advisory.priority, "");
        assert_eq!(advisory.recommendation, "");
    }
}
