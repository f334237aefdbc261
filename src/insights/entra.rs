use serde::Serialize;

use crate::entra::snapshot::{NetworkAccessSummary, PrivateAccessSummary};
use crate::entra::EntraSnapshot;
use crate::errors::AdvisorError;
use crate::models::Advisory;
use super::{AdvisoryTemplate, Concern};

pub const SERVICE: &str = "Entra";

/// More standing Global Administrators than this warrants moving them to PIM.
pub const MAX_PERMANENT_GLOBAL_ADMINS: u64 = 5;
/// Passwordless adoption target, in percent.
pub const PASSWORDLESS_TARGET: f64 = 50.0;

const CONDITIONAL_ACCESS: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Conditional Access",
    base: "Conditional Access is active",
    clean: "No Conditional Access policies found",
    link_text: "Conditional Access",
    link_url: "https://learn.microsoft.com/entra/identity/conditional-access/overview",
};

const AUTHENTICATION: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Microsoft Entra multifactor authentication",
    base: "Multifactor authentication is available",
    clean: "No MFA registrations found",
    link_text: "Authentication methods",
    link_url: "https://learn.microsoft.com/entra/identity/authentication/concept-authentication-methods",
};

const IDENTITY_PROTECTION: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Entra Identity Protection",
    base: "Entra Identity Protection is active",
    clean: "No risky users detected",
    link_text: "Identity Protection",
    link_url: "https://learn.microsoft.com/entra/id-protection/overview-identity-protection",
};

const PRIVILEGED_IDENTITY: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Privileged Identity Management",
    base: "Privileged Identity Management is available",
    clean: "No privileged role assignments found",
    link_text: "PIM",
    link_url: "https://learn.microsoft.com/entra/id-governance/privileged-identity-management/pim-configure",
};

const ACCESS_REVIEWS: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Access Reviews",
    base: "Access Reviews are available",
    clean: "No access review campaigns configured",
    link_text: "Access Reviews",
    link_url: "https://learn.microsoft.com/entra/id-governance/access-reviews-overview",
};

const DEVICE_COMPLIANCE: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Intune device compliance",
    base: "Intune device management is available",
    clean: "No managed devices found",
    link_text: "Device compliance",
    link_url: "https://learn.microsoft.com/mem/intune/protect/device-compliance-get-started",
};

const B2B: AdvisoryTemplate = AdvisoryTemplate {
    feature: "B2B collaboration",
    base: "External collaboration is available",
    clean: "No guest users found",
    link_text: "B2B collaboration",
    link_url: "https://learn.microsoft.com/entra/external-id/what-is-b2b",
};

const APP_CONSENT: AdvisoryTemplate = AdvisoryTemplate {
    feature: "Application consent",
    base: "Application consent governance is available",
    clean: "No applications found",
    link_text: "User consent settings",
    link_url: "https://learn.microsoft.com/entra/identity/enterprise-apps/configure-user-consent",
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntraInsights {
    pub available: bool,
    pub conditional_access: Concern,
    pub authentication: Concern,
    pub identity_risk: Concern,
    pub privileged_access: Concern,
    pub access_reviews: Concern,
    pub devices: Concern,
    pub b2b: Concern,
    pub app_consent: Concern,
    /// Global Secure Access summaries, carried with their status and error.
    pub network_access: NetworkAccessSummary,
    pub private_access: PrivateAccessSummary,
}

impl EntraInsights {
    pub fn from_snapshot(snapshot: &EntraSnapshot) -> Self {
        if !snapshot.available {
            return Self::default();
        }
        Self {
            available: true,
            conditional_access: conditional_access(snapshot),
            authentication: authentication(snapshot),
            identity_risk: identity_risk(snapshot),
            privileged_access: privileged_access(snapshot),
            access_reviews: access_reviews(snapshot),
            devices: devices(snapshot),
            b2b: b2b(snapshot),
            app_consent: app_consent(snapshot),
            network_access: snapshot.network_access_summary.clone(),
            private_access: snapshot.private_access_summary.clone(),
        }
    }

    pub fn has_identity_risks(&self) -> bool {
        self.identity_risk.has_findings()
    }

    pub fn has_privileged_access_findings(&self) -> bool {
        self.privileged_access.has_findings()
    }

    pub fn advisories(&self) -> Result<Vec<Advisory>, AdvisorError> {
        if !self.available {
            return Ok(Vec::new());
        }
        [
            (&self.conditional_access, &CONDITIONAL_ACCESS),
            (&self.authentication, &AUTHENTICATION),
            (&self.identity_risk, &IDENTITY_PROTECTION),
            (&self.privileged_access, &PRIVILEGED_IDENTITY),
            (&self.access_reviews, &ACCESS_REVIEWS),
            (&self.devices, &DEVICE_COMPLIANCE),
            (&self.b2b, &B2B),
            (&self.app_consent, &APP_CONSENT),
        ]
        .into_iter()
        .map(|(concern, template)| concern.to_advisory(SERVICE, template))
        .collect()
    }
}

fn conditional_access(snapshot: &EntraSnapshot) -> Concern {
    let ca = &snapshot.ca_summary;
    let mut concern = Concern::default();
    if ca.total == 0 {
        concern.recommend("Configure Conditional Access policies to secure M365 Copilot access with MFA and device compliance");
        return concern;
    }
    concern.metric(format!("{} CA policies", ca.total));
    for (count, label) in [(ca.enabled, "enabled"), (ca.require_mfa, "require MFA"), (ca.target_m365_apps, "target M365 apps")] {
        if count > 0 {
            concern.metric(format!("{} {}", count, label));
        }
    }

    let gaps: Vec<&str> = [
        (ca.target_m365_apps, "Create CA policy targeting M365 apps for Copilot security"),
        (ca.require_mfa, "Enable MFA requirement in CA policies"),
        (ca.require_compliant_device, "Require compliant devices for Copilot access"),
    ]
    .into_iter()
    .filter(|(count, _)| *count == 0)
    .map(|(_, action)| action)
    .collect();
    if !gaps.is_empty() {
        concern.recommend(gaps.join("; "));
    }
    concern
}

fn authentication(snapshot: &EntraSnapshot) -> Concern {
    let auth = &snapshot.auth_summary;
    let mut concern = Concern::default();
    if auth.mfa_registration_rate > 0.0 {
        concern.metric(format!("{}% MFA registered", auth.mfa_registration_rate));
    }
    if auth.passwordless_adoption_rate > 0.0 {
        concern.metric(format!("{}% passwordless", auth.passwordless_adoption_rate));
    }
    let legacy = snapshot.signin_summary.legacy_auth_attempts;
    if legacy > 0 {
        concern.metric(format!("{} legacy auth attempts", legacy));
    }

    let rate = auth.passwordless_adoption_rate;
    if rate == 0.0 {
        concern.recommend("Enable passwordless authentication (FIDO2, Windows Hello, Authenticator) for better Copilot UX");
    } else if rate < PASSWORDLESS_TARGET {
        concern.recommend(format!(
            "Increase passwordless adoption from {}% to 50%+ for improved security and user experience",
            rate
        ));
    }
    concern
}

fn identity_risk(snapshot: &EntraSnapshot) -> Concern {
    let risk = &snapshot.risk_summary;
    let mut concern = Concern::default();
    if risk.risky_users_total > 0 {
        if risk.confirmed_compromised > 0 {
            concern.metric(format!("{} risky users ({} compromised)", risk.risky_users_total, risk.confirmed_compromised));
            concern.recommend(format!("Revoke access for {} compromised account(s)", risk.confirmed_compromised));
        } else if risk.risky_users_high > 0 {
            concern.metric(format!("{} risky users ({} high-risk)", risk.risky_users_total, risk.risky_users_high));
            concern.recommend(format!("Review {} high-risk user(s)", risk.risky_users_high));
        } else {
            concern.metric(format!("{} risky users", risk.risky_users_total));
        }
    }
    if !risk.user_risk_policy_exists && !risk.signin_risk_policy_exists {
        concern.recommend("Configure user risk and sign-in risk policies");
    }
    concern
}

fn privileged_access(snapshot: &EntraSnapshot) -> Concern {
    let pim = &snapshot.pim_summary;
    let mut concern = Concern::default();
    if pim.permanent_assignments > 0 {
        concern.metric(format!("{} permanent role assignments", pim.permanent_assignments));
    }
    if pim.eligible_assignments > 0 {
        concern.metric(format!("{} eligible (PIM) assignments", pim.eligible_assignments));
    }
    if pim.permanent_global_admins > 0 {
        concern.metric(format!("{} permanent global admins", pim.permanent_global_admins));
    }

    // No PIM at all outranks the global admin count.
    if pim.permanent_assignments > 0 && pim.eligible_assignments == 0 {
        concern.recommend("Enable PIM for just-in-time privileged access");
    } else if pim.permanent_global_admins > MAX_PERMANENT_GLOBAL_ADMINS {
        concern.recommend("Move global admins to PIM eligible roles (recommended max: 5 permanent)");
    }
    concern
}

fn access_reviews(snapshot: &EntraSnapshot) -> Concern {
    let reviews = &snapshot.access_review_summary;
    let mut concern = Concern::default();
    if reviews.total_definitions == 0 {
        return concern;
    }
    concern.metric(format!("{} access review campaigns", reviews.total_definitions));
    if reviews.recurring_reviews > 0 {
        concern.metric(format!("{} recurring", reviews.recurring_reviews));
    }
    if reviews.guest_user_reviews > 0 {
        concern.metric(format!("{} for guests", reviews.guest_user_reviews));
    }
    concern
}

fn devices(snapshot: &EntraSnapshot) -> Concern {
    let devices = &snapshot.device_summary;
    let mut concern = Concern::default();
    if devices.total_managed == 0 {
        return concern;
    }
    concern.metric(format!("{} managed devices", devices.total_managed));
    concern.metric(format!("{}% compliant", devices.compliance_rate));
    if devices.non_compliant > 0 {
        concern.metric(format!("{} non-compliant", devices.non_compliant));
    }
    concern
}

fn b2b(snapshot: &EntraSnapshot) -> Concern {
    let b2b = &snapshot.b2b_summary;
    let mut concern = Concern::default();
    if b2b.total_guests > 0 {
        concern.metric(format!("{} guest users", b2b.total_guests));
        if b2b.guests_with_licenses > 0 {
            concern.metric(format!("{} with licenses", b2b.guests_with_licenses));
        }
    }
    if b2b.cross_tenant_access_configured {
        concern.metric("Cross-tenant access configured");
    }
    concern
}

fn app_consent(snapshot: &EntraSnapshot) -> Concern {
    let consent = &snapshot.consent_summary;
    let mut concern = Concern::default();
    if consent.total_apps > 0 {
        concern.metric(format!("{} applications", consent.total_apps));
        if consent.high_privilege_apps > 0 {
            concern.metric(format!("{} high-privilege", consent.high_privilege_apps));
            concern.recommend(format!("Review {} high-privilege app(s)", consent.high_privilege_apps));
        }
        if consent.unverified_publishers > 0 {
            concern.metric(format!("{} unverified publishers", consent.unverified_publishers));
        }
    }
    if consent.user_consent_allowed {
        concern.metric("User consent enabled");
        concern.recommend("Consider requiring admin consent for sensitive permissions");
    }
    concern
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entra::snapshot::*;

    fn available() -> EntraSnapshot {
        EntraSnapshot { available: true, graph_available: true, ..Default::default() }
    }

    #[test]
    fn test_unavailable_snapshot_is_empty() {
        let insights = EntraInsights::from_snapshot(&EntraSnapshot::new());
        assert_eq!(insights, EntraInsights::default());
        assert!(insights.advisories().unwrap().is_empty());
    }

    #[test]
    fn test_global_secure_access_summaries_pass_through() {
        let mut snapshot = available();
        snapshot.network_access_summary = NetworkAccessSummary {
            status: AccessStatus::PermissionDenied,
            error: Some("NetworkAccessPolicy.Read.All permission required".into()),
            ..Default::default()
        };
        snapshot.private_access_summary.total_connectors = 3;

        let insights = EntraInsights::from_snapshot(&snapshot);
        assert_eq!(insights.network_access, snapshot.network_access_summary);
        assert_eq!(insights.private_access.total_connectors, 3);
        assert_eq!(insights.advisories().unwrap().len(), 8);
    }

    #[test]
    fn test_no_ca_policies_recommends_baseline() {
        let insights = EntraInsights::from_snapshot(&available());
        assert!(insights.conditional_access.metrics.is_empty());
        assert!(insights.conditional_access.recommended_action.starts_with("Configure Conditional Access policies"));
    }

    #[test]
    fn test_ca_gaps_joined_in_order() {
        let mut snapshot = available();
        snapshot.ca_summary = CaSummary { total: 4, enabled: 3, require_mfa: 2, ..Default::default() };
        let ca = EntraInsights::from_snapshot(&snapshot).conditional_access;
        assert_eq!(ca.metrics, vec!["4 CA policies", "3 enabled", "2 require MFA"]);
        assert_eq!(
            ca.recommended_action,
            "Create CA policy targeting M365 apps for Copilot security; Require compliant devices for Copilot access"
        );
    }

    #[test]
    fn test_passwordless_recommendation_tiers() {
        let mut snapshot = available();
        snapshot.auth_summary = AuthSummary { mfa_registration_rate: 80.5, passwordless_adoption_rate: 25.0, ..Default::default() };
        let auth = EntraInsights::from_snapshot(&snapshot).authentication;
        assert_eq!(auth.metrics, vec!["80.5% MFA registered", "25% passwordless"]);
        assert_eq!(
            auth.recommended_action,
            "Increase passwordless adoption from 25% to 50%+ for improved security and user experience"
        );

        snapshot.auth_summary.passwordless_adoption_rate = 75.0;
        assert!(EntraInsights::from_snapshot(&snapshot).authentication.recommended_action.is_empty());
    }

    #[test]
    fn test_risk_policy_fallback_only_without_action() {
        let mut snapshot = available();
        snapshot.risk_summary = RiskSummary { risky_users_total: 3, risky_users_high: 2, ..Default::default() };
        let risk = EntraInsights::from_snapshot(&snapshot).identity_risk;
        assert_eq!(risk.metrics, vec!["3 risky users (2 high-risk)"]);
        assert_eq!(risk.recommended_action, "Review 2 high-risk user(s)");

        snapshot.risk_summary = RiskSummary::default();
        let risk = EntraInsights::from_snapshot(&snapshot).identity_risk;
        assert!(!risk.has_findings());
        assert_eq!(risk.recommended_action, "Configure user risk and sign-in risk policies");
    }

    #[test]
    fn test_missing_pim_outranks_global_admin_count() {
        let mut snapshot = available();
        snapshot.pim_summary = PimSummary { permanent_assignments: 12, permanent_global_admins: 8, ..Default::default() };
        let insights = EntraInsights::from_snapshot(&snapshot);
        assert_eq!(insights.privileged_access.recommended_action, "Enable PIM for just-in-time privileged access");

        snapshot.pim_summary.eligible_assignments = 4;
        let insights = EntraInsights::from_snapshot(&snapshot);
        assert_eq!(
            insights.privileged_access.recommended_action,
            "Move global admins to PIM eligible roles (recommended max: 5 permanent)"
        );
        assert_eq!(insights.privileged_access.metrics.len(), 3);
    }

    #[test]
    fn test_device_and_b2b_metrics() {
        let mut snapshot = available();
        snapshot.device_summary = DeviceComplianceSummary {
            total_managed: 4,
            compliant: 3,
            non_compliant: 1,
            compliance_rate: 75.0,
            ..Default::default()
        };
        snapshot.b2b_summary.cross_tenant_access_configured = true;
        let insights = EntraInsights::from_snapshot(&snapshot);
        assert_eq!(insights.devices.metrics, vec!["4 managed devices", "75% compliant", "1 non-compliant"]);
        assert_eq!(insights.b2b.metrics, vec!["Cross-tenant access configured"]);
    }

    #[test]
    fn test_app_consent_high_privilege_first() {
        let mut snapshot = available();
        snapshot.consent_summary = ConsentSummary {
            total_apps: 10,
            high_privilege_apps: 2,
            user_consent_allowed: true,
            ..Default::default()
        };
        let consent = EntraInsights::from_snapshot(&snapshot).app_consent;
        assert_eq!(consent.metrics, vec!["10 applications", "2 high-privilege", "User consent enabled"]);
        assert_eq!(consent.recommended_action, "Review 2 high-privilege app(s)");
    }

    #[test]
    fn test_every_concern_renders_an_advisory() {
        let advisories = EntraInsights::from_snapshot(&available()).advisories().unwrap();
        assert_eq!(advisories.len(), 8);
        assert!(advisories.iter().all(|a| a.service == "Entra"));
        assert_eq!(advisories[0].priority, "High");
    }
}
