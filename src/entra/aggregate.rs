//! Folds from canonical Entra records into snapshot summaries.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;

use crate::errors::{Disposition, UpstreamError};
use crate::fanout::{FanOutResults, Triage};
use crate::metrics::{contains_any, count_where, field_in, lowered, percentage};
use crate::models::defender::{OAuthGrant, RiskyUser};
use crate::models::entra::*;
use crate::models::normalize::{collection, single};
use super::requests::{names, network};
use super::snapshot::*;

/// Office 365 application id as it appears in CA `includeApplications`.
pub const OFFICE_365_APP_ID: &str = "00000003-0000-0ff1-ce00-000000000000";
/// Microsoft Graph resource application id.
pub const GRAPH_RESOURCE_ID: &str = "00000003-0000-0000-c000-000000000000";
/// Global Administrator role template id.
pub const GLOBAL_ADMIN_ROLE_ID: &str = "62e90394-69f5-4237-9190-012177145e10";

const PASSWORDLESS_METHODS: &[&str] = &["microsoftAuthenticator", "fido2", "windowsHello"];
const LEGACY_CLIENT_APPS: &[&str] = &["pop", "imap", "smtp", "activesync", "other clients", "exchange web services"];
const HIGH_PRIVILEGE_SCOPES: &[&str] = &["mail.readwrite", "files.readwrite", "directory.readwrite"];
/// Default-user-role assignments that let users consent to apps themselves.
const USER_CONSENT_ASSIGNMENTS: &[&str] = &[
    "managePermissionGrantsForSelf.microsoft-user-default-legacy",
    "managePermissionGrantsForSelf.microsoft-user-default-low",
];

pub const PERMISSION_REQUIRED: &str = "NetworkAccessPolicy.Read.All permission required";
pub const LICENSE_REQUIRED: &str = "Entra Suite license required";

impl EntraSnapshot {
    /// Fold every successful payload of the directory pass.
    pub fn ingest(&mut self, triage: &Triage) {
        if triage.any_success() {
            self.graph_available = true;
        }
        self.ingest_payloads(triage);
    }

    /// Fold the Global Secure Access pass; it never marks the directory available.
    pub fn ingest_network_access(&mut self, triage: &Triage) {
        self.ingest_payloads(triage);
    }

    fn ingest_payloads(&mut self, triage: &Triage) {
        for (name, payload) in &triage.successes {
            self.absorb(name, payload);
        }
        self.correlate();
        self.available = self.graph_available;
    }

    /// Derive the Global Secure Access statuses from the raw outcomes.
    ///
    /// The first failing request behind a summary decides its status.
    pub fn record_network_access_status(&mut self, results: &FanOutResults) {
        if let Some((status, error)) = first_access_failure(results, network::INTERNET_ACCESS) {
            self.network_access_summary.status = status;
            self.network_access_summary.error = Some(error);
        }
        if let Some((status, error)) = first_access_failure(results, network::PRIVATE_ACCESS) {
            self.private_access_summary.status = status;
            self.private_access_summary.error = Some(error);
        }
    }

    pub(crate) fn absorb(&mut self, name: &str, payload: &Value) {
        match name {
            names::CA_POLICIES => self.fold_ca_policies(collection(payload)),
            names::AUTH_METHODS => self.fold_auth_methods(collection(payload)),
            names::RISKY_USERS => self.fold_risky_users(collection(payload)),
            names::RISK_DETECTIONS => self.fold_risk_detections(collection(payload)),
            names::ROLE_ASSIGNMENTS => self.fold_role_assignments(collection(payload)),
            names::ROLE_ELIGIBILITY_SCHEDULES => self.fold_eligibility_schedules(collection(payload)),
            names::ROLE_ASSIGNMENT_SCHEDULES => self.fold_assignment_schedules(collection(payload)),
            names::ACCESS_REVIEWS => self.fold_access_reviews(collection(payload)),
            names::MANAGED_DEVICES => self.fold_managed_devices(collection(payload)),
            names::COMPLIANCE_POLICIES => self.fold_compliance_policies(collection(payload)),
            names::GROUPS => self.fold_groups(collection(payload)),
            names::GUESTS => self.fold_guests(collection(payload)),
            names::CROSS_TENANT_POLICY => self.fold_cross_tenant_policy(single(payload)),
            names::SERVICE_PRINCIPALS => self.fold_service_principals(collection(payload)),
            names::OAUTH_GRANTS => self.fold_oauth_grants(collection(payload)),
            names::CONSENT_POLICIES => self.fold_consent_policies(collection(payload)),
            names::AUTHORIZATION_POLICY => self.fold_authorization_policy(single(payload)),
            names::SIGNIN_LOGS => self.fold_signins(collection(payload)),
            network::FILTERING_POLICIES => self.fold_filtering_policies(collection(payload)),
            network::FORWARDING_PROFILES => self.fold_forwarding_profiles(collection(payload)),
            network::REMOTE_NETWORKS => self.fold_remote_networks(collection(payload)),
            network::BRANCHES => self.fold_branches(collection(payload)),
            _ => debug!(request = name, "No aggregator for request"),
        }
    }

    fn fold_ca_policies(&mut self, policies: Vec<ConditionalAccessPolicy>) {
        if policies.is_empty() {
            return;
        }
        let mut summary = CaSummary { total: policies.len() as u64, ..Default::default() };
        for policy in &policies {
            match lowered(&policy.state).as_str() {
                "enabled" => summary.enabled += 1,
                "disabled" => summary.disabled += 1,
                "enabledforreportingbutnotenforced" => summary.report_only += 1,
                _ => {}
            }

            let controls = policy
                .grant_controls
                .as_ref()
                .and_then(|g| g.built_in_controls.as_deref())
                .unwrap_or_default();
            if has(controls, "mfa") {
                summary.require_mfa += 1;
            }
            if has(controls, "compliantDevice") {
                summary.require_compliant_device += 1;
            }
            if has(controls, "domainJoinedDevice") || has(controls, "approvedApplication") {
                summary.require_managed_device += 1;
            }

            let Some(conditions) = &policy.conditions else { continue };
            let apps = conditions
                .applications
                .as_ref()
                .and_then(|a| a.include_applications.as_deref())
                .unwrap_or_default();
            if has(apps, "All") {
                summary.target_all_apps += 1;
            }
            if has(apps, OFFICE_365_APP_ID) {
                summary.target_m365_apps += 1;
            }

            let client_types = conditions.client_app_types.as_deref().unwrap_or_default();
            if !client_types.is_empty() && !has(client_types, "exchangeActiveSync") && !has(client_types, "other") {
                summary.block_legacy_auth += 1;
            }
            if conditions.user_risk_levels.as_ref().is_some_and(|l| !l.is_empty()) {
                summary.user_risk_based += 1;
            }
            if conditions.sign_in_risk_levels.as_ref().is_some_and(|l| !l.is_empty()) {
                summary.signin_risk_based += 1;
            }
            if conditions.locations.as_ref().is_some_and(is_present) {
                summary.location_based += 1;
            }
        }
        self.ca_summary = summary;
        self.ca_policies = policies;
    }

    fn fold_auth_methods(&mut self, registrations: Vec<RegistrationDetail>) {
        if registrations.is_empty() {
            return;
        }
        let total = registrations.len() as u64;
        let mut summary = AuthSummary { total_users: total, ..Default::default() };
        for reg in &registrations {
            if reg.is_mfa_registered.unwrap_or_default() {
                summary.mfa_registered += 1;
            }
            if reg.is_mfa_capable.unwrap_or_default() {
                summary.mfa_capable += 1;
            }
            let methods = reg.methods_registered.as_deref().unwrap_or_default();
            if methods.iter().any(|m| PASSWORDLESS_METHODS.contains(&m.as_str())) {
                summary.passwordless_enabled += 1;
            }
            for method in methods {
                summary.methods.record(method);
            }
        }
        summary.mfa_registration_rate = percentage(summary.mfa_registered, total);
        summary.passwordless_adoption_rate = percentage(summary.passwordless_enabled, total);
        self.auth_summary = summary;
        self.auth_methods_registration = registrations;
    }

    fn fold_risky_users(&mut self, users: Vec<RiskyUser>) {
        if users.is_empty() {
            return;
        }
        let risk = &mut self.risk_summary;
        risk.risky_users_total = users.len() as u64;
        risk.risky_users_high = count_where(&users, |u| field_in(&u.risk_level, &["high"]));
        risk.risky_users_medium = count_where(&users, |u| field_in(&u.risk_level, &["medium"]));
        risk.risky_users_low = count_where(&users, |u| field_in(&u.risk_level, &["low"]));
        risk.confirmed_compromised = count_where(&users, |u| field_in(&u.risk_state, &["confirmedCompromised"]));
        risk.at_risk = count_where(&users, |u| field_in(&u.risk_state, &["atRisk"]));
        risk.remediated = count_where(&users, |u| field_in(&u.risk_state, &["remediated"]));
        risk.dismissed = count_where(&users, |u| field_in(&u.risk_state, &["dismissed"]));
        self.risky_users = users;
    }

    fn fold_risk_detections(&mut self, detections: Vec<RiskDetection>) {
        if detections.is_empty() {
            return;
        }
        self.risk_summary.risk_detections_total = detections.len() as u64;
        self.risk_summary.risk_detections_high = count_where(&detections, |d| field_in(&d.risk_level, &["high"]));
        self.risk_detections = detections;
    }

    fn fold_role_assignments(&mut self, assignments: Vec<RoleAssignment>) {
        if assignments.is_empty() {
            return;
        }
        let total = assignments.len() as u64;
        let pim = &mut self.pim_summary;
        pim.total_active_assignments = total;
        pim.permanent_assignments = total;
        pim.permanent_global_admins = count_where(&assignments, |a| {
            a.role_definition_id.as_deref().is_some_and(|id| id.contains(GLOBAL_ADMIN_ROLE_ID))
        });
        pim.permanent_privileged_roles = role_ids(&assignments, |a| a.role_definition_id.as_deref()).len() as u64;
        self.role_assignments = assignments;
    }

    fn fold_eligibility_schedules(&mut self, schedules: Vec<RoleSchedule>) {
        if schedules.is_empty() {
            return;
        }
        let total = schedules.len() as u64;
        self.pim_summary.total_eligible_assignments = total;
        self.pim_summary.eligible_assignments = total;
        self.pim_summary.pim_enabled_roles = total;
        self.role_eligibility_schedules = schedules;
    }

    fn fold_assignment_schedules(&mut self, schedules: Vec<RoleSchedule>) {
        if schedules.is_empty() {
            return;
        }
        self.pim_summary.total_time_bound_assignments = schedules.len() as u64;
        self.role_assignment_schedules = schedules;
    }

    fn fold_access_reviews(&mut self, reviews: Vec<AccessReviewDefinition>) {
        if reviews.is_empty() {
            return;
        }
        let mut summary = AccessReviewSummary { total_definitions: reviews.len() as u64, ..Default::default() };
        for review in &reviews {
            if field_in(&review.status, &["inProgress", "notStarted"]) {
                summary.active_reviews += 1;
            }
            let query = review.scope.as_ref().map(|s| lowered(&s.query)).unwrap_or_default();
            if query.contains("group") {
                summary.group_membership_reviews += 1;
            }
            if query.contains("role") {
                summary.role_assignment_reviews += 1;
            }
            if query.contains("serviceprincipal") || query.contains("application") {
                summary.application_assignment_reviews += 1;
            }
            if query.contains("guest") || query.contains("usertype") {
                summary.guest_user_reviews += 1;
            }
            if review.is_recurring() {
                summary.recurring_reviews += 1;
            } else {
                summary.one_time_reviews += 1;
            }
        }
        self.access_review_summary = summary;
        self.access_reviews = reviews;
    }

    fn fold_managed_devices(&mut self, devices: Vec<ManagedDevice>) {
        if devices.is_empty() {
            return;
        }
        let total = devices.len() as u64;
        let summary = &mut self.device_summary;
        summary.total_managed = total;
        summary.compliant = count_where(&devices, |d| field_in(&d.compliance_state, &["compliant"]));
        summary.non_compliant = count_where(&devices, |d| field_in(&d.compliance_state, &["noncompliant"]));
        summary.in_grace_period = count_where(&devices, |d| field_in(&d.compliance_state, &["inGracePeriod"]));
        summary.error = count_where(&devices, |d| field_in(&d.compliance_state, &["error"]));
        summary.not_applicable = count_where(&devices, |d| field_in(&d.compliance_state, &["notApplicable"]));
        summary.compliance_rate = percentage(summary.compliant, total);
        summary.corporate_owned = count_where(&devices, |d| field_in(&d.managed_device_owner_type, &["company"]));
        summary.personal_byod = count_where(&devices, |d| field_in(&d.managed_device_owner_type, &["personal"]));
        summary.windows = count_where(&devices, |d| lowered(&d.operating_system).contains("windows"));
        summary.ios = count_where(&devices, |d| lowered(&d.operating_system).contains("ios"));
        summary.android = count_where(&devices, |d| lowered(&d.operating_system).contains("android"));
        summary.macos = count_where(&devices, |d| lowered(&d.operating_system).contains("mac"));
        self.managed_devices = devices;
    }

    fn fold_compliance_policies(&mut self, policies: Vec<CompliancePolicy>) {
        if policies.is_empty() {
            return;
        }
        self.device_summary.compliance_policies_total = policies.len() as u64;
        self.compliance_policies = policies;
    }

    fn fold_groups(&mut self, groups: Vec<LicensedGroup>) {
        if groups.is_empty() {
            return;
        }
        let has_type = |g: &LicensedGroup, kind: &str| g.group_types.as_deref().is_some_and(|t| has(t, kind));
        self.group_licensing_summary = GroupLicensingSummary {
            total_groups_with_licenses: groups.len() as u64,
            groups_with_errors: count_where(&groups, |g| {
                g.license_processing_state
                    .as_ref()
                    .is_some_and(|s| field_in(&s.state, &["ProcessingFailed"]))
            }),
            copilot_license_groups: count_where(&groups, |g| lowered(&g.display_name).contains("copilot")),
            dynamic_groups: count_where(&groups, |g| has_type(g, "DynamicMembership")),
            security_groups: count_where(&groups, |g| g.security_enabled.unwrap_or_default()),
            distribution_groups: count_where(&groups, |g| {
                g.mail_enabled.unwrap_or_default() && !g.security_enabled.unwrap_or_default() && !has_type(g, "Unified")
            }),
        };
        self.groups_with_licenses = groups;
    }

    fn fold_guests(&mut self, guests: Vec<GuestUser>) {
        if guests.is_empty() {
            return;
        }
        self.b2b_summary.total_guests = guests.len() as u64;
        self.b2b_summary.guests_with_licenses =
            count_where(&guests, |g| g.assigned_licenses.as_ref().is_some_and(|l| !l.is_empty()));
        self.guest_users = guests;
    }

    fn fold_cross_tenant_policy(&mut self, policy: Option<CrossTenantAccessPolicy>) {
        let Some(policy) = policy else { return };
        self.b2b_summary.cross_tenant_access_configured = true;
        self.b2b_summary.default_settings = policy.default_settings.clone();
        self.b2b_summary.partner_configurations = policy.partners.as_ref().map_or(0, |p| p.len() as u64);
        self.cross_tenant_access_policy = Some(policy);
    }

    fn fold_service_principals(&mut self, principals: Vec<ServicePrincipal>) {
        if principals.is_empty() {
            return;
        }
        self.consent_summary.total_apps = principals.len() as u64;
        self.consent_summary.unverified_publishers = count_where(&principals, |sp| {
            let publisher = lowered(&sp.publisher_name);
            publisher.is_empty() || publisher == "unverified"
        });
        self.service_principals = principals;
    }

    fn fold_oauth_grants(&mut self, grants: Vec<OAuthGrant>) {
        if grants.is_empty() {
            return;
        }
        let scope_has = |g: &OAuthGrant, needles: &[&str]| contains_any(&[lowered(&g.scope)], needles);
        let consent = &mut self.consent_summary;
        consent.apps_with_delegated_permissions = grants.len() as u64;
        consent.apps_with_graph_access = count_where(&grants, |g| {
            g.resource_id.as_deref() == Some(GRAPH_RESOURCE_ID) || scope_has(g, &["graph"])
        });
        consent.apps_with_mail_access = count_where(&grants, |g| scope_has(g, &["mail"]));
        consent.apps_with_files_access = count_where(&grants, |g| scope_has(g, &["files", "sharepoint"]));
        consent.high_privilege_apps = count_where(&grants, |g| scope_has(g, HIGH_PRIVILEGE_SCOPES));
        self.oauth_permission_grants = grants;
    }

    fn fold_consent_policies(&mut self, policies: Vec<PermissionGrantPolicy>) {
        if policies.is_empty() {
            return;
        }
        self.permission_grant_policies = policies;
    }

    fn fold_authorization_policy(&mut self, policy: Option<AuthorizationPolicy>) {
        let Some(policy) = policy else { return };
        if let Some(invites) = &policy.allow_invites_from {
            self.auth_policy_summary.guest_invite_setting = invites.clone();
        }
        let permissions = policy.default_user_role_permissions.as_ref();
        self.auth_policy_summary.allow_users_to_register_apps =
            permissions.and_then(|p| p.allowed_to_create_apps).unwrap_or_default();

        if let Some(assigned) = permissions.and_then(|p| p.permission_grant_policies_assigned.as_ref()) {
            let user_consent = assigned
                .iter()
                .any(|id| USER_CONSENT_ASSIGNMENTS.iter().any(|u| id.eq_ignore_ascii_case(u)));
            self.consent_summary.user_consent_allowed = user_consent;
            self.consent_summary.admin_consent_required = !user_consent;
        }
        self.authorization_policy = Some(policy);
    }

    fn fold_signins(&mut self, signins: Vec<SignIn>) {
        if signins.is_empty() {
            return;
        }
        let mut summary = SigninSummary { total_signins_sampled: signins.len() as u64, ..Default::default() };
        for signin in &signins {
            if contains_any(&[lowered(&signin.client_app_used)], LEGACY_CLIENT_APPS) {
                summary.legacy_auth_attempts += 1;
            }
            for detail in signin.authentication_details.as_deref().unwrap_or_default() {
                if detail.authentication_method.as_deref() != Some("MFA") {
                    continue;
                }
                summary.mfa_required += 1;
                if detail.succeeded.unwrap_or_default() {
                    summary.mfa_success += 1;
                } else {
                    summary.mfa_failure += 1;
                }
            }
            match lowered(&signin.conditional_access_status).as_str() {
                "success" => summary.ca_success += 1,
                "failure" => summary.ca_failure += 1,
                _ => {}
            }
            if signin.status.as_ref().and_then(|s| s.error_code).unwrap_or_default() != 0 {
                summary.failed_signins += 1;
            }
            if field_in(&signin.risk_level_during_sign_in, &["high", "medium"]) {
                summary.risky_signins += 1;
            }
        }
        summary.mfa_success_rate = percentage(summary.mfa_success, summary.mfa_required);
        self.signin_summary = summary;
        self.signin_logs = signins;
    }

    fn fold_filtering_policies(&mut self, policies: Vec<FilteringPolicy>) {
        if policies.is_empty() {
            return;
        }
        let summary = &mut self.network_access_summary;
        summary.total_filtering_policies = policies.len() as u64;
        summary.enabled = true;
        summary.web_filtering_enabled = true;
        let destinations = policies
            .iter()
            .flat_map(|p| p.policy_rules.as_deref().unwrap_or_default())
            .flat_map(|r| r.destinations.as_deref().unwrap_or_default());
        for destination in destinations {
            let kind = lowered(&destination.odata_type);
            if kind.contains("fqdn") {
                summary.fqdn_rules_count += 1;
            } else if kind.contains("webcategory") {
                summary.web_category_rules_count += 1;
            }
        }
        self.network_filtering_policies = policies;
    }

    fn fold_forwarding_profiles(&mut self, profiles: Vec<ForwardingProfile>) {
        if profiles.is_empty() {
            return;
        }
        let summary = &mut self.network_access_summary;
        summary.total_forwarding_profiles = profiles.len() as u64;
        summary.enabled = true;
        for profile in profiles.iter().filter(|p| field_in(&p.state, &["enabled"])) {
            let name = lowered(&profile.name);
            if name.contains("microsoft365") || name.contains("m365") {
                summary.m365_traffic_forwarding = true;
            } else if name.contains("internet") {
                summary.internet_traffic_forwarding = true;
            }
            summary.traffic_forwarding_enabled = true;
        }
        self.network_forwarding_profiles = profiles;
    }

    fn fold_remote_networks(&mut self, connectors: Vec<RemoteNetwork>) {
        if connectors.is_empty() {
            return;
        }
        self.private_access_summary.total_connectors = connectors.len() as u64;
        self.private_access_summary.active_connectors =
            count_where(&connectors, |c| c.connectivity_state.as_deref() == Some("alive"));
        self.private_access_summary.enabled = true;
        self.private_access_connectors = connectors;
    }

    fn fold_branches(&mut self, branches: Vec<PrivateAccessBranch>) {
        if branches.is_empty() {
            return;
        }
        self.private_access_summary.total_apps = branches.len() as u64;
        self.private_access_summary.enabled = true;
        self.private_access_apps = branches;
    }

    /// Cross-domain facts, recomputed from the folded collections after every pass.
    fn correlate(&mut self) {
        if self.ca_summary.require_compliant_device > 0 {
            self.device_summary.ca_requires_compliance = true;
        }
        if self.ca_summary.user_risk_based > 0 {
            self.risk_summary.user_risk_policy_exists = true;
        }
        if self.ca_summary.signin_risk_based > 0 {
            self.risk_summary.signin_risk_policy_exists = true;
        }
        if self.authorization_policy.as_ref().is_some_and(|p| p.allow_invites_from.is_some()) {
            self.b2b_summary.guest_invite_restrictions = self.auth_policy_summary.guest_invite_setting.clone();
        }
        if !self.role_assignments.is_empty() {
            let eligible = role_ids(&self.role_eligibility_schedules, |s| s.role_definition_id.as_deref());
            let permanent = role_ids(&self.role_assignments, |a| a.role_definition_id.as_deref());
            self.pim_summary.roles_with_only_permanent = permanent.difference(&eligible).count() as u64;
        }
    }
}

fn has(values: &[String], wanted: &str) -> bool {
    values.iter().any(|v| v == wanted)
}

/// Graph returns `null`, `{}` or a populated object for unset conditions.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

fn role_ids<'a, T>(items: &'a [T], id: impl Fn(&'a T) -> Option<&'a str>) -> BTreeSet<&'a str> {
    items.iter().filter_map(id).collect()
}

fn first_access_failure(results: &FanOutResults, requests: &[&str]) -> Option<(AccessStatus, String)> {
    requests
        .iter()
        .find_map(|name| results.get(name).and_then(|o| o.as_ref().err()))
        .map(access_failure)
}

fn access_failure(error: &UpstreamError) -> (AccessStatus, String) {
    match (error.classify(&[]), error.status) {
        (Disposition::PermissionDenied, _) => (AccessStatus::PermissionDenied, PERMISSION_REQUIRED.to_string()),
        (Disposition::NotLicensed, _) => (AccessStatus::NotLicensed, LICENSE_REQUIRED.to_string()),
        (_, Some(code)) => (AccessStatus::Error, format!("HTTP {}", code)),
        (_, None) => (AccessStatus::Error, error.message.clone()),
    }
}
