//! Canonical records for Entra ID (Graph directory, identity and Intune) payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionalAccessPolicy {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub state: Option<String>,
    pub grant_controls: Option<GrantControls>,
    pub conditions: Option<PolicyConditions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GrantControls {
    pub operator: Option<String>,
    pub built_in_controls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConditions {
    pub applications: Option<ApplicationConditions>,
    pub client_app_types: Option<Vec<String>>,
    pub user_risk_levels: Option<Vec<String>>,
    pub sign_in_risk_levels: Option<Vec<String>>,
    pub locations: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationConditions {
    pub include_applications: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrationDetail {
    pub user_principal_name: Option<String>,
    pub is_mfa_registered: Option<bool>,
    pub is_mfa_capable: Option<bool>,
    pub methods_registered: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskDetection {
    pub id: Option<String>,
    pub risk_event_type: Option<String>,
    pub risk_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleAssignment {
    pub id: Option<String>,
    pub principal_id: Option<String>,
    pub role_definition_id: Option<String>,
}

/// Eligibility and time-bound assignment schedules share this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleSchedule {
    pub id: Option<String>,
    pub principal_id: Option<String>,
    pub role_definition_id: Option<String>,
    pub schedule_info: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessReviewDefinition {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub status: Option<String>,
    pub scope: Option<ReviewScope>,
    pub settings: Option<ReviewSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewScope {
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewSettings {
    pub recurrence: Option<Value>,
}

impl AccessReviewDefinition {
    pub fn is_recurring(&self) -> bool {
        self.settings
            .as_ref()
            .and_then(|s| s.recurrence.as_ref())
            .and_then(|r| r.get("pattern"))
            .is_some_and(|p| !p.is_null())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManagedDevice {
    pub id: Option<String>,
    pub device_name: Option<String>,
    pub compliance_state: Option<String>,
    pub managed_device_owner_type: Option<String>,
    pub operating_system: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompliancePolicy {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicensedGroup {
    pub id: Option<String>,
    pub display_name: Option<String>,
    pub group_types: Option<Vec<String>>,
    pub security_enabled: Option<bool>,
    pub mail_enabled: Option<bool>,
    pub license_processing_state: Option<LicenseProcessingState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseProcessingState {
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestUser {
    pub id: Option<String>,
    pub user_principal_name: Option<String>,
    pub assigned_licenses: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrossTenantAccessPolicy {
    pub display_name: Option<String>,
    pub allowed_cloud_endpoints: Option<Vec<String>>,
    /// Tenant-wide default inbound/outbound settings, when expanded.
    #[serde(rename = "default")]
    pub default_settings: Option<Value>,
    pub partners: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServicePrincipal {
    pub id: Option<String>,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub publisher_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionGrantPolicy {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthorizationPolicy {
    pub allow_invites_from: Option<String>,
    pub default_user_role_permissions: Option<DefaultUserRolePermissions>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultUserRolePermissions {
    pub allowed_to_create_apps: Option<bool>,
    /// Assignment ids such as `managePermissionGrantsForSelf.microsoft-user-default-low`.
    pub permission_grant_policies_assigned: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignIn {
    pub id: Option<String>,
    pub client_app_used: Option<String>,
    pub status: Option<SignInStatus>,
    pub authentication_details: Option<Vec<AuthenticationDetail>>,
    pub conditional_access_status: Option<String>,
    pub risk_level_during_sign_in: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignInStatus {
    pub error_code: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthenticationDetail {
    pub authentication_method: Option<String>,
    pub succeeded: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilteringPolicy {
    pub name: Option<String>,
    pub policy_rules: Option<Vec<FilteringRule>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilteringRule {
    pub name: Option<String>,
    pub destinations: Option<Vec<RuleDestination>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleDestination {
    #[serde(rename = "@odata.type")]
    pub odata_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForwardingProfile {
    pub name: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteNetwork {
    pub name: Option<String>,
    pub connectivity_state: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateAccessBranch {
    pub name: Option<String>,
}
