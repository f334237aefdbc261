use super::types::UpstreamError;

/// How a failed upstream request is accounted for in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The product is not provisioned for the tenant.
    ActivationNeeded,
    /// The credential lacks the scope for this sub-API.
    PermissionDenied,
    /// The endpoint is absent from the tenant's license tier.
    NotLicensed,
    /// Anything else: transport errors, 5xx, throttling.
    Failed,
}

impl Disposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::ActivationNeeded => "activation_needed",
            Disposition::PermissionDenied => "permission_denied",
            Disposition::NotLicensed => "not_licensed",
            Disposition::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UpstreamError {
    /// Classify this failure. `markers` are the backend's provisioning phrases,
    /// matched case-insensitively against the message of a 403.
    pub fn classify(&self, markers: &[&str]) -> Disposition {
        match self.status {
            Some(403) => {
                let message = self.message.to_lowercase();
                if markers.iter().any(|m| message.contains(&m.to_lowercase())) {
                    Disposition::ActivationNeeded
                } else {
                    Disposition::PermissionDenied
                }
            }
            Some(404) => Disposition::NotLicensed,
            _ => Disposition::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: &[&str] = &["not provisioned"];

    #[test]
    fn test_forbidden_with_marker_needs_activation() {
        let err = UpstreamError::http(403, "Tenant is NOT PROVISIONED for Defender");
        assert_eq!(err.classify(MARKERS), Disposition::ActivationNeeded);
    }

    #[test]
    fn test_forbidden_without_marker_is_permission() {
        let err = UpstreamError::http(403, "Insufficient privileges");
        assert_eq!(err.classify(MARKERS), Disposition::PermissionDenied);
    }

    #[test]
    fn test_not_found_is_not_licensed() {
        let err = UpstreamError::http(404, "not provisioned");
        assert_eq!(err.classify(MARKERS), Disposition::NotLicensed);
    }

    #[test]
    fn test_marker_without_403_is_failure() {
        let err = UpstreamError::transport("not provisioned");
        assert_eq!(err.classify(MARKERS), Disposition::Failed);
        assert_eq!(UpstreamError::http(500, "boom").classify(MARKERS), Disposition::Failed);
    }
}
