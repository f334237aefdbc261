use tracing::warn;

use crate::errors::AdvisorError;

/// Keys whose literal values are secrets and should come from the environment.
const SECRET_KEYS: &[&str] = &["client_secret", "access_token"];
/// Keys that hold upstream URLs.
const ENDPOINT_KEYS: &[&str] = &["graph", "defender", "authority"];
const LOOPBACK_HOSTS: &[&str] = &["http://127.0.0.1", "http://localhost", "http://[::1]"];

/// Reject plaintext upstream endpoints and flag secrets written inline.
pub fn validate_security_patterns(value: &serde_yaml::Value) -> Result<(), AdvisorError> {
    check_value(value, &[])
}

fn check_value(value: &serde_yaml::Value, path: &[String]) -> Result<(), AdvisorError> {
    match value {
        serde_yaml::Value::String(s) => {
            let key = path.last().map(String::as_str).unwrap_or_default();
            let path_str = if path.is_empty() { "root".to_string() } else { path.join(".") };

            if SECRET_KEYS.contains(&key) && !s.is_empty() && !s.starts_with('$') {
                warn!(path = %path_str, "Secret stored inline in config; prefer a $ENV reference");
            }
            if ENDPOINT_KEYS.contains(&key) && !is_allowed_endpoint(s) {
                return Err(AdvisorError::Config(format!(
                    "Endpoint at {} must use https: {}",
                    path_str, s
                )));
            }
            Ok(())
        }
        serde_yaml::Value::Mapping(map) => {
            for (k, v) in map {
                let key = k.as_str().unwrap_or("unknown").to_string();
                let mut new_path = path.to_vec();
                new_path.push(key);
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        serde_yaml::Value::Sequence(seq) => {
            for (i, v) in seq.iter().enumerate() {
                let mut new_path = path.to_vec();
                new_path.push(format!("[{}]", i));
                check_value(v, &new_path)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn is_allowed_endpoint(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.starts_with("https://") || LOOPBACK_HOSTS.iter().any(|h| lower.starts_with(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> serde_yaml::Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_https_endpoints_pass() {
        let value = yaml("endpoints:\n  graph: https://graph.microsoft.us\n  defender: http://127.0.0.1:9000");
        assert!(validate_security_patterns(&value).is_ok());
    }

    #[test]
    fn test_plaintext_endpoint_blocked() {
        let value = yaml("endpoints:\n  authority: http://login.example.com");
        let err = validate_security_patterns(&value).unwrap_err();
        assert!(err.to_string().contains("endpoints.authority"));
    }

    #[test]
    fn test_inline_secret_is_only_a_warning() {
        let value = yaml("tenant:\n  client_secret: hunter2hunter2");
        assert!(validate_security_patterns(&value).is_ok());
    }

    #[test]
    fn test_unrelated_http_values_ignored() {
        let value = yaml("output:\n  path: http-report.json");
        assert!(validate_security_patterns(&value).is_ok());
    }
}
