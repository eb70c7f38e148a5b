//! Cluster member list and request-layer settings.

use serde::{Deserialize, Serialize};

/// How to reach the Marathon cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterSettings {
    /// Comma-separated member base URLs, e.g. `http://m1:8080,http://m2:8080`.
    pub url: String,
    /// HTTP basic auth user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_basic_auth_user: Option<String>,
    /// HTTP basic auth password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_basic_password: Option<String>,
    /// DC/OS ACS token, sent as `Authorization: token=<value>`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dcos_token: Option<String>,
    /// Timeout for request/response API calls (not the event stream).
    pub request_timeout_ms: u64,
    /// Interval between health probes of a member marked down.
    pub polling_wait_time_ms: u64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            http_basic_auth_user: None,
            http_basic_password: None,
            dcos_token: None,
            request_timeout_ms: 10_000,
            polling_wait_time_ms: 500,
        }
    }
}

impl ClusterSettings {
    /// Member base URLs with surrounding whitespace and trailing slashes removed.
    pub fn members(&self) -> Vec<String> {
        self.url
            .split(',')
            .map(|m| m.trim().trim_end_matches('/'))
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_split_and_trim() {
        let settings = ClusterSettings {
            url: " http://m1:8080/, http://m2:8080 ,,".into(),
            ..ClusterSettings::default()
        };
        assert_eq!(settings.members(), vec!["http://m1:8080", "http://m2:8080"]);
    }

    #[test]
    fn default_has_single_local_member() {
        assert_eq!(
            ClusterSettings::default().members(),
            vec!["http://127.0.0.1:8080"]
        );
    }
}
