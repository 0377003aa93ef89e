//! Client configuration.

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme and authority of the API, e.g. `http://localhost:8080`.
    pub host: String,
    #[serde(default)]
    pub disable_cache: bool,
    /// Headers appended to every outbound request.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let mut config: Self =
            serde_json::from_str(raw).map_err(|e| ApiError::SerializationError(e.to_string()))?;
        config.host = config.host.trim_end_matches('/').to_string();
        Ok(config)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.disable_cache = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_reads_fields() {
        let cfg = ClientConfig::from_json(
            r#"{"host":"http://cms.local/","disable_cache":true,"headers":[["X-Token","abc"]]}"#,
        )
        .unwrap();
        assert_eq!(cfg.host, "http://cms.local");
        assert!(cfg.disable_cache);
        assert_eq!(cfg.headers, vec![("X-Token".to_string(), "abc".to_string())]);
    }

    #[test]
    fn from_json_defaults_optional_fields() {
        let cfg = ClientConfig::from_json(r#"{"host":"http://cms.local"}"#).unwrap();
        assert!(!cfg.disable_cache);
        assert!(cfg.headers.is_empty());
    }

    #[test]
    fn from_json_requires_host() {
        assert!(ClientConfig::from_json("{}").is_err());
    }
}
