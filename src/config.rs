use crate::tavus;

/// Process configuration, read once at startup. Credentials stay optional so
/// the service can boot (and report its health) without them; starting a
/// call with them missing is a configuration error, not a crash.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub tavus_api_key: Option<String>,
    pub tavus_persona_id: Option<String>,
    pub tavus_base_url: String,
    pub catalog_path: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            tavus_api_key: env_non_empty("TAVUS_API_KEY"),
            tavus_persona_id: env_non_empty("TAVUS_PERSONA_ID"),
            tavus_base_url: std::env::var("TAVUS_BASE_URL")
                .unwrap_or_else(|_| tavus::DEFAULT_BASE_URL.to_string()),
            catalog_path: std::env::var("ARC_CATALOG_PATH")
                .unwrap_or_else(|_| "conversation-arcs.yaml".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8000),
        }
    }

    /// Both halves of the provider credentials, or `None` if either is
    /// missing.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.tavus_api_key, &self.tavus_persona_id) {
            (Some(key), Some(persona)) => Some((key.as_str(), persona.as_str())),
            _ => None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(key: Option<&str>, persona: Option<&str>) -> AppConfig {
        AppConfig {
            tavus_api_key: key.map(str::to_string),
            tavus_persona_id: persona.map(str::to_string),
            tavus_base_url: tavus::DEFAULT_BASE_URL.to_string(),
            catalog_path: "conversation-arcs.yaml".to_string(),
            port: 8000,
        }
    }

    #[test]
    fn credentials_require_both_halves() {
        assert!(config_with(Some("key"), Some("persona")).credentials().is_some());
        assert!(config_with(Some("key"), None).credentials().is_none());
        assert!(config_with(None, Some("persona")).credentials().is_none());
        assert!(config_with(None, None).credentials().is_none());
    }
}
