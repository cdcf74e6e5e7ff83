use serde::Deserialize;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FeatureToggles {
    #[serde(flatten)]
    pub flags: HashMap<String, bool>,
}

impl FeatureToggles {
    // Load from a provided path or env var FEATURE_TOGGLES_PATH, defaulting to ./feature-toggles.json
    pub fn from_path(path: Option<String>) -> Self {
        let default_path = std::env::var("FEATURE_TOGGLES_PATH")
            .unwrap_or_else(|_| "feature-toggles.json".to_string());
        let path = path.unwrap_or(default_path);

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed feature toggles at {}: {}", path, e);
                FeatureToggles::default()
            }),
            Err(_) => FeatureToggles::default(),
        }
    }

    pub fn from_env_path() -> Self {
        Self::from_path(None)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn is_enabled_or(&self, name: &str, default: bool) -> bool {
        self.flags.get(name).copied().unwrap_or(default)
    }

    // Redis-backed bill cache; the in-memory cache is used when off or unreachable
    pub fn redis_enabled(&self) -> bool {
        self.is_enabled_or("Redis", true)
    }

    // Background refresh of every user's bills
    pub fn periodic_refresh_enabled(&self) -> bool {
        self.is_enabled_or("PeriodicRefresh", true)
    }

    // Registers the in-process simulated provider under `mock-provider`
    pub fn simulated_providers_enabled(&self) -> bool {
        self.is_enabled_or("SimulatedProviders", false)
    }

    pub fn enabled_features(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .flags
            .iter()
            .filter(|(_, &enabled)| enabled)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }
}
