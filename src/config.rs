use std::net::SocketAddr;

use crate::compiler::SandboxLimits;

/// API key value that switches the generation client to offline mode.
pub const DEMO_KEY: &str = "DEMO_KEY";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub port: u16,
    pub limits: SandboxLimits,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: DEMO_KEY.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            port: 8080,
            limits: SandboxLimits::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or unparsable values
    /// fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_key: non_empty("GEMINI_API_KEY").unwrap_or(defaults.api_key),
            api_base: non_empty("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            model: non_empty("GEMINI_MODEL").unwrap_or(defaults.model),
            port: non_empty("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            limits: SandboxLimits {
                step_budget: non_empty("SANDBOX_STEP_BUDGET")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.limits.step_budget),
                memory_limit: non_empty("SANDBOX_MEMORY_MB")
                    .and_then(|v| v.parse::<usize>().ok())
                    .filter(|mb| *mb > 0)
                    .map(|mb| mb * 1024 * 1024)
                    .unwrap_or(defaults.limits.memory_limit),
                ..defaults.limits
            },
        }
    }

    pub fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_run_in_demo_mode() {
        let cfg = config(&[]);
        assert!(cfg.is_demo());
        assert_eq!(cfg.model, "gemini-3-flash-preview");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.limits.step_budget, 2_000_000);
        assert_eq!(cfg.limits.memory_limit, 64 * 1024 * 1024);
    }

    #[test]
    fn overrides_are_read_and_bad_numbers_ignored() {
        let cfg = config(&[
            ("GEMINI_API_KEY", "abc"),
            ("GEMINI_API_BASE", "http://localhost:9000/v1/"),
            ("PORT", "not-a-port"),
            ("SANDBOX_STEP_BUDGET", "5000"),
            ("SANDBOX_MEMORY_MB", "16"),
        ]);
        assert!(!cfg.is_demo());
        assert_eq!(cfg.api_base, "http://localhost:9000/v1");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.limits.step_budget, 5000);
        assert_eq!(cfg.limits.memory_limit, 16 * 1024 * 1024);
        assert_eq!(cfg.addr().port(), 8080);
    }
}
