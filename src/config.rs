//! Service configuration
//!
//! Everything tunable at boot: bind address, CORS origins, token
//! verification settings, the allocation delete policy, the lock retry
//! budget and the seed for the school directory. Every field has a default
//! so an empty config file yields a working development instance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::{DeletePolicy, LedgerSettings};
use crate::scope::TokenConfig;

/// Ledger service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Host to bind to (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind to (default: 8750)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means permissive (development)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Bearer token verification settings
    #[serde(default)]
    pub token: TokenConfig,

    /// What to do when deleting an allocation that has usage records
    #[serde(default)]
    pub delete_policy: DeletePolicy,

    /// Retry budget for acquiring an allocation's write lock
    #[serde(default = "default_lock_attempts")]
    pub lock_attempts: u32,

    /// Registry seed: district id to its school ids
    #[serde(default)]
    pub districts: HashMap<Uuid, Vec<Uuid>>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8750
}

fn default_lock_attempts() -> u32 {
    65536
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            token: TokenConfig::default(),
            delete_policy: DeletePolicy::default(),
            lock_attempts: default_lock_attempts(),
            districts: HashMap::new(),
        }
    }
}

impl ServiceConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The ledger tunables carried by this config.
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings {
            delete_policy: self.delete_policy,
            lock_attempts: self.lock_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8750);
        assert_eq!(config.delete_policy, DeletePolicy::Block);
        assert!(config.districts.is_empty());
    }

    #[test]
    fn test_empty_json_yields_defaults() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.socket_addr(), "0.0.0.0:8750");
        assert_eq!(config.lock_attempts, 65536);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"port": 9000, "delete_policy": "auto_close"}"#,
        )
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.delete_policy, DeletePolicy::AutoClose);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_districts_seed_parses() {
        let district = Uuid::new_v4();
        let school = Uuid::new_v4();
        let raw = format!(r#"{{"districts": {{"{}": ["{}"]}}}}"#, district, school);

        let config: ServiceConfig = serde_json::from_str(&raw).unwrap();
        assert_eq!(config.districts[&district], vec![school]);
    }
}
