use keel_ident::{DEFAULT_ALIAS_TO_OID_KEY, DEFAULT_COUNTERS_KEY, DEFAULT_OID_TO_ALIAS_KEY};
use serde::{Deserialize, Serialize};

use crate::error::{KeelError, KeelResult};

/// Configuration of a [`Keel`](crate::Keel) facade.
///
/// Every facade sharing a store must agree on the three bookkeeping keys,
/// otherwise they allocate from different counters and see different alias
/// indexes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeelConfig {
    /// Hash holding one sequence counter per namespace.
    pub counters_key: String,
    /// Hash mapping alias → OID text.
    pub alias_to_oid_key: String,
    /// Hash mapping OID text → alias.
    pub oid_to_alias_key: String,
    /// Entries fetched per `HSCAN` round trip during scans.
    pub scan_page_size: usize,
    /// Server used by `Keel::connect` (with the `redis` feature).
    pub redis_url: String,
}

impl Default for KeelConfig {
    fn default() -> Self {
        Self {
            counters_key: DEFAULT_COUNTERS_KEY.into(),
            alias_to_oid_key: DEFAULT_ALIAS_TO_OID_KEY.into(),
            oid_to_alias_key: DEFAULT_OID_TO_ALIAS_KEY.into(),
            scan_page_size: 100,
            redis_url: "redis://127.0.0.1/".into(),
        }
    }
}

impl KeelConfig {
    /// Parse a TOML document and validate it. Missing keys take their
    /// default values.
    pub fn from_toml_str(text: &str) -> KeelResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| KeelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations under which bookkeeping hashes would collide or
    /// scans could not make progress.
    pub fn validate(&self) -> KeelResult<()> {
        let keys = [
            ("counters_key", &self.counters_key),
            ("alias_to_oid_key", &self.alias_to_oid_key),
            ("oid_to_alias_key", &self.oid_to_alias_key),
        ];
        for (name, key) in keys {
            if key.is_empty() {
                return Err(KeelError::Config(format!("{name} is empty")));
            }
        }
        for (i, (name_a, a)) in keys.iter().enumerate() {
            for (name_b, b) in &keys[i + 1..] {
                if a == b {
                    return Err(KeelError::Config(format!(
                        "{name_a} and {name_b} both use {a:?}"
                    )));
                }
            }
        }
        if self.scan_page_size == 0 {
            return Err(KeelError::Config("scan_page_size must be at least 1".into()));
        }
        Ok(())
    }
}
