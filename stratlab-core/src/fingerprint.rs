//! Configuration fingerprinting: deterministic identity of a strategy setup.
//!
//! - `StrategyConfig`: stable identifier + effective parameters.
//! - `ConfigHash`: BLAKE3 of the canonical JSON form, hex-encoded.

use crate::schema::ParamMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// BLAKE3 hex digest of a canonical serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigHash(pub String);

impl ConfigHash {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }

    /// Hash any serializable value through its JSON form.
    ///
    /// Callers must use ordered maps so the JSON is canonical.
    pub fn of_json<T: Serialize>(value: &T) -> Self {
        let json = serde_json::to_string(value).unwrap_or_default();
        Self::from_bytes(json.as_bytes())
    }

    /// First 12 hex characters, for display.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A strategy's identity plus its validated, effective parameters.
///
/// Produced by a constructed strategy; changes only through an explicit
/// parameter update that revalidates first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub identifier: String,
    pub parameters: ParamMap,
}

impl StrategyConfig {
    pub fn new(identifier: impl Into<String>, parameters: ParamMap) -> Self {
        Self {
            identifier: identifier.into(),
            parameters,
        }
    }

    /// Exact hash: identifier + every parameter value.
    ///
    /// `ParamMap` is a `BTreeMap`, so the JSON key order is deterministic.
    pub fn config_hash(&self) -> ConfigHash {
        ConfigHash::of_json(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{params, ParamValue};

    #[test]
    fn config_hash_is_deterministic() {
        let a = StrategyConfig::new("sma_crossover", params([("short_window", 10i64), ("long_window", 30)]));
        let b = StrategyConfig::new("sma_crossover", params([("long_window", 30i64), ("short_window", 10)]));
        assert_eq!(a.config_hash(), b.config_hash());
        assert_eq!(a.config_hash().0.len(), 64);
    }

    #[test]
    fn config_hash_changes_with_params() {
        let a = StrategyConfig::new("x", params([("p", 10i64)]));
        let mut b = a.clone();
        b.parameters.insert("p".into(), ParamValue::Int(11));
        assert_ne!(a.config_hash(), b.config_hash());
        assert_eq!(a.config_hash().short().len(), 12);
    }
}
