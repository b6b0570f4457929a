//! Strategy registry: catalog of strategy types keyed by identifier and label.
//!
//! Populated by explicit registration calls (`register_builtin_strategies`
//! for the shipped set) and read-only afterwards. The process-wide instance
//! behind [`StrategyRegistry::global`] is built once on first use.
//!
//! Name resolution checks display labels first, then identifiers.

use crate::schema::{ParamMap, ParameterDefinition, ParameterSchema};
use crate::strategy::{
    BollingerBandsStrategy, EmaRsiStrategy, RsiThresholdStrategy, SmaCrossoverStrategy, Strategy,
    StrategyDefinition, StrategyError,
};
use serde::Serialize;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid strategy '{name}': {reason}")]
    InvalidStrategy { name: String, reason: String },

    #[error("strategy '{name}' is already registered by a different type ({existing})")]
    DuplicateStrategy { name: String, existing: String },

    #[error("strategy '{name}' not found (available: {available})")]
    StrategyNotFound { name: String, available: String },

    #[error(transparent)]
    Strategy(#[from] StrategyError),
}

type BuildFn = fn(&ParamMap) -> Result<Box<dyn Strategy>, StrategyError>;

fn build_boxed<S: StrategyDefinition>(params: &ParamMap) -> Result<Box<dyn Strategy>, StrategyError> {
    Ok(Box::new(S::from_params(params)?))
}

/// Everything the registry knows about one strategy type.
#[derive(Clone)]
pub struct StrategyEntry {
    pub identifier: String,
    pub label: String,
    pub short_label: String,
    type_id: TypeId,
    type_name: &'static str,
    schema: fn() -> ParameterSchema,
    build: BuildFn,
    presets: fn() -> Vec<ParamMap>,
}

impl StrategyEntry {
    pub fn of<S: StrategyDefinition>() -> Self {
        Self {
            identifier: S::IDENTIFIER.to_string(),
            label: S::LABEL.to_string(),
            short_label: S::SHORT_LABEL.to_string(),
            type_id: TypeId::of::<S>(),
            type_name: std::any::type_name::<S>(),
            schema: S::schema,
            build: build_boxed::<S>,
            presets: S::predefined_configurations,
        }
    }

    pub fn schema(&self) -> ParameterSchema {
        (self.schema)()
    }

    pub fn build(&self, overrides: &ParamMap) -> Result<Box<dyn Strategy>, StrategyError> {
        (self.build)(overrides)
    }

    /// Declared presets that survive full construction.
    pub fn predefined_configurations(&self) -> Vec<ParamMap> {
        (self.presets)()
            .into_iter()
            .filter(|p| match self.build(p) {
                Ok(_) => true,
                Err(e) => {
                    debug!(strategy = %self.identifier, params = ?p, error = %e, "Dropping invalid preset");
                    false
                }
            })
            .collect()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for StrategyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyEntry")
            .field("identifier", &self.identifier)
            .field("label", &self.label)
            .field("short_label", &self.short_label)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Summary row for listings.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyInfo {
    pub label: String,
    pub short_label: String,
    pub identifier: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

#[derive(Debug, Default)]
pub struct StrategyRegistry {
    entries: BTreeMap<String, StrategyEntry>,
}

impl StrategyRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the shipped strategies.
    pub fn with_builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_builtin_strategies()?;
        Ok(registry)
    }

    /// Process-wide registry, populated with the shipped strategies on first use.
    pub fn global() -> &'static StrategyRegistry {
        static GLOBAL: OnceLock<StrategyRegistry> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            let mut registry = StrategyRegistry::new();
            if let Err(e) = registry.register_builtin_strategies() {
                error!(error = %e, "Built-in strategy registration failed");
            }
            registry
        })
    }

    pub fn register_builtin_strategies(&mut self) -> Result<(), RegistryError> {
        self.register_strategy::<SmaCrossoverStrategy>()?;
        self.register_strategy::<RsiThresholdStrategy>()?;
        self.register_strategy::<BollingerBandsStrategy>()?;
        self.register_strategy::<EmaRsiStrategy>()?;
        Ok(())
    }

    pub fn register_strategy<S: StrategyDefinition>(&mut self) -> Result<(), RegistryError> {
        self.register(StrategyEntry::of::<S>())
    }

    /// Add an entry.
    ///
    /// Re-registering the same type is a no-op. A different type claiming
    /// an existing identifier or label is rejected.
    pub fn register(&mut self, entry: StrategyEntry) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidStrategy {
            name: entry.identifier.clone(),
            reason,
        };
        if entry.identifier.trim().is_empty() {
            return Err(invalid("identifier is empty".into()));
        }
        if entry.label.trim().is_empty() {
            return Err(invalid("label is empty".into()));
        }
        entry.schema().check_defaults().map_err(invalid)?;
        entry
            .build(&ParamMap::new())
            .map_err(|e| invalid(format!("cannot be constructed from its defaults: {e}")))?;

        for existing in self.entries.values() {
            let clashes =
                existing.identifier == entry.identifier || existing.label == entry.label;
            if !clashes {
                continue;
            }
            if existing.type_id == entry.type_id {
                return Ok(());
            }
            let name = if existing.identifier == entry.identifier {
                entry.identifier.clone()
            } else {
                entry.label.clone()
            };
            return Err(RegistryError::DuplicateStrategy {
                name,
                existing: existing.type_name.to_string(),
            });
        }

        debug!(identifier = %entry.identifier, label = %entry.label, "Registered strategy");
        self.entries.insert(entry.identifier.clone(), entry);
        Ok(())
    }

    /// Look up by display label, then by identifier.
    pub fn entry(&self, name: &str) -> Option<&StrategyEntry> {
        self.entries
            .values()
            .find(|e| e.label == name)
            .or_else(|| self.entries.get(name))
    }

    pub fn resolve(&self, name: &str) -> Result<&StrategyEntry, RegistryError> {
        self.entry(name)
            .ok_or_else(|| RegistryError::StrategyNotFound {
                name: name.to_string(),
                available: self.list_names().join(", "),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    /// Construct a strategy from overrides on its defaults.
    pub fn create(
        &self,
        name: &str,
        overrides: &ParamMap,
    ) -> Result<Box<dyn Strategy>, RegistryError> {
        let entry = self.resolve(name)?;
        Ok(entry.build(overrides)?)
    }

    /// Declared schema, or one inferred from a default instance when the
    /// strategy declares none.
    pub fn parameter_info(&self, name: &str) -> Result<ParameterSchema, RegistryError> {
        let entry = self.resolve(name)?;
        let schema = entry.schema();
        if !schema.is_empty() {
            return Ok(schema);
        }
        let instance = entry.build(&ParamMap::new())?;
        Ok(instance
            .parameters()
            .iter()
            .fold(ParameterSchema::new(), |schema, (key, value)| {
                schema.with(
                    key,
                    ParameterDefinition {
                        kind: value.kind(),
                        default: value.clone(),
                        range: None,
                        description: "inferred from defaults".to_string(),
                    },
                )
            }))
    }

    pub fn predefined_configurations(&self, name: &str) -> Result<Vec<ParamMap>, RegistryError> {
        Ok(self.resolve(name)?.predefined_configurations())
    }

    /// Display labels, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.values().map(|e| e.label.clone()).collect();
        names.sort();
        names
    }

    /// Stable identifiers, sorted.
    pub fn list_identifiers(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// One row per strategy, sorted by label.
    pub fn all_strategies_info(&self) -> Vec<StrategyInfo> {
        let mut rows: Vec<StrategyInfo> = self
            .entries
            .values()
            .filter_map(|e| {
                let schema = self.parameter_info(&e.identifier).ok()?;
                let description = e
                    .build(&ParamMap::new())
                    .map(|s| s.describe())
                    .unwrap_or_default();
                Some(StrategyInfo {
                    label: e.label.clone(),
                    short_label: e.short_label.clone(),
                    identifier: e.identifier.clone(),
                    description,
                    parameters: schema,
                })
            })
            .collect();
        rows.sort_by(|a, b| a.label.cmp(&b.label));
        rows
    }

    /// Remove every entry. Intended for test isolation.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{params, ParamValue};

    fn builtin() -> StrategyRegistry {
        StrategyRegistry::with_builtin().unwrap()
    }

    #[test]
    fn builtin_labels_sorted() {
        assert_eq!(
            builtin().list_names(),
            vec![
                "Bollinger Bands",
                "EMA + RSI Strategy",
                "Relative Strength Index",
                "Simple Moving Average",
            ]
        );
    }

    #[test]
    fn create_by_label_or_identifier() {
        let r = builtin();
        let a = r.create("Simple Moving Average", &ParamMap::new()).unwrap();
        let b = r.create("sma_crossover", &ParamMap::new()).unwrap();
        assert_eq!(a.parameters(), b.parameters());
        assert_eq!(a.identifier(), "sma_crossover");
    }

    #[test]
    fn unknown_name_lists_available() {
        let err = builtin().create("MACD", &ParamMap::new()).unwrap_err();
        assert!(matches!(err, RegistryError::StrategyNotFound { .. }));
        assert!(err.to_string().contains("Bollinger Bands"));
    }

    #[test]
    fn construction_errors_pass_through() {
        let err = builtin()
            .create("RSI", &params([("period", 1i64)]))
            .unwrap_err();
        // "RSI" is a short label, not a label or identifier
        assert!(matches!(err, RegistryError::StrategyNotFound { .. }));

        let err = builtin()
            .create("rsi_threshold", &params([("period", 1i64)]))
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Strategy(StrategyError::ParameterValidation(_))
        ));
    }

    #[test]
    fn reregistering_same_type_is_noop() {
        let mut r = builtin();
        r.register_strategy::<SmaCrossoverStrategy>().unwrap();
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn parameter_info_uses_declared_schema() {
        let info = builtin().parameter_info("Bollinger Bands").unwrap();
        let period = info.get("period").unwrap();
        assert_eq!(period.default, ParamValue::Int(20));
        assert_eq!(period.range, Some((5.0, 50.0)));
    }

    #[test]
    fn presets_are_filtered() {
        let presets = builtin().predefined_configurations("ema_rsi").unwrap();
        assert_eq!(presets.len(), 58);
    }

    #[test]
    fn clear_empties_registry() {
        let mut r = builtin();
        assert!(r.contains("bollinger_bands"));
        r.clear();
        assert!(r.is_empty());
        assert!(!r.contains("bollinger_bands"));
    }

    #[test]
    fn global_is_populated() {
        let r = StrategyRegistry::global();
        assert_eq!(r.list_identifiers().len(), 4);
        assert_eq!(r.all_strategies_info().len(), 4);
    }
}
