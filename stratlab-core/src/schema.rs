//! Parameter schema: declarative description of a strategy's tunables.
//!
//! A strategy declares a `ParameterSchema`; user overrides are resolved
//! against it (unknown keys rejected, types checked, ranges enforced
//! inclusively) and merged onto the declared defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Effective parameter mapping. `BTreeMap` keeps key order stable for
/// display and hashing.
pub type ParamMap = BTreeMap<String, ParamValue>;

/// Declared type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Integer,
    Float,
    Text,
}

impl ParamType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamType::Integer | ParamType::Float)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Text => "text",
        };
        f.write_str(s)
    }
}

/// A concrete parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    pub fn kind(&self) -> ParamType {
        match self {
            ParamValue::Int(_) => ParamType::Integer,
            ParamValue::Float(_) => ParamType::Float,
            ParamValue::Text(_) => ParamType::Text,
        }
    }

    /// Numeric view; `Int` widens to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integer view.
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Parse a command-line style value: integer, then float, then text.
    pub fn parse(raw: &str) -> ParamValue {
        let raw = raw.trim();
        if let Ok(v) = raw.parse::<i64>() {
            ParamValue::Int(v)
        } else if let Ok(v) = raw.parse::<f64>() {
            ParamValue::Float(v)
        } else {
            ParamValue::Text(raw.to_string())
        }
    }

    /// Whether this value may be stored under a parameter declared as `kind`.
    fn fits(&self, kind: ParamType) -> bool {
        matches!(
            (self, kind),
            (ParamValue::Int(_), ParamType::Integer)
                | (ParamValue::Int(_), ParamType::Float)
                | (ParamValue::Float(_), ParamType::Float)
                | (ParamValue::Text(_), ParamType::Text)
        )
    }

    /// Store an `Int` declared as `Float` as a float, so the effective map
    /// always carries the declared kind.
    fn coerce(self, kind: ParamType) -> ParamValue {
        match (self, kind) {
            (ParamValue::Int(v), ParamType::Float) => ParamValue::Float(v as f64),
            (v, _) => v,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v:?}"),
            ParamValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Declaration of a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub kind: ParamType,
    pub default: ParamValue,
    /// Inclusive numeric bounds.
    pub range: Option<(f64, f64)>,
    pub description: String,
}

impl ParameterDefinition {
    pub fn integer(default: i64, min: i64, max: i64, description: &str) -> Self {
        Self {
            kind: ParamType::Integer,
            default: ParamValue::Int(default),
            range: Some((min as f64, max as f64)),
            description: description.to_string(),
        }
    }

    pub fn float(default: f64, min: f64, max: f64, description: &str) -> Self {
        Self {
            kind: ParamType::Float,
            default: ParamValue::Float(default),
            range: Some((min, max)),
            description: description.to_string(),
        }
    }

    pub fn text(default: &str, description: &str) -> Self {
        Self {
            kind: ParamType::Text,
            default: ParamValue::Text(default.to_string()),
            range: None,
            description: description.to_string(),
        }
    }

    /// Check a candidate value: type first, then inclusive range.
    pub fn check(&self, name: &str, value: &ParamValue) -> Result<(), String> {
        if !value.fits(self.kind) {
            return Err(format!(
                "Parameter '{name}' must be of type {}, got {} ({value})",
                self.kind,
                value.kind()
            ));
        }
        if let (Some((min, max)), Some(v)) = (self.range, value.as_f64()) {
            if !v.is_finite() || v < min || v > max {
                return Err(format!(
                    "Parameter '{name}' must be between {min} and {max}, got {value}"
                ));
            }
        }
        Ok(())
    }
}

/// Named parameter declarations for one strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    definitions: BTreeMap<String, ParameterDefinition>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, definition: ParameterDefinition) -> Self {
        self.definitions.insert(name.to_string(), definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.definitions.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterDefinition)> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn defaults(&self) -> ParamMap {
        self.definitions
            .iter()
            .map(|(k, d)| (k.clone(), d.default.clone()))
            .collect()
    }

    /// Every default must satisfy its own declaration.
    pub fn check_defaults(&self) -> Result<(), String> {
        for (name, def) in &self.definitions {
            def.check(name, &def.default)
                .map_err(|e| format!("invalid default: {e}"))?;
        }
        Ok(())
    }

    /// Resolve overrides into the effective parameter map.
    ///
    /// Errors name the offending parameter and value.
    pub fn resolve(&self, overrides: &ParamMap) -> Result<ParamMap, String> {
        let mut effective = self.defaults();
        for (name, value) in overrides {
            let def = self.definitions.get(name).ok_or_else(|| {
                let known: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
                format!(
                    "Unknown parameter '{name}' (expected one of: {})",
                    known.join(", ")
                )
            })?;
            def.check(name, value)?;
            effective.insert(name.clone(), value.clone().coerce(def.kind));
        }
        Ok(effective)
    }
}

/// Build a `ParamMap` from literal pairs.
pub fn params<I, K, V>(pairs: I) -> ParamMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .with("window", ParameterDefinition::integer(20, 5, 100, "window"))
            .with("width", ParameterDefinition::float(2.0, 1.0, 3.0, "width"))
            .with("mode", ParameterDefinition::text("close", "price column"))
    }

    #[test]
    fn resolve_merges_onto_defaults() {
        let eff = schema().resolve(&params([("window", 30i64)])).unwrap();
        assert_eq!(eff["window"], ParamValue::Int(30));
        assert_eq!(eff["width"], ParamValue::Float(2.0));
        assert_eq!(eff["mode"], ParamValue::Text("close".into()));
    }

    #[test]
    fn int_widens_to_float() {
        let eff = schema().resolve(&params([("width", 3i64)])).unwrap();
        assert_eq!(eff["width"], ParamValue::Float(3.0));
    }

    #[test]
    fn float_for_integer_is_rejected() {
        let err = schema().resolve(&params([("window", 20.5)])).unwrap_err();
        assert!(err.contains("window"));
        assert!(err.contains("integer"));
    }

    #[test]
    fn range_is_inclusive() {
        let s = schema();
        assert!(s.resolve(&params([("window", 5i64)])).is_ok());
        assert!(s.resolve(&params([("window", 100i64)])).is_ok());
        let err = s.resolve(&params([("window", 101i64)])).unwrap_err();
        assert!(err.contains("between 5 and 100"), "{err}");
    }

    #[test]
    fn unknown_key_is_rejected() {
        let err = schema().resolve(&params([("lenght", 10i64)])).unwrap_err();
        assert!(err.contains("Unknown parameter 'lenght'"));
    }

    #[test]
    fn nan_is_out_of_range() {
        assert!(schema().resolve(&params([("width", f64::NAN)])).is_err());
    }

    #[test]
    fn check_defaults_catches_bad_default() {
        assert!(schema().check_defaults().is_ok());
        let bad = ParameterSchema::new().with("p", ParameterDefinition::integer(1, 5, 10, "p"));
        assert!(bad.check_defaults().is_err());
    }

    #[test]
    fn parse_and_untagged_serde() {
        assert_eq!(ParamValue::parse("14"), ParamValue::Int(14));
        assert_eq!(ParamValue::parse("2.5"), ParamValue::Float(2.5));
        assert_eq!(ParamValue::parse("close"), ParamValue::Text("close".into()));

        let json = serde_json::to_string(&params([("a", 14i64)])).unwrap();
        assert_eq!(json, r#"{"a":14}"#);
        let back: ParamMap = serde_json::from_str(r#"{"a":14,"b":2.0,"c":"x"}"#).unwrap();
        assert_eq!(back["a"], ParamValue::Int(14));
        assert_eq!(back["b"], ParamValue::Float(2.0));
        assert_eq!(back["c"], ParamValue::Text("x".into()));
    }

    #[test]
    fn display_keeps_float_point() {
        assert_eq!(ParamValue::Float(30.0).to_string(), "30.0");
        assert_eq!(ParamValue::Int(30).to_string(), "30");
    }
}
