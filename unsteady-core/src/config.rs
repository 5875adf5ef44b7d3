use std::collections::BTreeMap;

use thiserror::Error;

/// A single entry in a [`SolverConfig`] tree.
///
/// External solver packages expose their tuning knobs as a nested database of
/// typed parameters; this enum mirrors that shape so configurations can be
/// carried across solver rebuilds without talking to the backend.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    Group(SolverConfig),
}

impl ConfigValue {
    /// A short name for the value's type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Str(_) => "string",
            Self::Group(_) => "group",
        }
    }
}

/// Errors raised by configuration access and propagation.
///
/// An unknown key or a type conflict means the caller is addressing a
/// parameter the solver does not have, which is a genuine misconfiguration
/// and always fatal. Recursing into a nested group during propagation is an
/// expected structural case and never produces an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown configuration key {key:?}")]
    UnknownKey { key: String },

    #[error("configuration key {key:?} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// A nested, string-keyed solver parameter tree.
///
/// The set of keys is fixed by whoever builds the tree (normally the
/// backend's default configuration): [`set`] refuses unknown keys and type
/// changes, while [`insert`] is the unchecked operation used to build
/// defaults in the first place.
///
/// [`set`]: SolverConfig::set
/// [`insert`]: SolverConfig::insert
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    entries: BTreeMap<String, ConfigValue>,
}

impl SolverConfig {
    /// Creates an empty configuration tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry without validation.
    ///
    /// This is the building block for default configuration trees; user code
    /// tuning an existing tree should go through [`set`](SolverConfig::set).
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigValue) -> &mut Self {
        self.entries.insert(key.into(), value);
        self
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.entries.get(key)
    }

    /// Overwrites an existing entry with a value of the same type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] if the key does not exist and
    /// [`ConfigError::TypeMismatch`] if the new value has a different type
    /// than the current one.
    pub fn set(&mut self, key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        match self.entries.get_mut(key) {
            None => Err(ConfigError::UnknownKey { key: key.to_owned() }),
            Some(current) if current.type_name() == value.type_name() => {
                *current = value;
                Ok(())
            }
            Some(current) => Err(ConfigError::TypeMismatch {
                key: key.to_owned(),
                expected: current.type_name(),
                found: value.type_name(),
            }),
        }
    }

    /// Borrows a nested configuration group.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] if the key does not exist and
    /// [`ConfigError::TypeMismatch`] if it holds a scalar.
    pub fn group(&self, key: &str) -> Result<&SolverConfig, ConfigError> {
        match self.entries.get(key) {
            None => Err(ConfigError::UnknownKey { key: key.to_owned() }),
            Some(ConfigValue::Group(group)) => Ok(group),
            Some(other) => Err(ConfigError::TypeMismatch {
                key: key.to_owned(),
                expected: "group",
                found: other.type_name(),
            }),
        }
    }

    /// Mutably borrows a nested configuration group.
    ///
    /// # Errors
    ///
    /// Same conditions as [`group`](SolverConfig::group).
    pub fn group_mut(&mut self, key: &str) -> Result<&mut SolverConfig, ConfigError> {
        match self.entries.get_mut(key) {
            None => Err(ConfigError::UnknownKey { key: key.to_owned() }),
            Some(ConfigValue::Group(group)) => Ok(group),
            Some(other) => Err(ConfigError::TypeMismatch {
                key: key.to_owned(),
                expected: "group",
                found: other.type_name(),
            }),
        }
    }

    /// Copies every entry of `source` into this tree, recursing structurally
    /// into nested groups.
    ///
    /// Scalar slots are copied type-checked; where both sides hold a group,
    /// the walk descends instead of assigning. A key that is missing here, or
    /// a scalar/group shape conflict, means the two trees do not describe the
    /// same solver and is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownKey`] or [`ConfigError::TypeMismatch`]
    /// as described above; on error, entries already visited remain copied.
    pub fn propagate_from(&mut self, source: &SolverConfig) -> Result<(), ConfigError> {
        for (key, value) in &source.entries {
            match (self.entries.get_mut(key), value) {
                (None, _) => {
                    return Err(ConfigError::UnknownKey { key: key.clone() });
                }
                (Some(ConfigValue::Group(target)), ConfigValue::Group(nested)) => {
                    target.propagate_from(nested)?;
                }
                (Some(target), value) if target.type_name() == value.type_name() => {
                    *target = value.clone();
                }
                (Some(target), value) => {
                    return Err(ConfigError::TypeMismatch {
                        key: key.clone(),
                        expected: target.type_name(),
                        found: value.type_name(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Iterates over the entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries at this level of the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this level of the tree has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn newton_defaults() -> SolverConfig {
        let mut newton = SolverConfig::new();
        newton
            .insert("maximum_iterations", ConfigValue::Int(50))
            .insert("relative_tolerance", ConfigValue::Real(1e-9))
            .insert("report", ConfigValue::Bool(true));

        let mut config = SolverConfig::new();
        config
            .insert("nonlinear_solver", ConfigValue::Str("newton".into()))
            .insert("newton_solver", ConfigValue::Group(newton));
        config
    }

    #[test]
    fn set_replaces_existing_entries() {
        let mut config = newton_defaults();
        config
            .set("nonlinear_solver", ConfigValue::Str("snes".into()))
            .unwrap();
        assert_eq!(
            config.get("nonlinear_solver"),
            Some(&ConfigValue::Str("snes".into()))
        );
    }

    #[test]
    fn set_rejects_unknown_keys() {
        let mut config = newton_defaults();
        let result = config.set("linear_solver", ConfigValue::Str("lu".into()));
        assert_eq!(
            result,
            Err(ConfigError::UnknownKey {
                key: "linear_solver".into()
            })
        );
    }

    #[test]
    fn set_rejects_type_changes() {
        let mut config = newton_defaults();
        let result = config.set("nonlinear_solver", ConfigValue::Int(3));
        assert!(matches!(result, Err(ConfigError::TypeMismatch { .. })));
    }

    #[test]
    fn group_accessors_distinguish_scalars() {
        let mut config = newton_defaults();
        assert!(config.group("newton_solver").is_ok());
        assert!(matches!(
            config.group_mut("nonlinear_solver"),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            config.group("missing"),
            Err(ConfigError::UnknownKey { .. })
        ));
    }

    #[test]
    fn propagation_copies_scalars_and_recurses_into_groups() {
        let mut source = newton_defaults();
        source
            .group_mut("newton_solver")
            .unwrap()
            .set("maximum_iterations", ConfigValue::Int(12))
            .unwrap();

        let mut target = newton_defaults();
        target.propagate_from(&source).unwrap();

        assert_eq!(
            target
                .group("newton_solver")
                .unwrap()
                .get("maximum_iterations"),
            Some(&ConfigValue::Int(12))
        );
        assert_eq!(target, source);
    }

    #[test]
    fn propagation_is_idempotent() {
        let source = newton_defaults();
        let mut target = newton_defaults();

        target.propagate_from(&source).unwrap();
        let after_first = target.clone();
        target.propagate_from(&source).unwrap();

        assert_eq!(target, after_first);
    }

    #[test]
    fn propagation_fails_on_missing_destination_key() {
        let source = newton_defaults();
        let mut target = SolverConfig::new();
        target.insert("nonlinear_solver", ConfigValue::Str("newton".into()));

        assert!(matches!(
            target.propagate_from(&source),
            Err(ConfigError::UnknownKey { .. })
        ));
    }

    #[test]
    fn propagation_fails_on_shape_conflict() {
        let source = newton_defaults();
        let mut target = newton_defaults();
        target
            .insert("newton_solver", ConfigValue::Str("not a group".into()));

        assert!(matches!(
            target.propagate_from(&source),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }
}
