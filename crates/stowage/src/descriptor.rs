// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Static metadata describing how to build each kind of registry object.
//!
//! Descriptors are loaded once, from a JSON mapping keyed by
//! `"<symbol>_<key>"`:
//!
//! ```json
//! {"gld_dummyparams": {"params": 1, "construct": ["dummy", "create_object"], "version": 1}}
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::{ConfigError, RegistryError};

/// The type (and optional factory method) a descriptor constructs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConstructSpec {
    type_name: String,
    factory: Option<String>,
}

impl ConstructSpec {
    /// Constructs `type_name` through its default constructor.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            factory: None,
        }
    }

    /// Constructs `type_name` through the named factory method.
    pub fn with_factory(type_name: impl Into<String>, factory: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            factory: Some(factory.into()),
        }
    }

    /// The registered type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The factory method, if any.
    #[must_use]
    pub fn factory(&self) -> Option<&str> {
        self.factory.as_deref()
    }
}

/// How to build one kind of registry object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    id: String,
    symbol_len: usize,
    param_count: usize,
    construct: ConstructSpec,
    version: u32,
}

impl ObjectDescriptor {
    /// Creates a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if `symbol` is empty or contains `_`, if `key` is
    /// empty, or if `version` is 0.
    pub fn new(symbol: &str, key: &str, param_count: usize, construct: ConstructSpec, version: u32) -> Result<Self, ConfigError> {
        let symbol = symbol.to_ascii_lowercase();
        let id = format!("{symbol}_{key}");
        if symbol.is_empty() || symbol.contains('_') || key.is_empty() {
            return Err(ConfigError::InvalidId { id });
        }
        if version == 0 {
            return Err(ConfigError::InvalidVersion { id });
        }

        Ok(Self {
            symbol_len: symbol.len(),
            id,
            param_count,
            construct,
            version,
        })
    }

    /// The lowercase namespace prefix.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.id[..self.symbol_len]
    }

    /// The key within the symbol's namespace.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.id[self.symbol_len + 1..]
    }

    /// The configuration id, `"{symbol}_{key}"`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of parameters a resolution must supply.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// What to construct.
    #[must_use]
    pub fn construct(&self) -> &ConstructSpec {
        &self.construct
    }

    /// Configured schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    pub(crate) fn check_arity(&self, supplied: usize) -> Result<(), RegistryError> {
        if supplied == self.param_count {
            Ok(())
        } else {
            Err(RegistryError::ArityMismatch {
                id: self.id.clone(),
                expected: self.param_count,
                supplied,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    params: usize,
    construct: Vec<String>,
    version: u32,
}

/// Every descriptor known to a process, keyed by `(symbol, key)`.
///
/// # Examples
///
/// ```
/// use stowage::DescriptorTable;
///
/// let table = DescriptorTable::from_json(
///     r#"{"gld_dummyparams": {"params": 1, "construct": ["dummy", "create_object"], "version": 1}}"#,
/// )?;
///
/// let descriptor = table.lookup("gld", "dummyparams")?;
/// assert_eq!(descriptor.param_count(), 1);
/// assert_eq!(descriptor.construct().factory(), Some("create_object"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct DescriptorTable {
    descriptors: HashMap<String, ObjectDescriptor>,
}

impl DescriptorTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the JSON configuration format.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or any entry is invalid.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_raw(serde_json::from_str(json)?)
    }

    /// Builds a table from an already parsed configuration map.
    ///
    /// # Errors
    ///
    /// Returns an error if the map does not have the expected shape or any
    /// entry is invalid.
    pub fn from_config(config: serde_json::Map<String, serde_json::Value>) -> Result<Self, ConfigError> {
        Self::from_raw(serde_json::from_value(serde_json::Value::Object(config))?)
    }

    fn from_raw(raw: BTreeMap<String, RawDescriptor>) -> Result<Self, ConfigError> {
        raw.into_iter()
            .map(|(id, raw)| Self::parse_entry(&id, raw))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_descriptors)
    }

    /// Builds a table from descriptors; later duplicates replace earlier ones.
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ObjectDescriptor>) -> Self {
        let mut table = Self::new();
        for descriptor in descriptors {
            table.insert(descriptor);
        }
        table
    }

    /// Adds or replaces a descriptor.
    pub fn insert(&mut self, descriptor: ObjectDescriptor) {
        self.descriptors.insert(descriptor.id.clone(), descriptor);
    }

    /// Finds the descriptor for `symbol` and `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DescriptorNotFound`] if none is registered.
    pub fn lookup(&self, symbol: &str, key: &str) -> Result<&ObjectDescriptor, RegistryError> {
        let id = format!("{}_{key}", symbol.to_ascii_lowercase());
        self.descriptors.get(&id).ok_or_else(|| RegistryError::DescriptorNotFound {
            symbol: symbol.to_owned(),
            key: key.to_owned(),
        })
    }

    /// Number of descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if the table holds no descriptors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Iterates over all descriptors in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectDescriptor> {
        self.descriptors.values()
    }

    fn parse_entry(id: &str, raw: RawDescriptor) -> Result<ObjectDescriptor, ConfigError> {
        let Some((symbol, key)) = id.split_once('_') else {
            return Err(ConfigError::InvalidId { id: id.to_owned() });
        };

        let construct = match raw.construct.as_slice() {
            [type_name] if !type_name.is_empty() => ConstructSpec::new(type_name.as_str()),
            [type_name, factory] if !type_name.is_empty() && !factory.is_empty() => {
                ConstructSpec::with_factory(type_name.as_str(), factory.as_str())
            }
            _ => return Err(ConfigError::InvalidConstruct { id: id.to_owned() }),
        };

        ObjectDescriptor::new(symbol, key, raw.params, construct, raw.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_splits_id_at_first_separator() {
        let table = DescriptorTable::from_json(r#"{"app_user_list": {"params": 2, "construct": ["users"], "version": 3}}"#)
            .expect("valid config");

        let descriptor = table.lookup("app", "user_list").expect("descriptor exists");
        assert_eq!(descriptor.symbol(), "app");
        assert_eq!(descriptor.key(), "user_list");
        assert_eq!(descriptor.id(), "app_user_list");
        assert_eq!(descriptor.param_count(), 2);
        assert_eq!(descriptor.version(), 3);
        assert_eq!(descriptor.construct().type_name(), "users");
        assert_eq!(descriptor.construct().factory(), None);
    }

    #[test]
    fn lookup_normalizes_symbol_case() {
        let table = DescriptorTable::from_json(r#"{"GLD_config": {"params": 0, "construct": ["config"], "version": 1}}"#)
            .expect("valid config");

        assert!(table.lookup("gld", "config").is_ok());
        assert!(table.lookup("GLD", "config").is_ok());
    }

    #[test]
    fn missing_descriptor_is_reported() {
        let table = DescriptorTable::new();
        let error = table.lookup("gld", "nothing").expect_err("table is empty");
        assert!(matches!(error, RegistryError::DescriptorNotFound { .. }));
        assert_eq!(error.to_string(), "no descriptor registered for `gld_nothing`");
    }

    #[test]
    fn id_without_separator_is_rejected() {
        let error = DescriptorTable::from_json(r#"{"nounderscore": {"params": 0, "construct": ["x"], "version": 1}}"#)
            .expect_err("invalid id");
        assert!(matches!(error, ConfigError::InvalidId { .. }));
    }

    #[test]
    fn version_zero_is_rejected() {
        let error = DescriptorTable::from_json(r#"{"app_x": {"params": 0, "construct": ["x"], "version": 0}}"#)
            .expect_err("invalid version");
        assert!(matches!(error, ConfigError::InvalidVersion { .. }));
    }

    #[test]
    fn construct_must_have_one_or_two_names() {
        for construct in [r"[]", r#"["a", "b", "c"]"#, r#"[""]"#] {
            let json = format!(r#"{{"app_x": {{"params": 0, "construct": {construct}, "version": 1}}}}"#);
            let error = DescriptorTable::from_json(&json).expect_err("invalid construct");
            assert!(matches!(error, ConfigError::InvalidConstruct { .. }), "construct {construct}");
        }
    }

    #[test]
    fn malformed_json_is_rejected() {
        let error = DescriptorTable::from_json("{").expect_err("malformed");
        assert!(matches!(error, ConfigError::Json(_)));
    }

    #[test]
    fn from_config_matches_from_json() {
        let json = r#"{"gld_dummyparams": {"params": 1, "construct": ["dummy", "create_object"], "version": 2}}"#;
        let serde_json::Value::Object(map) = serde_json::from_str(json).expect("valid json") else {
            panic!("expected an object");
        };

        let table = DescriptorTable::from_config(map).expect("valid config");
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("gld", "dummyparams").expect("exists").version(), 2);
    }

    #[test]
    fn arity_check() {
        let descriptor = ObjectDescriptor::new("app", "pair", 2, ConstructSpec::new("pair"), 1).expect("valid");
        assert!(descriptor.check_arity(2).is_ok());

        let error = descriptor.check_arity(1).expect_err("one short");
        assert!(matches!(
            error,
            RegistryError::ArityMismatch {
                expected: 2,
                supplied: 1,
                ..
            }
        ));
    }

    #[test]
    fn programmatic_symbol_with_separator_is_rejected() {
        let error = ObjectDescriptor::new("a_b", "c", 0, ConstructSpec::new("x"), 1).expect_err("invalid symbol");
        assert!(matches!(error, ConfigError::InvalidId { .. }));
    }
}
