//! Setting identity: the `(category, name)` pair.

use std::fmt;

use thiserror::Error;

/// Error returned when constructing a [`ConfigPath`] from empty components.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("config path components must be non-empty")]
pub struct InvalidConfigPath;

/// Identifies one setting in the configuration files.
///
/// Paths order lexicographically by category, then by name, which makes them
/// usable as `BTreeMap` keys and keeps the persisted user file stable between
/// writes. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigPath {
    category: String,
    name: String,
}

impl ConfigPath {
    /// Creates a path from non-empty category and name components.
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self, InvalidConfigPath> {
        let category = category.into();
        let name = name.into();

        if category.is_empty() || name.is_empty() {
            return Err(InvalidConfigPath);
        }

        Ok(Self { category, name })
    }

    /// Returns the category component.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the setting name component.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.name)
    }
}
