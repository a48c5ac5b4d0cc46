//! Base template loading and per-entry validation.
//!
//! The template file is the read-only source of truth for which settings
//! exist, their types, defaults, and display metadata:
//!
//! ```json
//! {
//!     "video": {
//!         "dpi": {
//!             "default": 96,
//!             "displayed_name": "Display DPI",
//!             "description": "Dots per inch reported to clients"
//!         }
//!     }
//! }
//! ```
//!
//! A missing or unreadable file, or a document whose top two nesting levels
//! (category, setting) are not JSON objects, is fatal: the daemon must not
//! start without a base table. Problems inside an individual entry are not:
//! the entry is dropped with a warning and simply does not exist for the rest
//! of the process.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::Value;
use tracing::warn;

use crate::model::{ConfigPath, ConfigType, ConfigValue};
use crate::store::StoreError;

/// One validated template entry. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct BaseSetting {
    default: ConfigValue,
    ty: ConfigType,
    displayed_name: String,
    description: String,
}

impl BaseSetting {
    /// Returns the default value.
    pub fn default_value(&self) -> &ConfigValue {
        &self.default
    }

    /// Returns the setting type, derived from the default at load time.
    pub fn config_type(&self) -> ConfigType {
        self.ty
    }

    /// Returns the human-readable name.
    pub fn displayed_name(&self) -> &str {
        &self.displayed_name
    }

    /// Returns the human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Parses the template file into the base table.
pub(crate) fn load_base_table(
    path: &Path,
) -> Result<BTreeMap<ConfigPath, BaseSetting>, StoreError> {
    let text = fs::read_to_string(path).map_err(|source| StoreError::TemplateIo {
        path: path.to_path_buf(),
        source,
    })?;

    let document: Value =
        serde_json::from_str(&text).map_err(|source| StoreError::TemplateParse {
            path: path.to_path_buf(),
            source,
        })?;

    let shape_error = |reason: String| StoreError::TemplateShape {
        path: path.to_path_buf(),
        reason,
    };

    let categories = document
        .as_object()
        .ok_or_else(|| shape_error("top level is not an object".to_owned()))?;

    let mut table = BTreeMap::new();

    for (category, settings) in categories {
        let settings = settings.as_object().ok_or_else(|| {
            shape_error(format!("category \"{category}\" is not an object"))
        })?;

        for (name, entry) in settings {
            let entry = entry.as_object().ok_or_else(|| {
                shape_error(format!("setting \"{category}:{name}\" is not an object"))
            })?;

            if let Some(setting) = validate_entry(category, name, entry) {
                let path = match ConfigPath::new(category.clone(), name.clone()) {
                    Ok(path) => path,
                    Err(_) => {
                        warn!("ignoring template entry ({category}:{name}): empty path component");
                        continue;
                    }
                };
                table.insert(path, setting);
            }
        }
    }

    Ok(table)
}

/// Validates one template entry, returning `None` (after a warning) when any
/// field is missing or ill-typed.
fn validate_entry(
    category: &str,
    name: &str,
    entry: &serde_json::Map<String, Value>,
) -> Option<BaseSetting> {
    let default = match entry.get("default") {
        Some(v) if !v.is_null() => v,
        _ => {
            warn!("ignoring template entry ({category}:{name}): missing default field");
            return None;
        }
    };

    let displayed_name = match entry.get("displayed_name") {
        Some(v) if !v.is_null() => v,
        _ => {
            warn!("ignoring template entry ({category}:{name}): missing displayed_name field");
            return None;
        }
    };

    let description = match entry.get("description") {
        Some(v) if !v.is_null() => v,
        _ => {
            warn!("ignoring template entry ({category}:{name}): missing description field");
            return None;
        }
    };

    if default.is_object() {
        warn!("ignoring template entry ({category}:{name}): default cannot be an object");
        return None;
    }

    let displayed_name = match displayed_name.as_str() {
        Some(s) if !s.is_empty() => s.to_owned(),
        _ => {
            warn!("ignoring template entry ({category}:{name}): displayed_name has wrong type");
            return None;
        }
    };

    let description = match description.as_str() {
        Some(s) if !s.is_empty() => s.to_owned(),
        _ => {
            warn!("ignoring template entry ({category}:{name}): description has wrong type");
            return None;
        }
    };

    let Some(default) = ConfigValue::from_json(default) else {
        warn!(
            "ignoring template entry ({category}:{name}): default has unsupported type {}",
            ConfigType::classify(default)
        );
        return None;
    };

    let ty = default.config_type();

    Some(BaseSetting {
        default,
        ty,
        displayed_name,
        description,
    })
}
