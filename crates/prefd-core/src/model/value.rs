//! Typed setting values and the JSON classification chokepoint.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// The closed set of setting kinds the store supports.
///
/// `None` marks an unrecognised or unsupported value and is never a valid
/// stored type: template entries whose default classifies as `None` are
/// rejected at load time, and a `None` classification of an incoming value
/// always means a type mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
    None,
    Bool,
    Int,
    Float,
    String,
    ArrayInt,
    ArrayFloat,
    ArrayString,
}

impl ConfigType {
    /// Classifies a parsed JSON value into a [`ConfigType`].
    ///
    /// Integers and floats are distinguished by representation: a number that
    /// fits `i64` is `Int`, any other finite number is `Float`. Arrays must be
    /// homogeneous; a mixed-type array, an empty array (element type is
    /// undecidable), or an array of an unsupported element kind classifies as
    /// `None`, as do JSON null and object values.
    pub fn classify(value: &Value) -> ConfigType {
        match value {
            Value::Bool(_) => ConfigType::Bool,
            Value::Number(n) => {
                if n.as_i64().is_some() {
                    ConfigType::Int
                } else if n.is_f64() {
                    ConfigType::Float
                } else {
                    // u64 beyond the i64 range
                    ConfigType::None
                }
            }
            Value::String(_) => ConfigType::String,
            Value::Array(items) => Self::classify_array(items),
            Value::Null | Value::Object(_) => ConfigType::None,
        }
    }

    fn classify_array(items: &[Value]) -> ConfigType {
        let mut element = ConfigType::None;

        for item in items {
            let kind = match Self::classify(item) {
                ConfigType::Int => ConfigType::ArrayInt,
                ConfigType::Float => ConfigType::ArrayFloat,
                ConfigType::String => ConfigType::ArrayString,
                // Nested arrays and bool elements are unsupported.
                _ => return ConfigType::None,
            };

            if element == ConfigType::None {
                element = kind;
            } else if element != kind {
                return ConfigType::None;
            }
        }

        element
    }
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::None => "None",
            ConfigType::Bool => "Bool",
            ConfigType::Int => "Int",
            ConfigType::Float => "Float",
            ConfigType::String => "String",
            ConfigType::ArrayInt => "ArrayInt",
            ConfigType::ArrayFloat => "ArrayFloat",
            ConfigType::ArrayString => "ArrayString",
        };
        f.write_str(name)
    }
}

/// A typed setting value.
///
/// This is the only value representation the store, registry, and transport
/// exchange; raw JSON exists solely at the file-parsing boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    ArrayInt(Vec<i64>),
    ArrayFloat(Vec<f64>),
    ArrayString(Vec<String>),
}

impl ConfigValue {
    /// Converts a parsed JSON value into a typed value.
    ///
    /// Returns `None` exactly when [`ConfigType::classify`] returns
    /// [`ConfigType::None`].
    pub fn from_json(value: &Value) -> Option<ConfigValue> {
        match ConfigType::classify(value) {
            ConfigType::None => None,
            ConfigType::Bool => value.as_bool().map(ConfigValue::Bool),
            ConfigType::Int => value.as_i64().map(ConfigValue::Int),
            ConfigType::Float => value.as_f64().map(ConfigValue::Float),
            ConfigType::String => value.as_str().map(|s| ConfigValue::String(s.to_owned())),
            ConfigType::ArrayInt => {
                let items = value.as_array()?;
                Some(ConfigValue::ArrayInt(
                    items.iter().filter_map(Value::as_i64).collect(),
                ))
            }
            ConfigType::ArrayFloat => {
                let items = value.as_array()?;
                Some(ConfigValue::ArrayFloat(
                    items.iter().filter_map(Value::as_f64).collect(),
                ))
            }
            ConfigType::ArrayString => {
                let items = value.as_array()?;
                Some(ConfigValue::ArrayString(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_owned))
                        .collect(),
                ))
            }
        }
    }

    /// Returns the type tag of this value.
    pub fn config_type(&self) -> ConfigType {
        match self {
            ConfigValue::Bool(_) => ConfigType::Bool,
            ConfigValue::Int(_) => ConfigType::Int,
            ConfigValue::Float(_) => ConfigType::Float,
            ConfigValue::String(_) => ConfigType::String,
            ConfigValue::ArrayInt(_) => ConfigType::ArrayInt,
            ConfigValue::ArrayFloat(_) => ConfigType::ArrayFloat,
            ConfigValue::ArrayString(_) => ConfigType::ArrayString,
        }
    }
}
