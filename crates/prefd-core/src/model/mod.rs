//! Data model for the configuration store.
//!
//! Settings are addressed by a [`ConfigPath`] (category + name) and hold a
//! [`ConfigValue`], a closed tagged variant over the scalar and homogeneous
//! array kinds the store supports. Classification of raw parsed JSON into a
//! [`ConfigType`] happens in exactly one place ([`ConfigType::classify`]);
//! every other component operates on the typed variant, never on raw JSON.

pub mod path;
pub mod value;

pub use path::{ConfigPath, InvalidConfigPath};
pub use value::{ConfigType, ConfigValue};
