//! # prefd-core
//!
//! Shared library for prefd containing the configuration data model and the
//! layered configuration store.
//!
//! A prefd deployment has two files: an immutable *base template* describing
//! every setting (type, default, display metadata) and a mutable *user file*
//! holding only the values the user has overridden. [`ConfigStore`] merges
//! the two, enforces per-setting typing, notices external edits to the user
//! file via its modification timestamp, and persists writes atomically.
//!
//! This crate has zero dependencies on IPC transports or OS event APIs; the
//! daemon crate layers the object/property exposition on top of it.

pub mod model;
pub mod store;

// Re-export the most-used types at the crate root so callers can write
// `prefd_core::ConfigStore` instead of `prefd_core::store::ConfigStore`.
pub use model::{ConfigPath, ConfigType, ConfigValue, InvalidConfigPath};
pub use store::{BaseSetting, ConfigStore, SetStatus, StoreError};
