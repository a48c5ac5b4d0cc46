//! The layered configuration store.
//!
//! [`ConfigStore`] merges the immutable base template with the mutable
//! user-override file. The base table decides which settings exist and what
//! type each must hold; the override table holds only values the user has
//! changed and is exactly what gets persisted back to disk.
//!
//! The user file can be edited out-of-band at any time. Every `get`, `set`,
//! and `was_updated` call first compares the file's modification timestamp
//! against the last one the store observed and re-merges the file when they
//! differ, so external readers stay consistent without a watcher thread.
//! Changes observed that way (and successful `set` calls) are queued and
//! drained by the exposition layer to drive change notifications.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::model::{ConfigPath, ConfigType, ConfigValue};

pub mod template;

pub use template::BaseSetting;

/// Construction-time errors. All of them are fatal: the daemon must not
/// start without a valid base table.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The template file could not be read.
    #[error("failed to read template file {path}: {source}")]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The template file is not valid JSON.
    #[error("failed to parse template file {path}: {source}")]
    TemplateParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The template document is not shaped category -> setting -> fields.
    #[error("template file {path} is malformed: {reason}")]
    TemplateShape { path: PathBuf, reason: String },
}

/// Outcome of a [`ConfigStore::set`] call.
///
/// The non-`Ok` variants are ordinary, expected results, not errors: each
/// one leaves the store's observable state exactly as it was before the
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStatus {
    /// The value was stored and persisted.
    Ok,
    /// The path does not exist in the base template.
    NotFound,
    /// The value's type does not match the setting's declared type.
    TypeMismatch,
    /// Writing the user file failed; the in-memory table was rolled back.
    FileError,
}

/// The merged view over the base template and the user-override file.
pub struct ConfigStore {
    base: BTreeMap<ConfigPath, BaseSetting>,
    overrides: BTreeMap<ConfigPath, ConfigValue>,
    user_path: PathBuf,
    /// Modification time of the user file at the last read or write, used to
    /// detect external edits. `None` while the file does not exist.
    last_write: Option<SystemTime>,
    /// Paths changed since `updated_paths` was last drained.
    changed_paths: Vec<ConfigPath>,
    /// Whether anything changed since `was_updated` was last drained.
    changed: bool,
}

impl ConfigStore {
    /// Builds a store from the template file and the user-override file.
    ///
    /// A missing or invalid user file is recoverable: the store starts with
    /// an empty override table and every setting reads as its default.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the template file is missing,
    /// unreadable, or structurally invalid at the category/setting levels.
    pub fn open(
        template_path: impl AsRef<Path>,
        user_path: impl Into<PathBuf>,
    ) -> Result<Self, StoreError> {
        let template_path = template_path.as_ref();
        let base = template::load_base_table(template_path)?;

        if base.is_empty() {
            warn!(
                "template {} produced no valid settings",
                template_path.display()
            );
        }

        let mut store = Self {
            base,
            overrides: BTreeMap::new(),
            user_path: user_path.into(),
            last_write: None,
            changed_paths: Vec::new(),
            changed: false,
        };

        store.merge_user_file();
        store.last_write = store.current_mtime();

        // The initial merge is not an observable change.
        store.changed_paths.clear();
        store.changed = false;

        Ok(store)
    }

    /// Returns the current value of a setting: the user override if present,
    /// else the template default. `None` only when the path is absent from
    /// the base table.
    pub fn get(&mut self, path: &ConfigPath) -> Option<ConfigValue> {
        self.check_external_edit();

        if let Some(value) = self.overrides.get(path) {
            return Some(value.clone());
        }

        if let Some(base) = self.base.get(path) {
            return Some(base.default_value().clone());
        }

        warn!("get failed: setting not found ({path})");
        None
    }

    /// Stores a new override value and persists the whole override table.
    ///
    /// On persistence failure the staged entry is rolled back to its
    /// pre-call state and no change is recorded.
    pub fn set(&mut self, path: &ConfigPath, value: ConfigValue) -> SetStatus {
        self.check_external_edit();

        let Some(base) = self.base.get(path) else {
            warn!("set failed: setting not found ({path})");
            return SetStatus::NotFound;
        };

        if base.config_type() != value.config_type() {
            warn!(
                "set failed: type mismatch for {path} (expected {}, got {})",
                base.config_type(),
                value.config_type()
            );
            return SetStatus::TypeMismatch;
        }

        // Stage the new value, remembering the previous entry (or its
        // absence) so a failed write can be undone exactly.
        let previous = self.overrides.insert(path.clone(), value);

        match self.persist() {
            Ok(()) => {
                // Record our own write's timestamp so the next drift check
                // does not mistake it for an external edit.
                self.last_write = self.current_mtime();
                self.changed_paths.push(path.clone());
                self.changed = true;
                SetStatus::Ok
            }
            Err(e) => {
                match previous {
                    Some(old) => {
                        self.overrides.insert(path.clone(), old);
                    }
                    None => {
                        self.overrides.remove(path);
                    }
                }
                warn!("set failed: file error ({e})");
                SetStatus::FileError
            }
        }
    }

    /// Returns and clears the list of paths changed since the last call.
    pub fn updated_paths(&mut self) -> Vec<ConfigPath> {
        std::mem::take(&mut self.changed_paths)
    }

    /// Returns and clears the "anything changed" flag, checking for external
    /// edits first.
    pub fn was_updated(&mut self) -> bool {
        self.check_external_edit();
        std::mem::take(&mut self.changed)
    }

    /// Returns the template metadata for a setting.
    pub fn metadata(&self, path: &ConfigPath) -> Option<&BaseSetting> {
        self.base.get(path)
    }

    /// Returns every category that holds at least one valid setting, in
    /// lexicographic order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for path in self.base.keys() {
            // Keys are sorted by category first, so duplicates are adjacent.
            if categories.last() != Some(&path.category()) {
                categories.push(path.category());
            }
        }
        categories
    }

    /// Returns the settings of one category, in name order.
    pub fn settings_in(&self, category: &str) -> Vec<(&ConfigPath, &BaseSetting)> {
        self.base
            .iter()
            .filter(|(path, _)| path.category() == category)
            .collect()
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Re-merges the user file when its modification timestamp has moved.
    ///
    /// A deleted user file is not treated as an edit: overrides persist
    /// in memory until the file reappears with different content.
    fn check_external_edit(&mut self) {
        let Some(modified) = self.current_mtime() else {
            return;
        };

        if self.last_write != Some(modified) {
            debug!(
                "user configuration {} changed on disk, re-reading",
                self.user_path.display()
            );
            self.merge_user_file();
            self.last_write = Some(modified);
        }
    }

    fn current_mtime(&self) -> Option<SystemTime> {
        fs::metadata(&self.user_path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }

    /// Parses the user file and merges it over the current override table.
    ///
    /// Entries unknown to the base table or with a mismatched type are
    /// skipped with a warning. Entries that are new or differ from the
    /// current override are appended to the change queue. The merge only
    /// adds and overwrites; it never removes an override, so deleting a key
    /// from the file does not revert the setting to its default.
    fn merge_user_file(&mut self) {
        let text = match fs::read_to_string(&self.user_path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no user configuration at {}", self.user_path.display());
                return;
            }
            Err(e) => {
                error!(
                    "failed to read user configuration {}: {e}",
                    self.user_path.display()
                );
                return;
            }
        };

        let document: Value = match serde_json::from_str(&text) {
            Ok(document) => document,
            Err(e) => {
                error!(
                    "failed to parse user configuration {}: {e}",
                    self.user_path.display()
                );
                return;
            }
        };

        let Some(categories) = document.as_object() else {
            warn!(
                "user configuration {}: top level is not an object",
                self.user_path.display()
            );
            return;
        };

        for (category, settings) in categories {
            let Some(settings) = settings.as_object() else {
                warn!("ignoring user category \"{category}\": not an object");
                continue;
            };

            for (name, raw) in settings {
                let Ok(path) = ConfigPath::new(category.clone(), name.clone()) else {
                    warn!("ignoring user setting ({category}:{name}): empty path component");
                    continue;
                };

                let Some(base) = self.base.get(&path) else {
                    warn!("ignoring user setting ({path}): not in base template");
                    continue;
                };

                let classified = ConfigType::classify(raw);
                if classified != base.config_type() {
                    warn!(
                        "ignoring user setting ({path}): wrong type (expected {}, got {})",
                        base.config_type(),
                        classified
                    );
                    continue;
                }

                let Some(value) = ConfigValue::from_json(raw) else {
                    continue;
                };

                match self.overrides.get(&path) {
                    Some(old) if *old == value => {}
                    _ => {
                        self.changed_paths.push(path.clone());
                        self.changed = true;
                    }
                }

                self.overrides.insert(path, value);
            }
        }
    }

    /// Serializes the whole override table, grouped by category, and
    /// atomically replaces the user file (write to a temp file in the same
    /// directory, then rename over the target).
    fn persist(&self) -> io::Result<()> {
        let mut document = serde_json::Map::new();

        for (path, value) in &self.overrides {
            let category = document
                .entry(path.category().to_owned())
                .or_insert_with(|| Value::Object(serde_json::Map::new()));

            if let Value::Object(settings) = category {
                let raw = serde_json::to_value(value)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                settings.insert(path.name().to_owned(), raw);
            }
        }

        let text = serde_json::to_string_pretty(&Value::Object(document))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        if !self.user_path.exists() {
            warn!(
                "user configuration file not found, creating {}",
                self.user_path.display()
            );
        }

        let parent = self.user_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let mut file = tempfile::NamedTempFile::new_in(parent)?;
        file.write_all(text.as_bytes())?;
        file.write_all(b"\n")?;
        file.flush()?;
        file.persist(&self.user_path).map_err(|e| e.error)?;

        Ok(())
    }
}
