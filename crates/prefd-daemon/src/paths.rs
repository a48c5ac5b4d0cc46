//! Startup path resolution for the two configuration files.
//!
//! Both locations can be pinned through the environment, which is how the
//! test harness and packaging overrides point the daemon at non-standard
//! files. Without an override the base template comes from the system share
//! directory and the user file lives under the XDG config home.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

/// Environment override for the base template location.
pub const TEMPLATE_ENV: &str = "PREFD_TEMPLATE";
/// Environment override for the user override file location.
pub const USER_CONFIG_ENV: &str = "PREFD_USER_CONFIG";
/// Template location used when no override is set.
pub const DEFAULT_TEMPLATE: &str = "/usr/share/prefd/template.json";

/// User file path relative to the XDG config home.
const USER_CONFIG_RELATIVE: &str = "prefd/settings.json";

#[derive(Debug, Error)]
pub enum PathsError {
    /// No override was set and neither XDG_CONFIG_HOME nor HOME is available
    /// to derive a config directory from.
    #[error("cannot locate a user configuration directory: set PREFD_USER_CONFIG, XDG_CONFIG_HOME or HOME")]
    NoConfigDir,
}

/// Returns the base template path, honouring [`TEMPLATE_ENV`].
pub fn template_path() -> PathBuf {
    resolve_template(env::var_os(TEMPLATE_ENV))
}

/// Returns the user override file path, honouring [`USER_CONFIG_ENV`].
///
/// The file itself does not have to exist; the store creates it on the
/// first persisted write.
pub fn user_config_path() -> Result<PathBuf, PathsError> {
    resolve_user_config(
        env::var_os(USER_CONFIG_ENV),
        env::var_os("XDG_CONFIG_HOME"),
        env::var_os("HOME"),
    )
}

fn resolve_template(override_path: Option<OsString>) -> PathBuf {
    match override_path {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_TEMPLATE),
    }
}

fn resolve_user_config(
    override_path: Option<OsString>,
    xdg_config_home: Option<OsString>,
    home: Option<OsString>,
) -> Result<PathBuf, PathsError> {
    if let Some(path) = override_path {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let config_home = match xdg_config_home {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => match home {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir).join(".config"),
            _ => return Err(PathsError::NoConfigDir),
        },
    };

    Ok(config_home.join(USER_CONFIG_RELATIVE))
}
