//! Object/property transport boundary.
//!
//! The daemon does not pick a concrete IPC library; it drives anything that
//! implements [`PropertyBus`]. A transport must be able to (1) register one
//! remote object per category with one typed property per setting, (2)
//! surface property get/set accesses as [`PropertyRequest`]s for the daemon
//! to serve, and (3) emit a "properties changed" signal for a given object
//! and property name.
//!
//! The trait is poll-oriented: the transport exposes the file descriptors it
//! needs watched and an optional housekeeping timeout, and the event loop
//! multiplexes them with `poll(2)`. Processing one unit of work per wake
//! keeps everything on the single daemon thread.
//!
//! # Testability
//!
//! [`mock::MockBus`] is an in-process implementation backed by a self-pipe,
//! so tests exercise the real poll path without any IPC daemon running.

use std::os::fd::BorrowedFd;
use std::time::Duration;

use thiserror::Error;

use prefd_core::{ConfigType, ConfigValue};

pub mod mock;

/// Well-known service name, versioned by suffix.
pub const SERVICE_NAME: &str = "org.prefd.Store";
/// Service version suffix.
pub const SERVICE_VERSION: &str = "1";
/// Root object path; category objects hang directly below it.
pub const ROOT_OBJECT: &str = "/org/prefd/Store";
/// Property interface name, versioned by suffix.
pub const INTERFACE_NAME: &str = "org.prefd.Store.Config";
/// Interface version suffix.
pub const INTERFACE_VERSION: &str = "1";

/// Process-wide bus naming configuration.
///
/// Built once at startup and passed by reference into the registry, so every
/// component derives object paths from the same root.
#[derive(Debug, Clone)]
pub struct BusNames {
    /// Versioned well-known service name.
    pub service: String,
    /// Root object path.
    pub root_object: String,
    /// Versioned property interface name.
    pub interface: String,
}

impl Default for BusNames {
    fn default() -> Self {
        Self {
            service: format!("{SERVICE_NAME}{SERVICE_VERSION}"),
            root_object: ROOT_OBJECT.to_owned(),
            interface: format!("{INTERFACE_NAME}{INTERFACE_VERSION}"),
        }
    }
}

impl BusNames {
    /// Returns the object path for a category: `<root>/<category>`.
    pub fn object_path(&self, category: &str) -> String {
        format!("{}/{}", self.root_object, category)
    }
}

/// Handle to a remote object registered on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle(pub usize);

/// Declaration of one typed property on a category object.
#[derive(Debug, Clone)]
pub struct PropertySpec {
    /// Property (setting) name.
    pub name: String,
    /// Declared value type.
    pub ty: ConfigType,
    /// Human-readable name from the template.
    pub displayed_name: String,
    /// Human-readable description from the template.
    pub description: String,
}

/// Correlates a [`PropertyRequest`] with its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(pub u64);

/// The two property access kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Access {
    Get,
    Set(ConfigValue),
}

/// One pending property access surfaced by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRequest {
    pub token: RequestToken,
    pub object: ObjectHandle,
    pub property: String,
    pub access: Access,
}

/// Error surfaced to the remote caller when a property access fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The setting does not exist in the base template.
    #[error("setting not found")]
    NotFound,
    /// The supplied value's type disagrees with the setting's type.
    #[error("value type does not match the setting type")]
    TypeMismatch,
    /// The new value could not be persisted to the user file.
    #[error("failed to persist the user configuration")]
    Persistence,
    /// The object/property pair is not registered at all.
    #[error("no such property on this object")]
    UnknownProperty,
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum BusError {
    /// The transport connection ended; the event loop stops cleanly.
    #[error("transport connection closed")]
    Closed,

    /// An object path was registered twice.
    #[error("object path already registered: {0}")]
    DuplicateObject(String),

    /// A reply or signal referenced an object the bus never registered.
    #[error("unknown object handle: {0}")]
    UnknownObject(usize),

    /// A reply referenced a request the bus never issued.
    #[error("unknown request token: {0}")]
    UnknownToken(u64),

    /// An I/O failure on the transport descriptors.
    #[error("transport I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

/// The object/property transport driven by the daemon's event loop.
pub trait PropertyBus {
    /// Registers a remote object exposing the given properties.
    fn register_object(
        &mut self,
        object_path: &str,
        properties: &[PropertySpec],
    ) -> Result<ObjectHandle, BusError>;

    /// Descriptors the event loop must watch for readability.
    fn poll_fds(&self) -> Vec<BorrowedFd<'_>>;

    /// Longest time the event loop may block before the transport wants to
    /// run again; `None` means block indefinitely.
    fn poll_timeout(&self) -> Option<Duration>;

    /// Processes one pending unit of work.
    ///
    /// Returns `Ok(None)` when idle and [`BusError::Closed`] once the
    /// connection has ended.
    fn next_request(&mut self) -> Result<Option<PropertyRequest>, BusError>;

    /// Completes a property access surfaced by [`Self::next_request`].
    fn reply(
        &mut self,
        token: RequestToken,
        result: Result<ConfigValue, AccessError>,
    ) -> Result<(), BusError>;

    /// Emits a "properties changed" signal naming one property.
    fn emit_properties_changed(
        &mut self,
        object: ObjectHandle,
        property: &str,
    ) -> Result<(), BusError>;
}
