//! Projection of the configuration store onto bus objects and properties.
//!
//! Each category with at least one valid base entry becomes one remote
//! object; each setting becomes one typed property on that object. Instead
//! of capturing per-property closures, the registry keeps explicit lookup
//! tables in both directions — `(object, property)` to `ConfigPath` for
//! serving accesses, and category to object handle for emitting change
//! notifications — and calls the store directly.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, error};

use crate::transport::{
    Access, AccessError, BusError, BusNames, ObjectHandle, PropertyBus, PropertyRequest,
    PropertySpec,
};
use prefd_core::{ConfigPath, ConfigStore, SetStatus};

/// Invariant violations in the object/property tables.
///
/// These indicate a programming error (a request or a changed path that maps
/// to nothing the registry built), not an expected runtime condition.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A property access named an unregistered object/property pair.
    #[error("no property registered for object {object:?} named \"{property}\"")]
    UnknownProperty {
        object: ObjectHandle,
        property: String,
    },

    /// A changed path's category has no registered object.
    #[error("no object registered for category \"{0}\"")]
    UnknownCategory(String),

    /// The transport failed while serving the registry.
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// The per-category object table and its property wiring.
pub struct PropertyRegistry {
    /// Category name to the object registered for it.
    objects: HashMap<String, ObjectHandle>,
    /// `(object, property name)` back to the setting it exposes.
    properties: HashMap<(ObjectHandle, String), ConfigPath>,
}

impl PropertyRegistry {
    /// Enumerates the store and registers one object per category.
    ///
    /// Categories whose template entries were all rejected at load time do
    /// not appear in the store's enumeration, so a fully invalid category
    /// silently produces no object.
    pub fn register(
        store: &ConfigStore,
        names: &BusNames,
        bus: &mut dyn PropertyBus,
    ) -> Result<Self, BusError> {
        let mut objects = HashMap::new();
        let mut properties = HashMap::new();

        for category in store.categories() {
            let settings = store.settings_in(category);

            let specs: Vec<PropertySpec> = settings
                .iter()
                .map(|(path, meta)| PropertySpec {
                    name: path.name().to_owned(),
                    ty: meta.config_type(),
                    displayed_name: meta.displayed_name().to_owned(),
                    description: meta.description().to_owned(),
                })
                .collect();

            debug!(
                "creating object for category \"{category}\" with {} properties",
                specs.len()
            );

            let handle = bus.register_object(&names.object_path(category), &specs)?;
            objects.insert(category.to_owned(), handle);

            for (path, _) in settings {
                properties.insert((handle, path.name().to_owned()), path.clone());
            }
        }

        Ok(Self {
            objects,
            properties,
        })
    }

    /// Serves one property access against the store and replies through the
    /// transport.
    ///
    /// A request for an unregistered object/property pair is answered with a
    /// remote-call error and additionally surfaced as a [`RegistryError`]:
    /// the registry built the property tables itself, so such a request
    /// cannot occur without a bug somewhere.
    pub fn handle_request(
        &self,
        store: &mut ConfigStore,
        bus: &mut dyn PropertyBus,
        request: PropertyRequest,
    ) -> Result<(), RegistryError> {
        let key = (request.object, request.property.clone());

        let Some(path) = self.properties.get(&key) else {
            error!(
                "property access for unregistered {:?}:\"{}\"",
                request.object, request.property
            );
            bus.reply(request.token, Err(AccessError::UnknownProperty))?;
            return Err(RegistryError::UnknownProperty {
                object: request.object,
                property: request.property,
            });
        };

        match request.access {
            Access::Get => {
                let result = match store.get(path) {
                    Some(value) => Ok(value),
                    None => {
                        // The path came out of the base table at build time.
                        error!("registered setting {path} vanished from the store");
                        Err(AccessError::NotFound)
                    }
                };
                bus.reply(request.token, result)?;
            }
            Access::Set(value) => {
                let result = match store.set(path, value.clone()) {
                    SetStatus::Ok => Ok(value),
                    SetStatus::NotFound => Err(AccessError::NotFound),
                    SetStatus::TypeMismatch => Err(AccessError::TypeMismatch),
                    SetStatus::FileError => Err(AccessError::Persistence),
                };
                bus.reply(request.token, result)?;
            }
        }

        Ok(())
    }

    /// Emits one properties-changed signal per drained path.
    pub fn notify(
        &self,
        bus: &mut dyn PropertyBus,
        paths: &[ConfigPath],
    ) -> Result<(), RegistryError> {
        for path in paths {
            let Some(handle) = self.objects.get(path.category()) else {
                error!("changed setting {path} has no registered category object");
                return Err(RegistryError::UnknownCategory(path.category().to_owned()));
            };

            debug!("emitting properties-changed for {path}");
            bus.emit_properties_changed(*handle, path.name())?;
        }

        Ok(())
    }

    /// Returns the object registered for a category, if any.
    pub fn object_for(&self, category: &str) -> Option<ObjectHandle> {
        self.objects.get(category).copied()
    }

    /// Number of category objects registered.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}
