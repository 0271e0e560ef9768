//! GATT data model and peripheral-role service components
//!
//! This module contains the local service/characteristic model and the
//! components built on it:
//! - Characteristic validation rules
//! - Service registry with included-service tracking
//! - Central subscription tracking
//! - MTU-aware value updates with bounded history
//! - Read/write request handling
//! - Advertising control

pub mod advertising;
pub mod registry;
pub mod requests;
pub mod subscriptions;
pub mod validator;
pub mod values;

pub use advertising::{AdvertisingController, AdvertisingState};
pub use registry::ServiceRegistry;
pub use subscriptions::SubscriptionTracker;
pub use validator::validate_characteristic;
pub use values::{ValueHistory, ValueUpdateEngine};

use bytes::Bytes;
use uuid::Uuid;

/// Opaque handle identifying a registered characteristic.
///
/// Handles are issued by the registry when a service is adopted and are
/// the keys the platform uses in every subsequent callback. Raw object
/// identity never crosses the adapter boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharacteristicHandle(pub u64);

/// Opaque handle identifying a remote central, issued by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CentralId(pub u64);

/// A remote peer connected to this device while it acts in the
/// peripheral role. Supplied by the platform per interaction; the core
/// only records relations to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Central {
    pub id: CentralId,
    /// Negotiated maximum payload size for one notification.
    pub max_update_len: usize,
}

impl Central {
    pub fn new(id: CentralId, max_update_len: usize) -> Self {
        Self { id, max_update_len }
    }
}

/// Characteristic property set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub write_without_response: bool,
    pub notify: bool,
    pub broadcast: bool,
    pub extended_properties: bool,
}

impl Properties {
    /// Exactly `{read}`, the only property set allowed alongside a
    /// cached value.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Default::default()
        }
    }
}

/// Characteristic permission set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions {
    pub readable: bool,
    pub writeable: bool,
}

impl Permissions {
    pub fn read_only() -> Self {
        Self {
            readable: true,
            writeable: false,
        }
    }

    pub fn read_write() -> Self {
        Self {
            readable: true,
            writeable: true,
        }
    }
}

/// A characteristic declared by a local service
#[derive(Debug, Clone)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub properties: Properties,
    pub permissions: Permissions,
    /// Static value fixed at definition time rather than computed per
    /// read. Forces the characteristic to be read-only.
    pub cached_value: Option<Bytes>,
    /// Human-readable description exposed through the user description
    /// descriptor.
    pub description: Option<String>,
}

impl Characteristic {
    pub fn new(uuid: Uuid, properties: Properties, permissions: Permissions) -> Self {
        Self {
            uuid,
            properties,
            permissions,
            cached_value: None,
            description: None,
        }
    }

    pub fn with_cached_value(mut self, value: impl Into<Bytes>) -> Self {
        self.cached_value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A local GATT service as submitted by the application
#[derive(Debug, Clone)]
pub struct Service {
    pub uuid: Uuid,
    /// Declaration order is preserved; handles are issued in this order.
    pub characteristics: Vec<Characteristic>,
    /// References to other already-registered services.
    pub included_services: Vec<Uuid>,
}

impl Service {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            characteristics: Vec::new(),
            included_services: Vec::new(),
        }
    }

    pub fn add_characteristic(mut self, characteristic: Characteristic) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    pub fn include_service(mut self, uuid: Uuid) -> Self {
        self.included_services.push(uuid);
        self
    }
}

/// A service adopted by the registry, carrying the platform-visible
/// characteristic handles. Handles parallel `service.characteristics`.
#[derive(Debug, Clone)]
pub struct RegisteredService {
    pub service: Service,
    pub handles: Vec<CharacteristicHandle>,
}

impl RegisteredService {
    /// Look up a declared characteristic by its issued handle.
    pub fn characteristic(&self, handle: CharacteristicHandle) -> Option<&Characteristic> {
        self.handles
            .iter()
            .position(|h| *h == handle)
            .map(|idx| &self.service.characteristics[idx])
    }

    /// Handle issued for the characteristic with the given UUID, if any.
    pub fn handle_of(&self, uuid: Uuid) -> Option<CharacteristicHandle> {
        self.service
            .characteristics
            .iter()
            .position(|c| c.uuid == uuid)
            .map(|idx| self.handles[idx])
    }
}
