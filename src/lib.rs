//! Local BLE peripheral-role GATT service manager
//!
//! This crate registers GATT services and characteristics with a radio
//! adapter, validates them against protocol and platform constraints,
//! tracks which remote centrals are subscribed to which characteristics,
//! pushes value updates under MTU constraints, answers read/write
//! requests, and survives process restart via state restoration.
//!
//! Module map:
//! - `error`: recoverable error taxonomy
//! - `config`: manager configuration
//! - `gatt`: data model, validation, registry, subscriptions, values,
//!   requests, advertising
//! - `platform`: the adapter boundary to the radio stack
//! - `manager`: the serialized top-level manager
//!
//! Central-role scanning, encryption/bonding and any UI layer are out of
//! scope; the radio stack is reached only through the
//! [`platform::PlatformAdapter`] trait.

pub mod config;
pub mod error;
pub mod gatt;
pub mod manager;
pub mod platform;

// Re-export commonly used types for easy access
pub use config::PeripheralConfig;
pub use error::{
    AddServiceError, Error, RemoveServiceError, Result, StartAdvertisingError, UpdateValueError,
    ValidationError,
};
pub use gatt::{
    Central, CentralId, Characteristic, CharacteristicHandle, Permissions, Properties,
    RegisteredService, Service,
};
pub use manager::{PeripheralManager, PlatformEventSink};
pub use platform::{
    AttResult, PlatformAdapter, PlatformEvent, PowerState, RequestId, RestoredService,
    WriteRequest,
};
