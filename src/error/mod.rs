//! Error types for the peripheral-role GATT service manager
//!
//! All errors are recoverable and local. Operations either return a failure
//! synchronously where it is detectable locally (validation), or report it
//! through the manager's observable error slot once the platform answers.

use thiserror::Error;

/// Result type alias for peripheral manager operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Composition failures found while validating a single characteristic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("characteristics with cached values must be read-only")]
    CachedValueNotReadOnly,

    #[error("properties and permissions mismatch")]
    PermissionMismatch,

    #[error("broadcast and extended properties are not supported for local services")]
    UnsupportedProperties,
}

/// Reasons a service registration can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddServiceError {
    #[error("a service with this uuid is already registered")]
    DuplicateService,

    #[error("included service must be registered first")]
    MissingIncludedService,

    #[error("invalid characteristic: {0}")]
    Validation(#[from] ValidationError),

    #[error("platform rejected the service: {0}")]
    Platform(String),
}

/// Reasons a service removal can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveServiceError {
    #[error("service is not registered")]
    NotRegistered,

    #[error("service is included in another service and cannot be removed")]
    IncludedElsewhere,

    #[error("platform remove request failed: {0}")]
    Platform(String),
}

/// Reasons advertising can fail to start
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartAdvertisingError {
    #[error("no registered services to advertise")]
    NoServices,

    #[error("platform failed to start advertising: {0}")]
    Platform(String),
}

/// Reasons a characteristic value update can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateValueError {
    #[error("payload of {len} bytes exceeds the effective mtu of {mtu} bytes")]
    PayloadTooLarge { len: usize, mtu: usize },

    /// The platform transmit queue rejected the update. Retryable, but the
    /// engine performs no automatic retry.
    #[error("transmit queue is full, try again later")]
    TransmitQueueFull,

    #[error("characteristic is not registered")]
    UnknownCharacteristic,

    #[error("platform push failed: {0}")]
    Platform(String),
}

/// Top-level error taxonomy surfaced through the manager's error slot
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The manager's serialized task is gone; no further commands can run.
    #[error("peripheral manager is not available")]
    InvalidManager,

    /// The radio is not powered on; gates every mutating operation.
    #[error("bluetooth is not available")]
    BluetoothUnavailable,

    #[error("add service failed: {0}")]
    AddService(#[from] AddServiceError),

    #[error("remove service failed: {0}")]
    RemoveService(#[from] RemoveServiceError),

    #[error("start advertising failed: {0}")]
    StartAdvertising(#[from] StartAdvertisingError),

    #[error("update value failed: {0}")]
    UpdateValue(#[from] UpdateValueError),

    #[error("configuration error: {0}")]
    Config(String),
}
