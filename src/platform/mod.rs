//! Platform adapter boundary
//!
//! The radio stack sits behind two interfaces:
//! - [`PlatformAdapter`], the outbound operations the core issues, and
//! - [`PlatformEvent`], the inbound callbacks the platform raises.
//!
//! Callbacks may originate on any execution context; they are marshaled
//! into the manager's single serialized loop through an event sink and
//! never touch shared state directly.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::gatt::{Central, CentralId, CharacteristicHandle, RegisteredService};

/// Identifier the platform attaches to each inbound ATT request so a
/// response can be matched to it.
pub type RequestId = u64;

/// ATT result code for responding to read/write requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttResult {
    Success,
    InvalidHandle,
}

/// Radio readiness as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerState {
    #[default]
    Unknown,
    PoweredOff,
    PoweredOn,
}

/// One entry of a queued-write batch from a central.
#[derive(Debug, Clone)]
pub struct WriteRequest {
    pub request_id: RequestId,
    pub central: Central,
    pub characteristic: CharacteristicHandle,
    /// Byte offset the central declared for this chunk.
    pub offset: usize,
    pub value: Bytes,
}

/// A service handed back by the platform after process relaunch,
/// together with the subscribers it reported per characteristic.
#[derive(Debug, Clone)]
pub struct RestoredService {
    pub service: RegisteredService,
    pub subscribers: HashMap<CharacteristicHandle, Vec<Central>>,
}

/// Inbound platform callbacks.
///
/// Every read and write request must be answered with
/// [`PlatformAdapter::respond`]; an unanswered request violates the host
/// protocol contract.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    StateChanged {
        state: PowerState,
    },
    ServiceAddResult {
        service_uuid: Uuid,
        error: Option<String>,
    },
    AdvertisingStarted {
        error: Option<String>,
    },
    CentralSubscribed {
        central: Central,
        characteristic: CharacteristicHandle,
    },
    CentralUnsubscribed {
        central: CentralId,
        characteristic: CharacteristicHandle,
    },
    ReadRequested {
        request_id: RequestId,
        central: Central,
        characteristic: CharacteristicHandle,
    },
    WriteRequested {
        requests: Vec<WriteRequest>,
    },
    StateRestored {
        services: Vec<RestoredService>,
    },
}

/// Outbound operations the radio platform must provide.
///
/// All calls are non-blocking requests; confirmations, where the
/// platform gives any, arrive later as [`PlatformEvent`]s. `push_value`
/// is the exception: the platform reports synchronously whether its
/// transmit queue accepted the update.
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Ask the platform to publish a service. The outcome arrives as
    /// [`PlatformEvent::ServiceAddResult`].
    async fn request_service_add(&self, service: &RegisteredService) -> Result<()>;

    /// Ask the platform to unpublish a service. No confirmation is
    /// delivered; removal is optimistic.
    async fn request_service_remove(&self, service_uuid: Uuid) -> Result<()>;

    /// Start advertising the given service identifiers, in order.
    async fn start_advertising(&self, service_uuids: &[Uuid]) -> Result<()>;

    /// Stop advertising. Safe to call in any state.
    async fn stop_advertising(&self) -> Result<()>;

    /// Push a characteristic value update. An empty `targets` slice
    /// addresses all subscribed centrals. Returns whether the transmit
    /// queue accepted the update.
    async fn push_value(
        &self,
        characteristic: CharacteristicHandle,
        data: &Bytes,
        targets: &[Central],
    ) -> Result<bool>;

    /// Answer an inbound ATT request. `value` carries the attribute
    /// value for read responses.
    async fn respond(
        &self,
        request_id: RequestId,
        result: AttResult,
        value: Option<Bytes>,
    ) -> Result<()>;
}
