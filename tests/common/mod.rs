//! Shared mock platform adapter for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use gatt_peripheral::{
    AttResult, Central, CentralId, Characteristic, CharacteristicHandle, Permissions,
    PlatformAdapter, PlatformEvent, PlatformEventSink, Properties, RegisteredService, RequestId,
    Result, Service,
};

/// Mock radio adapter recording every outbound call.
///
/// When connected to a manager's event sink it acknowledges service
/// add-requests the way the real platform would, either successfully or
/// with the configured failure reason.
#[derive(Default)]
pub struct MockAdapter {
    sink: Mutex<Option<PlatformEventSink>>,
    pub add_requests: Mutex<Vec<Uuid>>,
    pub remove_requests: Mutex<Vec<Uuid>>,
    pub advertising_starts: Mutex<Vec<Vec<Uuid>>>,
    pub advertising_stops: Mutex<Vec<()>>,
    pub pushes: Mutex<Vec<(CharacteristicHandle, Bytes, Vec<CentralId>)>>,
    pub responses: Mutex<Vec<(RequestId, AttResult, Option<Bytes>)>>,
    pub reject_pushes: AtomicBool,
    pub fail_add_with: Mutex<Option<String>>,
    /// When set, add-requests are recorded but never acknowledged,
    /// leaving the service staged.
    pub suppress_add_ack: AtomicBool,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire the adapter to a manager so add-requests are acknowledged.
    pub fn connect(&self, sink: PlatformEventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn last_response(&self) -> Option<(RequestId, AttResult, Option<Bytes>)> {
        self.responses.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PlatformAdapter for MockAdapter {
    async fn request_service_add(&self, service: &RegisteredService) -> Result<()> {
        self.add_requests.lock().unwrap().push(service.service.uuid);
        if self.suppress_add_ack.load(Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink.send(PlatformEvent::ServiceAddResult {
                service_uuid: service.service.uuid,
                error: self.fail_add_with.lock().unwrap().clone(),
            });
        }
        Ok(())
    }

    async fn request_service_remove(&self, service_uuid: Uuid) -> Result<()> {
        self.remove_requests.lock().unwrap().push(service_uuid);
        Ok(())
    }

    async fn start_advertising(&self, service_uuids: &[Uuid]) -> Result<()> {
        self.advertising_starts
            .lock()
            .unwrap()
            .push(service_uuids.to_vec());
        Ok(())
    }

    async fn stop_advertising(&self) -> Result<()> {
        self.advertising_stops.lock().unwrap().push(());
        Ok(())
    }

    async fn push_value(
        &self,
        characteristic: CharacteristicHandle,
        data: &Bytes,
        targets: &[Central],
    ) -> Result<bool> {
        if self.reject_pushes.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.pushes.lock().unwrap().push((
            characteristic,
            data.clone(),
            targets.iter().map(|c| c.id).collect(),
        ));
        Ok(true)
    }

    async fn respond(
        &self,
        request_id: RequestId,
        result: AttResult,
        value: Option<Bytes>,
    ) -> Result<()> {
        self.responses
            .lock()
            .unwrap()
            .push((request_id, result, value));
        Ok(())
    }
}

/// Initialize test logging; repeated calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A service with one readable, notifiable characteristic.
pub fn notify_service(uuid: Uuid) -> Service {
    Service::new(uuid).add_characteristic(Characteristic::new(
        Uuid::new_v4(),
        Properties {
            read: true,
            notify: true,
            ..Default::default()
        },
        Permissions::read_only(),
    ))
}

pub fn central(id: u64, max_update_len: usize) -> Central {
    Central::new(CentralId(id), max_update_len)
}
