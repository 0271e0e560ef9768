//! Top-level peripheral manager
//!
//! One serialized execution context per manager instance: application
//! calls and platform callbacks both enqueue commands into a single
//! tokio mpsc queue drained by one spawned loop task, so registry,
//! subscription and history mutations never interleave. Calls are
//! non-blocking; outcomes surface through the observable error slot and
//! the observable service/subscriber views.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use uuid::Uuid;

use crate::config::PeripheralConfig;
use crate::error::{Error, Result, StartAdvertisingError};
use crate::gatt::{
    requests, AdvertisingController, Central, CentralId, CharacteristicHandle, RegisteredService,
    Service, ServiceRegistry, SubscriptionTracker, ValueUpdateEngine,
};
use crate::platform::{PlatformAdapter, PlatformEvent, PowerState};

/// Commands processed by the serialized manager loop.
enum Command {
    AddService(Service),
    RemoveService(Uuid),
    StartAdvertising,
    StopAdvertising,
    UpdateValue {
        characteristic: CharacteristicHandle,
        data: Bytes,
        targets: Vec<Central>,
    },
    Platform(PlatformEvent),
    /// Scheduled error clear; fires only if the generation is unchanged.
    ClearError {
        generation: u64,
    },
    /// Round-trip marker so callers can await quiescence.
    Settle(oneshot::Sender<()>),
}

/// Cloneable sink the platform adapter uses to deliver callbacks into
/// the manager's serialized context.
#[derive(Clone)]
pub struct PlatformEventSink {
    commands: mpsc::UnboundedSender<Command>,
}

impl PlatformEventSink {
    /// Marshal a platform callback into the manager loop. Events sent
    /// after the manager is gone are dropped.
    pub fn send(&self, event: PlatformEvent) {
        if self.commands.send(Command::Platform(event)).is_err() {
            log::warn!("dropping platform event, manager task is gone");
        }
    }
}

/// Observable state snapshots maintained by the loop task.
#[derive(Debug, Default)]
struct SharedView {
    services: RwLock<Vec<RegisteredService>>,
    subscribers: RwLock<HashMap<CharacteristicHandle, Vec<CentralId>>>,
    power: RwLock<PowerState>,
    advertising: RwLock<bool>,
}

/// BLE peripheral-role service manager.
///
/// Owns the service registry, subscription tracker, value histories and
/// advertising state, all mutated by a single loop task. Dropping the
/// manager aborts the loop.
pub struct PeripheralManager {
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<SharedView>,
    error_rx: watch::Receiver<Option<Error>>,
    task: tokio::task::JoinHandle<()>,
}

impl PeripheralManager {
    /// Create a manager driving the given platform adapter. Validates
    /// the configuration and spawns the serialized loop task.
    pub fn new(adapter: Arc<dyn PlatformAdapter>, config: PeripheralConfig) -> Result<Self> {
        config.validate()?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (error_tx, error_rx) = watch::channel(None);
        let shared = Arc::new(SharedView::default());

        let driver = ManagerLoop {
            adapter,
            registry: ServiceRegistry::new(),
            subscriptions: SubscriptionTracker::new(),
            values: ValueUpdateEngine::new(config.history_limit, config.default_max_payload),
            advertiser: AdvertisingController::new(),
            power: PowerState::Unknown,
            error_tx,
            error_generation: 0,
            commands: command_tx.clone(),
            shared: shared.clone(),
            config,
        };
        let task = tokio::spawn(driver.run(command_rx));

        Ok(Self {
            commands: command_tx,
            shared,
            error_rx,
            task,
        })
    }

    /// Sink for the platform adapter's inbound callbacks.
    pub fn event_sink(&self) -> PlatformEventSink {
        PlatformEventSink {
            commands: self.commands.clone(),
        }
    }

    /// Submit a service for registration. Non-blocking; the service
    /// becomes visible in [`registered_services`](Self::registered_services)
    /// once the platform acknowledges it, and failures surface through
    /// the error slot.
    pub fn add_service(&self, service: Service) -> Result<()> {
        self.send(Command::AddService(service))
    }

    /// Request removal of a registered service. Optimistic: the local
    /// set is updated without awaiting platform confirmation.
    pub fn remove_service(&self, service_uuid: Uuid) -> Result<()> {
        self.send(Command::RemoveService(service_uuid))
    }

    /// Start advertising all registered service identifiers.
    pub fn start_advertising(&self) -> Result<()> {
        self.send(Command::StartAdvertising)
    }

    /// Stop advertising. Idempotent.
    pub fn stop_advertising(&self) -> Result<()> {
        self.send(Command::StopAdvertising)
    }

    /// Push a characteristic value update to the addressed centrals, or
    /// to all subscribed centrals when `targets` is empty.
    pub fn update_value(
        &self,
        characteristic: CharacteristicHandle,
        data: impl Into<Bytes>,
        targets: Vec<Central>,
    ) -> Result<()> {
        self.send(Command::UpdateValue {
            characteristic,
            data: data.into(),
            targets,
        })
    }

    /// Wait until every command enqueued before this call has been
    /// applied, including any follow-up command those handlers fed back
    /// into the queue (a platform acknowledgment delivered inline, for
    /// example).
    pub async fn settle(&self) -> Result<()> {
        for _ in 0..2 {
            let (tx, rx) = oneshot::channel();
            self.send(Command::Settle(tx))?;
            rx.await.map_err(|_| Error::InvalidManager)?;
        }
        Ok(())
    }

    /// Observable single-slot error channel. Holds the most recent
    /// failure until it auto-clears.
    pub fn errors(&self) -> watch::Receiver<Option<Error>> {
        self.error_rx.clone()
    }

    /// Most recent failure, if it has not auto-cleared yet.
    pub fn current_error(&self) -> Option<Error> {
        self.error_rx.borrow().clone()
    }

    /// Snapshot of the registered services, in registration order.
    pub async fn registered_services(&self) -> Vec<RegisteredService> {
        self.shared.services.read().await.clone()
    }

    /// Snapshot of the subscriber map.
    pub async fn subscribers(&self) -> HashMap<CharacteristicHandle, Vec<CentralId>> {
        self.shared.subscribers.read().await.clone()
    }

    pub async fn power_state(&self) -> PowerState {
        *self.shared.power.read().await
    }

    pub async fn is_advertising(&self) -> bool {
        *self.shared.advertising.read().await
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::InvalidManager)
    }
}

impl Drop for PeripheralManager {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// State owned exclusively by the loop task.
struct ManagerLoop {
    adapter: Arc<dyn PlatformAdapter>,
    registry: ServiceRegistry,
    subscriptions: SubscriptionTracker,
    values: ValueUpdateEngine,
    advertiser: AdvertisingController,
    power: PowerState,
    error_tx: watch::Sender<Option<Error>>,
    /// Monotonic counter guarding scheduled error clears: a clear fires
    /// only if no newer error was set since it was scheduled.
    error_generation: u64,
    commands: mpsc::UnboundedSender<Command>,
    shared: Arc<SharedView>,
    config: PeripheralConfig,
}

impl ManagerLoop {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command).await;
        }
        log::debug!("peripheral manager loop exited");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::AddService(service) => self.add_service(service).await,
            Command::RemoveService(uuid) => self.remove_service(uuid).await,
            Command::StartAdvertising => self.start_advertising().await,
            Command::StopAdvertising => self.stop_advertising().await,
            Command::UpdateValue {
                characteristic,
                data,
                targets,
            } => self.update_value(characteristic, data, targets).await,
            Command::Platform(event) => self.platform_event(event).await,
            Command::ClearError { generation } => {
                if generation == self.error_generation {
                    let _ = self.error_tx.send(None);
                }
            }
            Command::Settle(tx) => {
                let _ = tx.send(());
            }
        }
    }

    async fn add_service(&mut self, service: Service) {
        if !self.require_powered_on() {
            return;
        }

        let uuid = service.uuid;
        match self.registry.begin_register(service) {
            Ok(staged) => {
                log::info!("requesting platform add for service {}", uuid);
                if let Err(e) = self.adapter.request_service_add(&staged).await {
                    self.registry.abort(uuid);
                    self.report(Error::AddService(crate::error::AddServiceError::Platform(
                        e.to_string(),
                    )));
                }
            }
            Err(err) => self.report(Error::AddService(err)),
        }
    }

    async fn remove_service(&mut self, uuid: Uuid) {
        if !self.require_powered_on() {
            return;
        }

        match self.registry.remove(uuid) {
            Ok(removed) => {
                for handle in &removed.handles {
                    self.subscriptions.remove_characteristic(*handle);
                    self.values.drop_characteristic(*handle);
                }
                self.publish_services().await;
                self.publish_subscribers().await;

                // Optimistic: no platform confirmation is awaited.
                if let Err(e) = self.adapter.request_service_remove(uuid).await {
                    self.report(Error::RemoveService(
                        crate::error::RemoveServiceError::Platform(e.to_string()),
                    ));
                }
            }
            Err(err) => self.report(Error::RemoveService(err)),
        }
    }

    async fn start_advertising(&mut self) {
        if !self.require_powered_on() {
            return;
        }

        let uuids = self.registry.service_uuids();
        match self.advertiser.start(&*self.adapter, uuids).await {
            Ok(()) => self.publish_advertising().await,
            Err(err) => self.report(Error::StartAdvertising(err)),
        }
    }

    async fn stop_advertising(&mut self) {
        if let Err(e) = self.advertiser.stop(&*self.adapter).await {
            log::warn!("platform stop-advertising failed: {}", e);
        }
        self.publish_advertising().await;
    }

    async fn update_value(
        &mut self,
        characteristic: CharacteristicHandle,
        data: Bytes,
        targets: Vec<Central>,
    ) {
        if !self.require_powered_on() {
            return;
        }

        if self.registry.characteristic(characteristic).is_none() {
            self.report(Error::UpdateValue(
                crate::error::UpdateValueError::UnknownCharacteristic,
            ));
            return;
        }

        if let Err(err) = self
            .values
            .update_value(&*self.adapter, characteristic, data, &targets)
            .await
        {
            self.report(Error::UpdateValue(err));
        }
    }

    async fn platform_event(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::StateChanged { state } => self.state_changed(state).await,
            PlatformEvent::ServiceAddResult {
                service_uuid,
                error,
            } => match error {
                None => {
                    self.registry.commit(service_uuid);
                    self.publish_services().await;
                }
                Some(reason) => {
                    self.registry.abort(service_uuid);
                    self.report(Error::AddService(crate::error::AddServiceError::Platform(
                        reason,
                    )));
                }
            },
            PlatformEvent::AdvertisingStarted { error } => {
                if let Some(reason) = error {
                    self.advertiser.on_start_failed();
                    self.publish_advertising().await;
                    self.report(Error::StartAdvertising(StartAdvertisingError::Platform(
                        reason,
                    )));
                }
            }
            PlatformEvent::CentralSubscribed {
                central,
                characteristic,
            } => {
                self.subscriptions.subscribe(characteristic, central);
                self.publish_subscribers().await;
            }
            PlatformEvent::CentralUnsubscribed {
                central,
                characteristic,
            } => {
                self.subscriptions.unsubscribe(characteristic, central);
                self.publish_subscribers().await;
            }
            PlatformEvent::ReadRequested {
                request_id,
                characteristic,
                ..
            } => {
                if let Err(e) = requests::handle_read_request(
                    &*self.adapter,
                    &self.registry,
                    &self.values,
                    request_id,
                    characteristic,
                )
                .await
                {
                    log::error!("failed to answer read request {}: {}", request_id, e);
                }
            }
            PlatformEvent::WriteRequested { requests: batch } => {
                if let Err(err) =
                    requests::handle_write_batch(&*self.adapter, &mut self.values, &batch).await
                {
                    self.report(err);
                }
            }
            PlatformEvent::StateRestored { services } => self.restore_state(services).await,
        }
    }

    async fn state_changed(&mut self, state: PowerState) {
        log::info!("radio power state changed to {:?}", state);
        self.power = state;
        *self.shared.power.write().await = state;

        if state != PowerState::PoweredOn {
            if self.advertiser.is_advertising() {
                if let Err(e) = self.advertiser.stop(&*self.adapter).await {
                    log::warn!("implicit advertising stop failed: {}", e);
                }
                self.publish_advertising().await;
            }
            self.report(Error::BluetoothUnavailable);
        }
    }

    /// Atomically replace the registry from platform-supplied state and
    /// rebuild the subscription tracker from the reported subscribers.
    async fn restore_state(&mut self, services: Vec<crate::platform::RestoredService>) {
        self.subscriptions.clear();
        self.values.reset();

        let mut registered = Vec::with_capacity(services.len());
        for restored in services {
            for (handle, centrals) in restored.subscribers {
                for central in centrals {
                    self.subscriptions.subscribe(handle, central);
                }
            }
            registered.push(restored.service);
        }
        self.registry.restore(registered);

        self.publish_services().await;
        self.publish_subscribers().await;
    }

    fn require_powered_on(&mut self) -> bool {
        if self.power != PowerState::PoweredOn {
            self.report(Error::BluetoothUnavailable);
            return false;
        }
        true
    }

    /// Put an error in the slot and schedule its auto-clear. A newer
    /// error bumps the generation so the stale timer no-ops.
    fn report(&mut self, error: Error) {
        log::warn!("peripheral error: {}", error);
        self.error_generation += 1;
        let generation = self.error_generation;
        let _ = self.error_tx.send(Some(error));

        let commands = self.commands.clone();
        let delay = self.config.error_clear_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(Command::ClearError { generation });
        });
    }

    async fn publish_services(&self) {
        *self.shared.services.write().await = self.registry.services().to_vec();
    }

    async fn publish_subscribers(&self) {
        *self.shared.subscribers.write().await = self.subscriptions.snapshot();
    }

    async fn publish_advertising(&self) {
        *self.shared.advertising.write().await = self.advertiser.is_advertising();
    }
}
