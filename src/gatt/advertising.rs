//! Advertising state control
//!
//! The payload is the ordered list of registered service identifiers;
//! no device name field is included. Power gating is handled by the
//! manager, which also forces an implicit stop when the radio leaves
//! the powered-on state.

use uuid::Uuid;

use crate::error::{Result, StartAdvertisingError};
use crate::platform::PlatformAdapter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvertisingState {
    #[default]
    Idle,
    Advertising,
}

#[derive(Debug, Default)]
pub struct AdvertisingController {
    state: AdvertisingState,
}

impl AdvertisingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AdvertisingState {
        self.state
    }

    pub fn is_advertising(&self) -> bool {
        self.state == AdvertisingState::Advertising
    }

    /// Start advertising the given service identifiers.
    ///
    /// Requires at least one registered service. The platform confirms
    /// asynchronously; a failure reported later returns the controller
    /// to idle via [`AdvertisingController::on_start_failed`].
    pub async fn start(
        &mut self,
        adapter: &dyn PlatformAdapter,
        service_uuids: Vec<Uuid>,
    ) -> Result<(), StartAdvertisingError> {
        if service_uuids.is_empty() {
            return Err(StartAdvertisingError::NoServices);
        }

        adapter
            .start_advertising(&service_uuids)
            .await
            .map_err(|e| StartAdvertisingError::Platform(e.to_string()))?;

        log::info!("advertising {} services", service_uuids.len());
        self.state = AdvertisingState::Advertising;
        Ok(())
    }

    /// Stop advertising. Idempotent in any state.
    pub async fn stop(&mut self, adapter: &dyn PlatformAdapter) -> Result<()> {
        adapter.stop_advertising().await?;
        if self.is_advertising() {
            log::info!("advertising stopped");
        }
        self.state = AdvertisingState::Idle;
        Ok(())
    }

    /// The platform reported an advertising start failure.
    pub fn on_start_failed(&mut self) {
        self.state = AdvertisingState::Idle;
    }
}
