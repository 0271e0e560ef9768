//! Service registry with atomic registration and included-service tracking
//!
//! The registry owns the set of registered services and acts as the handle
//! arena: every characteristic of an adopted service gets a monotonically
//! increasing handle that the platform uses in all later callbacks.
//!
//! Registration is two-phase. `begin_register` validates and stages the
//! service; the manager issues the platform add-request and then either
//! `commit`s on acknowledgment or `abort`s on platform failure. A staged
//! service is not yet visible to included-service checks or advertising.

use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AddServiceError, RemoveServiceError};
use crate::gatt::validator::validate_characteristic;
use crate::gatt::{Characteristic, CharacteristicHandle, RegisteredService, Service};

#[derive(Debug, Default)]
pub struct ServiceRegistry {
    /// Registration order is preserved; the advertising payload follows it.
    registered: Vec<RegisteredService>,
    /// Services awaiting platform acknowledgment.
    pending: HashMap<Uuid, RegisteredService>,
    next_handle: u64,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `service` and stage it for platform registration.
    ///
    /// The whole service is accepted or rejected as a unit: the first
    /// failing characteristic rejects the registration and nothing is
    /// staged.
    pub fn begin_register(
        &mut self,
        service: Service,
    ) -> Result<RegisteredService, AddServiceError> {
        if self.contains(service.uuid) || self.pending.contains_key(&service.uuid) {
            return Err(AddServiceError::DuplicateService);
        }

        for included in &service.included_services {
            if !self.contains(*included) {
                return Err(AddServiceError::MissingIncludedService);
            }
        }

        for characteristic in &service.characteristics {
            validate_characteristic(characteristic)?;
        }

        let handles = self.issue_handles(service.characteristics.len());
        let registered = RegisteredService { service, handles };
        self.pending
            .insert(registered.service.uuid, registered.clone());
        Ok(registered)
    }

    /// Commit a staged service after the platform acknowledged it.
    pub fn commit(&mut self, uuid: Uuid) -> bool {
        match self.pending.remove(&uuid) {
            Some(registered) => {
                log::debug!("service {} committed to registry", uuid);
                self.registered.push(registered);
                true
            }
            None => false,
        }
    }

    /// Drop a staged service after the platform rejected it.
    pub fn abort(&mut self, uuid: Uuid) -> bool {
        self.pending.remove(&uuid).is_some()
    }

    /// Remove a registered service.
    ///
    /// Fails while any other registered or staged service includes it; a
    /// staged includer would otherwise commit against an absent included
    /// service. The platform remove-request is issued by the caller
    /// afterwards, optimistically.
    pub fn remove(&mut self, uuid: Uuid) -> Result<RegisteredService, RemoveServiceError> {
        let idx = self
            .registered
            .iter()
            .position(|r| r.service.uuid == uuid)
            .ok_or(RemoveServiceError::NotRegistered)?;

        let included_elsewhere = self
            .registered
            .iter()
            .chain(self.pending.values())
            .any(|r| r.service.uuid != uuid && r.service.included_services.contains(&uuid));
        if included_elsewhere {
            return Err(RemoveServiceError::IncludedElsewhere);
        }

        Ok(self.registered.remove(idx))
    }

    /// Atomically replace the registered set with platform-supplied
    /// services, used after process relaunch. Staged registrations are
    /// discarded and the handle arena resumes past the restored handles.
    pub fn restore(&mut self, services: Vec<RegisteredService>) {
        let highest = services
            .iter()
            .flat_map(|r| r.handles.iter())
            .map(|h| h.0)
            .max()
            .unwrap_or(0);
        self.next_handle = self.next_handle.max(highest + 1);
        self.pending.clear();
        self.registered = services;
        log::info!("registry restored with {} services", self.registered.len());
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.registered.iter().any(|r| r.service.uuid == uuid)
    }

    pub fn services(&self) -> &[RegisteredService] {
        &self.registered
    }

    /// Identifiers of all registered services, in registration order.
    pub fn service_uuids(&self) -> Vec<Uuid> {
        self.registered.iter().map(|r| r.service.uuid).collect()
    }

    /// Look up a characteristic by handle across all registered services.
    pub fn characteristic(&self, handle: CharacteristicHandle) -> Option<&Characteristic> {
        self.registered
            .iter()
            .find_map(|r| r.characteristic(handle))
    }

    pub fn len(&self) -> usize {
        self.registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.is_empty()
    }

    fn issue_handles(&mut self, count: usize) -> Vec<CharacteristicHandle> {
        (0..count)
            .map(|_| {
                let handle = CharacteristicHandle(self.next_handle);
                self.next_handle += 1;
                handle
            })
            .collect()
    }
}
