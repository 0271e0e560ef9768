//! Tracks which centrals are subscribed to which characteristics

use std::collections::HashMap;

use crate::gatt::{Central, CentralId, CharacteristicHandle};

/// Relation characteristic -> set of subscribed centrals.
///
/// Membership only; no ordering is guaranteed. Empty subscription sets
/// are retained rather than pruned.
#[derive(Debug, Default)]
pub struct SubscriptionTracker {
    subscriptions: HashMap<CharacteristicHandle, Vec<Central>>,
}

impl SubscriptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a subscription. Any stale entry for the same central is
    /// removed first; the platform may reissue a subscription with a
    /// changed MTU for the same logical peer.
    pub fn subscribe(&mut self, characteristic: CharacteristicHandle, central: Central) {
        let centrals = self.subscriptions.entry(characteristic).or_default();
        centrals.retain(|c| c.id != central.id);
        centrals.push(central);
        log::debug!(
            "central {:?} subscribed to characteristic {:?} (mtu {})",
            central.id,
            characteristic,
            central.max_update_len
        );
    }

    /// Drop a central from a characteristic's subscriber set.
    pub fn unsubscribe(&mut self, characteristic: CharacteristicHandle, central: CentralId) {
        if let Some(centrals) = self.subscriptions.get_mut(&characteristic) {
            centrals.retain(|c| c.id != central);
        }
    }

    /// Current subscribers of a characteristic.
    pub fn subscribers(&self, characteristic: CharacteristicHandle) -> &[Central] {
        self.subscriptions
            .get(&characteristic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drop all entries for a characteristic, used when its service is
    /// removed.
    pub fn remove_characteristic(&mut self, characteristic: CharacteristicHandle) {
        self.subscriptions.remove(&characteristic);
    }

    pub fn clear(&mut self) {
        self.subscriptions.clear();
    }

    /// Snapshot of the subscriber map keyed by central id, for the
    /// observable view.
    pub fn snapshot(&self) -> HashMap<CharacteristicHandle, Vec<CentralId>> {
        self.subscriptions
            .iter()
            .map(|(handle, centrals)| (*handle, centrals.iter().map(|c| c.id).collect()))
            .collect()
    }
}
