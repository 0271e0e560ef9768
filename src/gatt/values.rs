//! MTU-aware value updates with bounded per-characteristic history
//!
//! The platform push primitive gives no size feedback, so payload length
//! is checked against the effective MTU before any platform call. Each
//! accepted value is prepended to the characteristic's history, which is
//! bounded to a configured length.

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};

use crate::error::UpdateValueError;
use crate::gatt::{Central, CharacteristicHandle};
use crate::platform::PlatformAdapter;

/// Ordered sequence of previously accepted values, most-recent-first.
#[derive(Debug)]
pub struct ValueHistory {
    entries: VecDeque<Bytes>,
    limit: usize,
}

impl ValueHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit.min(64)),
            limit,
        }
    }

    /// Prepend a newly accepted value, trimming the oldest entries past
    /// the configured limit.
    pub fn record(&mut self, value: Bytes) {
        self.entries.push_front(value);
        self.entries.truncate(self.limit);
    }

    pub fn latest(&self) -> Option<&Bytes> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.entries.iter()
    }
}

/// Pushes characteristic value updates and maintains their histories.
#[derive(Debug)]
pub struct ValueUpdateEngine {
    histories: HashMap<CharacteristicHandle, ValueHistory>,
    history_limit: usize,
    default_max_payload: usize,
}

impl ValueUpdateEngine {
    pub fn new(history_limit: usize, default_max_payload: usize) -> Self {
        Self {
            histories: HashMap::new(),
            history_limit,
            default_max_payload,
        }
    }

    /// Effective MTU for an update: the configured default when no
    /// centrals are addressed, otherwise the minimum negotiated MTU
    /// among the targets.
    pub fn effective_mtu(&self, targets: &[Central]) -> usize {
        targets
            .iter()
            .map(|c| c.max_update_len)
            .min()
            .unwrap_or(self.default_max_payload)
    }

    /// Push `data` as the new value of `characteristic`.
    ///
    /// Fails with `PayloadTooLarge` before any platform call when the
    /// payload exceeds the effective MTU. On platform acceptance the
    /// value is recorded in history; on transmit-queue rejection nothing
    /// is recorded and the caller may retry.
    pub async fn update_value(
        &mut self,
        adapter: &dyn PlatformAdapter,
        characteristic: CharacteristicHandle,
        data: Bytes,
        targets: &[Central],
    ) -> Result<(), UpdateValueError> {
        let mtu = self.effective_mtu(targets);
        if data.len() > mtu {
            return Err(UpdateValueError::PayloadTooLarge {
                len: data.len(),
                mtu,
            });
        }

        let accepted = adapter
            .push_value(characteristic, &data, targets)
            .await
            .map_err(|e| UpdateValueError::Platform(e.to_string()))?;

        if !accepted {
            return Err(UpdateValueError::TransmitQueueFull);
        }

        log::debug!(
            "recorded {} byte value for characteristic {:?}",
            data.len(),
            characteristic
        );
        self.histories
            .entry(characteristic)
            .or_insert_with(|| ValueHistory::new(self.history_limit))
            .record(data);
        Ok(())
    }

    /// Most recent accepted value for a characteristic, if any.
    pub fn latest(&self, characteristic: CharacteristicHandle) -> Option<Bytes> {
        self.histories
            .get(&characteristic)
            .and_then(|h| h.latest())
            .cloned()
    }

    pub fn history(&self, characteristic: CharacteristicHandle) -> Option<&ValueHistory> {
        self.histories.get(&characteristic)
    }

    /// Drop a characteristic's history, used when its service is removed.
    pub fn drop_characteristic(&mut self, characteristic: CharacteristicHandle) {
        self.histories.remove(&characteristic);
    }

    /// Drop all histories, used when the registry is restored wholesale.
    pub fn reset(&mut self) {
        self.histories.clear();
    }
}
