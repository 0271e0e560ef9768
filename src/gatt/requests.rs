//! Inbound ATT request handling
//!
//! Every read and write request is answered; an unanswered request
//! violates the host protocol contract.

use bytes::{Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::gatt::registry::ServiceRegistry;
use crate::gatt::values::ValueUpdateEngine;
use crate::gatt::CharacteristicHandle;
use crate::platform::{AttResult, PlatformAdapter, RequestId, WriteRequest};

/// Answer a read request with the most recent history entry for the
/// characteristic, falling back to its static cached value, then to an
/// empty payload.
pub async fn handle_read_request(
    adapter: &dyn PlatformAdapter,
    registry: &ServiceRegistry,
    values: &ValueUpdateEngine,
    request_id: RequestId,
    characteristic: CharacteristicHandle,
) -> Result<()> {
    let payload = values
        .latest(characteristic)
        .or_else(|| {
            registry
                .characteristic(characteristic)
                .and_then(|c| c.cached_value.clone())
        })
        .unwrap_or_else(Bytes::new);

    log::debug!(
        "answering read request {} on {:?} with {} bytes",
        request_id,
        characteristic,
        payload.len()
    );
    adapter
        .respond(request_id, AttResult::Success, Some(payload))
        .await
}

/// Handle a queued-write batch for one characteristic.
///
/// The payloads are concatenated after applying each request's declared
/// byte offset, then recorded as a single local-only value update (no
/// target centrals). The batch succeeds or fails as a unit: the first
/// request receives a success response, or an invalid-handle failure
/// when the update is rejected.
pub async fn handle_write_batch(
    adapter: &dyn PlatformAdapter,
    values: &mut ValueUpdateEngine,
    requests: &[WriteRequest],
) -> Result<()> {
    let Some(first) = requests.first() else {
        return Ok(());
    };

    let mut buffer = BytesMut::new();
    for request in requests {
        let skip = request.offset.min(request.value.len());
        buffer.extend_from_slice(&request.value[skip..]);
    }

    match values
        .update_value(adapter, first.characteristic, buffer.freeze(), &[])
        .await
    {
        Ok(()) => {
            adapter
                .respond(first.request_id, AttResult::Success, None)
                .await
        }
        Err(err) => {
            log::warn!(
                "write batch on {:?} rejected: {}",
                first.characteristic,
                err
            );
            adapter
                .respond(first.request_id, AttResult::InvalidHandle, None)
                .await?;
            Err(Error::UpdateValue(err))
        }
    }
}
