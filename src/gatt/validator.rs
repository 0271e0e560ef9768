//! Pure characteristic validation rules
//!
//! The platform aborts the process on malformed characteristics, so every
//! rule here is checked locally before any platform call is issued.

use crate::error::ValidationError;
use crate::gatt::{Characteristic, Permissions, Properties};

/// Validate a single characteristic against composition rules.
///
/// Checks run in order and short-circuit on the first failure:
/// 1. A characteristic with a cached value must be exactly read-only.
/// 2. `read` requires the readable permission; `write` and
///    `write_without_response` require the writeable permission.
/// 3. `broadcast` and `extended_properties` are never permitted on a
///    local peripheral service.
pub fn validate_characteristic(characteristic: &Characteristic) -> Result<(), ValidationError> {
    if characteristic.cached_value.is_some()
        && (characteristic.properties != Properties::read_only()
            || characteristic.permissions != Permissions::read_only())
    {
        return Err(ValidationError::CachedValueNotReadOnly);
    }

    let props = characteristic.properties;
    let perms = characteristic.permissions;
    if (props.read && !perms.readable)
        || ((props.write || props.write_without_response) && !perms.writeable)
    {
        return Err(ValidationError::PermissionMismatch);
    }

    if props.broadcast || props.extended_properties {
        return Err(ValidationError::UnsupportedProperties);
    }

    Ok(())
}
