use crate::import::constants::{
    DELIVERY_ADDRESS_TYPE_DOES_NOT_EXIST, DELIVERY_ADDRESS_TYPE_MUST_BE_NOT_SPECIFIED,
    DELIVERY_ADDRESS_TYPE_NOT_IN_USER_ADDRESSES, FULFILLMENT_MUST_BE_NOT_SPECIFIED,
    FULFILLMENT_MUST_NOT_BE_NULL, HOLD_SHELF_MUST_BE_SET, SERVICE_POINT_DOES_NOT_EXIST,
};
use crate::import::reference::ReferenceTables;
use crate::models::{IncomingUser, RequestPreference};

/// Check a request preference against the record it belongs to.
///
/// Returns the first violation found.
pub fn validate_request_preference(
    preference: &RequestPreference,
    user: &IncomingUser,
    tables: &ReferenceTables,
) -> Result<(), &'static str> {
    if preference.hold_shelf != Some(true) {
        return Err(HOLD_SHELF_MUST_BE_SET);
    }

    if preference.delivery == Some(true) {
        if preference.fulfillment.is_none() {
            return Err(FULFILLMENT_MUST_NOT_BE_NULL);
        }
        let address_type = preference
            .default_delivery_address_type_id
            .as_deref()
            .and_then(|value| tables.address_types.resolve(value))
            .ok_or(DELIVERY_ADDRESS_TYPE_DOES_NOT_EXIST)?;
        let on_record = user
            .addresses()
            .iter()
            .filter_map(|address| address.address_type_id.as_deref())
            .filter_map(|value| tables.address_types.resolve(value))
            .any(|id| id == address_type);
        if !on_record {
            return Err(DELIVERY_ADDRESS_TYPE_NOT_IN_USER_ADDRESSES);
        }
    } else {
        if preference.fulfillment.is_some() {
            return Err(FULFILLMENT_MUST_BE_NOT_SPECIFIED);
        }
        if preference.default_delivery_address_type_id.is_some() {
            return Err(DELIVERY_ADDRESS_TYPE_MUST_BE_NOT_SPECIFIED);
        }
    }

    if let Some(service_point) = preference.default_service_point_id.as_deref() {
        if !tables.service_points.contains(service_point) {
            return Err(SERVICE_POINT_DOES_NOT_EXIST);
        }
    }

    Ok(())
}
