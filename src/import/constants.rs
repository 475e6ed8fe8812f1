//! User-facing messages produced by the import engine

pub const NO_USERS_TO_IMPORT: &str = "No users to import.";
pub const USERS_WERE_IMPORTED_SUCCESSFULLY: &str = "Users were imported successfully.";
pub const FAILED_TO_IMPORT_USERS: &str = "Failed to import users.";
pub const ERROR_MESSAGE: &str = " Error message: ";

pub const DEACTIVATED_MISSING_USERS: &str = "Deactivated missing users.";
pub const USER_DEACTIVATION_SKIPPED: &str =
    "Users were not deactivated because of some failures around user creation/update.";

pub const FAILED_TO_LIST_PATRON_GROUPS: &str = "Failed to list patron groups.";
pub const FAILED_TO_LIST_ADDRESS_TYPES: &str = "Failed to list address types.";
pub const FAILED_TO_LIST_SERVICE_POINTS: &str = "Failed to list service points.";
pub const FAILED_TO_LIST_DEPARTMENTS: &str = "Failed to list departments.";
pub const FAILED_TO_LIST_CUSTOM_FIELDS: &str = "Failed to list custom fields.";
pub const FAILED_TO_SAVE_DEPARTMENTS: &str = "Failed to save departments.";
pub const FAILED_TO_UPDATE_CUSTOM_FIELDS: &str = "Failed to update custom fields.";

pub const FAILED_TO_PROCESS_USER_SEARCH_RESULT: &str = "Failed to process user search result.";
pub const FAILED_TO_PROCESS_USER_SEARCH_RESPONSE: &str =
    "Failed to process user search response.";
pub const FAILED_TO_CREATE_NEW_USER_WITH_EXTERNAL_SYSTEM_ID: &str =
    "Failed to create new user with externalSystemId: ";
pub const FAILED_TO_UPDATE_USER_WITH_EXTERNAL_SYSTEM_ID: &str =
    "Failed to update user with externalSystemId: ";

pub const PATRON_GROUP_DOES_NOT_EXIST: &str = "Patron group does not exist in the system: ";
pub const DEPARTMENTS_DO_NOT_EXIST: &str = "Departments do not exist in the system: ";
pub const CUSTOM_FIELDS_DO_NOT_EXIST: &str = "Custom fields do not exist in the system: ";
pub const CUSTOM_FIELD_OPTIONS_DO_NOT_EXIST: &str =
    "Custom field's options do not exist in the system: ";
pub const ONLY_ONE_PRIMARY_ADDRESS: &str = "Only one address can be primary";

pub const FAILED_USER_PREFERENCE_VALIDATION: &str = "User preference validation failed: ";
pub const HOLD_SHELF_MUST_BE_SET: &str = "holdShelf must be set";
pub const FULFILLMENT_MUST_BE_NOT_SPECIFIED: &str = "fulfillment must be not specified";
pub const FULFILLMENT_MUST_NOT_BE_NULL: &str = "fulfillment must not be null";
pub const DELIVERY_ADDRESS_TYPE_MUST_BE_NOT_SPECIFIED: &str =
    "defaultDeliveryAddressTypeId must be not specified";
pub const DELIVERY_ADDRESS_TYPE_DOES_NOT_EXIST: &str =
    "Provided defaultDeliveryAddressTypeId value does not exist";
pub const DELIVERY_ADDRESS_TYPE_NOT_IN_USER_ADDRESSES: &str =
    "Provided defaultDeliveryAddressTypeId value does not exist in user addresses collection";
pub const SERVICE_POINT_DOES_NOT_EXIST: &str =
    "Provided defaultServicePointId value does not exist";
