use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Deserialize a string that may be missing or `null` into an empty string.
///
/// Required identifiers are checked for emptiness by the structural validator,
/// so `null` and absence collapse into the same state here.
fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Batch of user records submitted for reconciliation
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    #[serde(default)]
    pub users: Vec<IncomingUser>,
    /// Declared record count. Falls back to the number of supplied users when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_records: Option<usize>,
    #[serde(default)]
    pub deactivate_missing_users: bool,
    #[serde(default)]
    pub update_only_present_fields: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<IncludedObjects>,
}

impl ImportBatch {
    pub fn new(users: Vec<IncomingUser>) -> Self {
        Self {
            total_records: Some(users.len()),
            users,
            ..Default::default()
        }
    }

    pub fn declared_total(&self) -> usize {
        self.total_records.unwrap_or(self.users.len())
    }

    pub fn included_departments(&self) -> &[IncludedDepartment] {
        self.included
            .as_ref()
            .map(|included| included.departments.as_slice())
            .unwrap_or_default()
    }

    pub fn included_custom_fields(&self) -> &[CustomFieldDefinition] {
        self.included
            .as_ref()
            .map(|included| included.custom_fields.as_slice())
            .unwrap_or_default()
    }
}

/// Reference entities supplied inline with a batch
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IncludedObjects {
    #[serde(default)]
    pub departments: Vec<IncludedDepartment>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldDefinition>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IncludedDepartment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A user record as received from the external source of truth
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct IncomingUser {
    #[serde(default, deserialize_with = "nullable_string")]
    pub external_system_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Patron group name or id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patron_group: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_preference: Option<RequestPreference>,
    /// Department names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departments: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<BTreeMap<String, CustomFieldValue>>,
}

impl IncomingUser {
    pub fn new(external_system_id: &str, username: &str) -> Self {
        Self {
            external_system_id: external_system_id.to_string(),
            username: username.to_string(),
            ..Default::default()
        }
    }

    pub fn addresses(&self) -> &[Address] {
        self.personal
            .as_ref()
            .and_then(|personal| personal.addresses.as_deref())
            .unwrap_or_default()
    }
}

/// Personal information shared by incoming records and directory accounts
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_contact_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addresses: Option<Vec<Address>>,
    // Fields the import schema does not model survive round trips untouched
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// Address type id, or a type name on incoming records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_address: Option<bool>,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl Address {
    pub fn is_primary(&self) -> bool {
        self.primary_address == Some(true)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fulfillment {
    #[serde(rename = "Delivery")]
    Delivery,
    #[serde(rename = "Hold Shelf")]
    HoldShelf,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestPreference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hold_shelf: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_service_point_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_delivery_address_type_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fulfillment: Option<Fulfillment>,
}

/// A custom field value: one option/text value or a list of option values
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CustomFieldValue {
    Multiple(Vec<String>),
    Single(String),
    Other(Value),
}

impl CustomFieldValue {
    /// String values carried by this entry, in input order
    pub fn values(&self) -> Vec<&str> {
        match self {
            CustomFieldValue::Multiple(values) => values.iter().map(String::as_str).collect(),
            CustomFieldValue::Single(value) => vec![value.as_str()],
            CustomFieldValue::Other(_) => Vec::new(),
        }
    }
}

/// The persisted account as owned by the user directory
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_system_id: Option<String>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Patron group id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patron_group: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrollment_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_preference: Option<RequestPreference>,
    /// Department ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departments: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl DirectoryUser {
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }

    pub fn addresses(&self) -> &[Address] {
        self.personal
            .as_ref()
            .and_then(|personal| personal.addresses.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PatronGroup {
    pub id: String,
    #[serde(rename = "group")]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AddressType {
    pub id: String,
    #[serde(rename = "addressType")]
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ServicePoint {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Department {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomFieldType {
    SingleCheckbox,
    TextboxShort,
    TextboxLong,
    SingleSelectDropdown,
    MultiSelectDropdown,
    RadioButton,
    DatePicker,
}

impl CustomFieldType {
    pub fn is_selectable(&self) -> bool {
        matches!(
            self,
            CustomFieldType::SingleSelectDropdown
                | CustomFieldType::MultiSelectDropdown
                | CustomFieldType::RadioButton
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<CustomFieldType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_field: Option<SelectField>,
    #[serde(flatten)]
    pub additional_fields: Map<String, Value>,
}

impl CustomFieldDefinition {
    pub fn is_selectable(&self) -> bool {
        self.select_field.is_some()
            || self
                .field_type
                .map(|field_type| field_type.is_selectable())
                .unwrap_or(false)
    }

    pub fn options(&self) -> &[SelectFieldOption] {
        self.select_field
            .as_ref()
            .map(|select| select.options.values.as_slice())
            .unwrap_or_default()
    }

    pub fn find_option(&self, value: &str) -> Option<&SelectFieldOption> {
        self.options().iter().find(|option| option.value == value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectField {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_select: Option<bool>,
    #[serde(default)]
    pub options: SelectFieldOptions,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SelectFieldOptions {
    #[serde(default)]
    pub values: Vec<SelectFieldOption>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SelectFieldOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}
