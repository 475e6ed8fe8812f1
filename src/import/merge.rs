//! Building directory payloads from incoming records
//!
//! `build_candidate` resolves names to directory ids. The two merge strategies
//! then combine a candidate with the existing account; both are pure.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::import::reference::{LookupTable, ReferenceTables};
use crate::models::{
    Address, CustomFieldDefinition, CustomFieldValue, DirectoryUser, IncomingUser, PersonalInfo,
};

/// Translate an incoming record into the directory representation.
///
/// Absent incoming fields stay `None` so the merge strategies can tell them
/// apart from supplied ones.
pub fn build_candidate(
    user: &IncomingUser,
    tables: &ReferenceTables,
    source_type: &str,
) -> DirectoryUser {
    let personal = user.personal.clone().map(|mut personal| {
        if let Some(addresses) = personal.addresses.as_mut() {
            for address in addresses.iter_mut() {
                if let Some(kind) = address.address_type_id.take() {
                    address.address_type_id = Some(resolve_or_keep(&tables.address_types, &kind));
                }
            }
        }
        personal
    });

    let request_preference = user.request_preference.clone().map(|mut preference| {
        if let Some(kind) = preference.default_delivery_address_type_id.take() {
            preference.default_delivery_address_type_id =
                Some(resolve_or_keep(&tables.address_types, &kind));
        }
        preference
    });

    let departments = user.departments.as_ref().map(|names| {
        names
            .iter()
            .map(|name| resolve_or_keep(&tables.departments, name))
            .collect()
    });

    let custom_fields = user.custom_fields.as_ref().map(|fields| {
        fields
            .iter()
            .map(|(ref_id, value)| {
                (
                    ref_id.clone(),
                    custom_field_payload(tables.custom_field(ref_id), value),
                )
            })
            .collect::<BTreeMap<_, _>>()
    });

    DirectoryUser {
        id: None,
        external_system_id: Some(user.external_system_id.clone()),
        username: user.username.clone(),
        barcode: user.barcode.clone(),
        active: user.active,
        patron_group: user
            .patron_group
            .as_deref()
            .map(|group| resolve_or_keep(&tables.patron_groups, group)),
        user_type: user.user_type.clone(),
        enrollment_date: user.enrollment_date.clone(),
        expiration_date: user.expiration_date.clone(),
        personal,
        request_preference,
        departments,
        custom_fields,
        source_type: Some(source_type.to_string()),
        additional_fields: Map::new(),
    }
}

/// Payload for a brand new account
pub fn new_account(mut candidate: DirectoryUser) -> DirectoryUser {
    candidate.active = Some(candidate.active.unwrap_or(true));
    candidate
}

/// Replace strategy: every field of the import schema is taken from the
/// candidate, absent ones included. Fields outside the schema survive.
pub fn replace_fields(existing: &DirectoryUser, candidate: DirectoryUser) -> DirectoryUser {
    let mut merged = candidate;
    merged.id = existing.id.clone();
    merged.additional_fields = existing.additional_fields.clone();
    merged.active = Some(merged.active.unwrap_or(true));

    let kept_personal = existing
        .personal
        .as_ref()
        .map(|personal| personal.additional_fields.clone())
        .unwrap_or_default();
    match merged.personal.as_mut() {
        Some(personal) => {
            for (key, value) in kept_personal {
                personal.additional_fields.entry(key).or_insert(value);
            }
        }
        None if !kept_personal.is_empty() => {
            merged.personal = Some(PersonalInfo {
                additional_fields: kept_personal,
                ..Default::default()
            });
        }
        None => {}
    }

    if let (Some(preference), Some(current)) = (
        merged.request_preference.as_mut(),
        existing.request_preference.as_ref(),
    ) {
        preference.id = current.id.clone();
    }

    merged
}

/// Update-only-present strategy: only fields supplied on the candidate
/// overwrite the existing account.
pub fn merge_present_fields(existing: &DirectoryUser, candidate: DirectoryUser) -> DirectoryUser {
    let mut merged = existing.clone();

    merged.username = candidate.username;
    overlay(&mut merged.external_system_id, candidate.external_system_id);
    overlay(&mut merged.barcode, candidate.barcode);
    overlay(&mut merged.active, candidate.active);
    overlay(&mut merged.patron_group, candidate.patron_group);
    overlay(&mut merged.user_type, candidate.user_type);
    overlay(&mut merged.enrollment_date, candidate.enrollment_date);
    overlay(&mut merged.expiration_date, candidate.expiration_date);
    overlay(&mut merged.departments, candidate.departments);
    overlay(&mut merged.source_type, candidate.source_type);

    if let Some(personal) = candidate.personal {
        merged.personal = Some(merge_personal(existing.personal.as_ref(), personal));
    }

    if let Some(mut preference) = candidate.request_preference {
        if let Some(current) = existing.request_preference.as_ref() {
            preference.id = current.id.clone();
        }
        merged.request_preference = Some(preference);
    }

    if let Some(fields) = candidate.custom_fields {
        merged
            .custom_fields
            .get_or_insert_with(BTreeMap::new)
            .extend(fields);
    }

    merged
}

fn merge_personal(existing: Option<&PersonalInfo>, incoming: PersonalInfo) -> PersonalInfo {
    let Some(existing) = existing else {
        return incoming;
    };

    let mut merged = existing.clone();
    overlay(&mut merged.last_name, incoming.last_name);
    overlay(&mut merged.first_name, incoming.first_name);
    overlay(&mut merged.middle_name, incoming.middle_name);
    overlay(&mut merged.preferred_first_name, incoming.preferred_first_name);
    overlay(&mut merged.email, incoming.email);
    overlay(&mut merged.phone, incoming.phone);
    overlay(&mut merged.mobile_phone, incoming.mobile_phone);
    overlay(&mut merged.date_of_birth, incoming.date_of_birth);
    overlay(
        &mut merged.preferred_contact_type_id,
        incoming.preferred_contact_type_id,
    );
    merged.additional_fields.extend(incoming.additional_fields);

    if let Some(addresses) = incoming.addresses {
        let current = existing.addresses.as_deref().unwrap_or_default();
        merged.addresses = Some(merge_addresses(current, addresses));
    }

    merged
}

/// Merge address collections keyed by address type.
///
/// An incoming address replaces the first address of the same type that came
/// from the account and keeps its id. Each account address is replaced at
/// most once, so further incoming addresses of that type are appended. An
/// incoming primary address clears the primary flag on the addresses kept
/// from the account.
fn merge_addresses(existing: &[Address], incoming: Vec<Address>) -> Vec<Address> {
    let mut merged = existing.to_vec();
    let mut replaced = vec![false; existing.len()];

    if incoming.iter().any(Address::is_primary) {
        for address in merged.iter_mut().filter(|address| address.is_primary()) {
            address.primary_address = Some(false);
        }
    }

    for address in incoming {
        let slot = (0..existing.len()).find(|&index| {
            !replaced[index]
                && merged[index].address_type_id.is_some()
                && merged[index].address_type_id == address.address_type_id
        });
        match slot {
            Some(index) => {
                replaced[index] = true;
                let known = &mut merged[index];
                let id = address.id.clone().or_else(|| known.id.take());
                *known = Address { id, ..address };
            }
            None => merged.push(address),
        }
    }

    merged
}

fn overlay<T>(target: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *target = value;
    }
}

fn resolve_or_keep(table: &LookupTable, value: &str) -> String {
    table.resolve(value).unwrap_or(value).to_string()
}

fn custom_field_payload(
    definition: Option<&CustomFieldDefinition>,
    value: &CustomFieldValue,
) -> Value {
    let option_id = |value: &str| -> Value {
        let id = definition
            .filter(|definition| definition.is_selectable())
            .and_then(|definition| definition.find_option(value))
            .and_then(|option| option.id.clone())
            .unwrap_or_else(|| value.to_string());
        Value::String(id)
    };

    match value {
        CustomFieldValue::Multiple(values) => {
            Value::Array(values.iter().map(|value| option_id(value)).collect())
        }
        CustomFieldValue::Single(value) => option_id(value),
        CustomFieldValue::Other(value) => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AddressType, CustomFieldType, Department, PatronGroup, RequestPreference, SelectField,
        SelectFieldOption, SelectFieldOptions,
    };
    use serde_json::json;

    fn tables() -> ReferenceTables {
        ReferenceTables::new(
            vec![PatronGroup {
                id: "pg-1".to_string(),
                name: "staff".to_string(),
            }],
            vec![
                AddressType {
                    id: "home-id".to_string(),
                    name: "Home".to_string(),
                },
                AddressType {
                    id: "work-id".to_string(),
                    name: "Work".to_string(),
                },
            ],
            vec![],
        )
        .with_departments(vec![Department {
            id: Some("dep-1".to_string()),
            name: "History".to_string(),
            code: None,
        }])
        .with_custom_fields(vec![CustomFieldDefinition {
            id: None,
            ref_id: "faculty".to_string(),
            name: None,
            field_type: Some(CustomFieldType::RadioButton),
            select_field: Some(SelectField {
                multi_select: None,
                options: SelectFieldOptions {
                    values: vec![SelectFieldOption {
                        id: Some("opt_3".to_string()),
                        value: "Science".to_string(),
                        default: None,
                    }],
                },
            }),
            additional_fields: Default::default(),
        }])
    }

    fn address(kind: &str, city: &str, primary: bool) -> Address {
        Address {
            address_type_id: Some(kind.to_string()),
            city: Some(city.to_string()),
            primary_address: Some(primary),
            ..Default::default()
        }
    }

    fn existing() -> DirectoryUser {
        let mut home = address("home-id", "Old Town", true);
        home.id = Some("addr-1".to_string());
        let mut additional_fields = Map::new();
        additional_fields.insert("metadata".to_string(), json!({"createdDate": "2020-01-01"}));

        DirectoryUser {
            id: Some("user-1".to_string()),
            external_system_id: Some("ext-1".to_string()),
            username: "amy".to_string(),
            barcode: Some("b-1".to_string()),
            active: Some(false),
            patron_group: Some("pg-1".to_string()),
            personal: Some(PersonalInfo {
                last_name: Some("Cabble".to_string()),
                email: Some("amy@example.org".to_string()),
                addresses: Some(vec![home]),
                ..Default::default()
            }),
            request_preference: Some(RequestPreference {
                id: Some("pref-1".to_string()),
                hold_shelf: Some(true),
                delivery: Some(false),
                ..Default::default()
            }),
            departments: Some(["dep-1".to_string()].into_iter().collect()),
            source_type: Some("import".to_string()),
            additional_fields,
            ..Default::default()
        }
    }

    #[test]
    fn test_build_candidate_resolves_names() {
        let mut user = IncomingUser::new("ext-1", "amy");
        user.patron_group = Some("staff".to_string());
        user.departments = Some(["History".to_string()].into_iter().collect());
        user.personal = Some(PersonalInfo {
            addresses: Some(vec![address("Home", "A", true), address("Campus", "B", false)]),
            ..Default::default()
        });
        user.custom_fields = Some(BTreeMap::from([(
            "faculty".to_string(),
            CustomFieldValue::Single("Science".to_string()),
        )]));

        let candidate = build_candidate(&user, &tables(), "ldap");

        assert_eq!(candidate.patron_group.as_deref(), Some("pg-1"));
        assert!(candidate.departments.unwrap().contains("dep-1"));
        let addresses = candidate.personal.unwrap().addresses.unwrap();
        assert_eq!(addresses[0].address_type_id.as_deref(), Some("home-id"));
        assert_eq!(addresses[1].address_type_id.as_deref(), Some("Campus"));
        assert_eq!(candidate.custom_fields.unwrap()["faculty"], json!("opt_3"));
        assert_eq!(candidate.source_type.as_deref(), Some("ldap"));
        assert_eq!(candidate.active, None);
    }

    #[test]
    fn test_new_account_defaults_active() {
        let candidate = build_candidate(&IncomingUser::new("ext-1", "amy"), &tables(), "import");
        assert_eq!(new_account(candidate).active, Some(true));
    }

    #[test]
    fn test_replace_clears_absent_fields() {
        let user = IncomingUser::new("ext-1", "amy.c");
        let candidate = build_candidate(&user, &tables(), "import");

        let merged = replace_fields(&existing(), candidate);

        assert_eq!(merged.id.as_deref(), Some("user-1"));
        assert_eq!(merged.username, "amy.c");
        assert_eq!(merged.barcode, None);
        assert_eq!(merged.personal, None);
        assert_eq!(merged.request_preference, None);
        assert_eq!(merged.departments, None);
        assert_eq!(merged.active, Some(true));
        assert_eq!(merged.additional_fields["metadata"]["createdDate"], "2020-01-01");
    }

    #[test]
    fn test_replace_keeps_preference_id() {
        let mut user = IncomingUser::new("ext-1", "amy");
        user.request_preference = Some(RequestPreference {
            hold_shelf: Some(true),
            delivery: Some(false),
            ..Default::default()
        });
        let candidate = build_candidate(&user, &tables(), "import");

        let merged = replace_fields(&existing(), candidate);
        assert_eq!(
            merged.request_preference.unwrap().id.as_deref(),
            Some("pref-1")
        );
    }

    #[test]
    fn test_present_fields_keep_absent_ones() {
        let mut user = IncomingUser::new("ext-1", "amy");
        user.personal = Some(PersonalInfo {
            first_name: Some("Amy".to_string()),
            ..Default::default()
        });
        let candidate = build_candidate(&user, &tables(), "import");

        let merged = merge_present_fields(&existing(), candidate);
        let personal = merged.personal.unwrap();

        assert_eq!(personal.first_name.as_deref(), Some("Amy"));
        assert_eq!(personal.last_name.as_deref(), Some("Cabble"));
        assert_eq!(personal.addresses.unwrap().len(), 1);
        assert_eq!(merged.barcode.as_deref(), Some("b-1"));
        assert_eq!(merged.active, Some(false));
        assert_eq!(
            merged.request_preference.unwrap().id.as_deref(),
            Some("pref-1")
        );
    }

    #[test]
    fn test_addresses_merge_by_type() {
        let mut user = IncomingUser::new("ext-1", "amy");
        user.personal = Some(PersonalInfo {
            addresses: Some(vec![
                address("Home", "New Town", false),
                address("Work", "Campus", true),
            ]),
            ..Default::default()
        });
        let candidate = build_candidate(&user, &tables(), "import");

        let merged = merge_present_fields(&existing(), candidate);
        let addresses = merged.personal.unwrap().addresses.unwrap();

        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[0].id.as_deref(), Some("addr-1"));
        assert_eq!(addresses[0].city.as_deref(), Some("New Town"));
        assert!(!addresses[0].is_primary());
        assert_eq!(addresses[1].address_type_id.as_deref(), Some("work-id"));
        assert!(addresses[1].is_primary());
    }

    #[test]
    fn test_new_addresses_of_same_type_are_all_kept() {
        let merged = merge_addresses(
            existing().addresses(),
            vec![
                address("work-id", "Campus", false),
                address("work-id", "Annex", false),
            ],
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].city.as_deref(), Some("Old Town"));
        assert_eq!(merged[1].city.as_deref(), Some("Campus"));
        assert_eq!(merged[2].city.as_deref(), Some("Annex"));
    }

    #[test]
    fn test_account_address_is_replaced_once() {
        let merged = merge_addresses(
            existing().addresses(),
            vec![
                address("home-id", "New Town", false),
                address("home-id", "Second Home", false),
            ],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].id.as_deref(), Some("addr-1"));
        assert_eq!(merged[0].city.as_deref(), Some("New Town"));
        assert_eq!(merged[1].id, None);
        assert_eq!(merged[1].city.as_deref(), Some("Second Home"));
    }

    #[test]
    fn test_incoming_primary_demotes_kept_addresses() {
        let mut current = existing();
        if let Some(personal) = current.personal.as_mut() {
            personal
                .addresses
                .get_or_insert_with(Vec::new)
                .push(address("work-id", "Office", false));
        }
        let merged = merge_addresses(
            current.addresses(),
            vec![address("other-id", "Elsewhere", true)],
        );

        assert_eq!(merged.len(), 3);
        assert_eq!(merged.iter().filter(|a| a.is_primary()).count(), 1);
        assert!(merged[2].is_primary());
    }

    #[test]
    fn test_custom_fields_merge_by_key() {
        let mut current = existing();
        current.custom_fields = Some(BTreeMap::from([
            ("nickname".to_string(), json!("Ames")),
            ("faculty".to_string(), json!("opt_0")),
        ]));
        let mut user = IncomingUser::new("ext-1", "amy");
        user.custom_fields = Some(BTreeMap::from([(
            "faculty".to_string(),
            CustomFieldValue::Single("Science".to_string()),
        )]));
        let candidate = build_candidate(&user, &tables(), "import");

        let merged = merge_present_fields(&current, candidate);
        let fields = merged.custom_fields.unwrap();

        assert_eq!(fields["nickname"], json!("Ames"));
        assert_eq!(fields["faculty"], json!("opt_3"));
    }
}
