//! Business-rule validation of a single incoming record
//!
//! Runs after reference data is loaded. The first failing rule decides the
//! rejection message and no directory call is made for the record.

use std::collections::BTreeSet;

use crate::import::constants::{
    CUSTOM_FIELDS_DO_NOT_EXIST, CUSTOM_FIELD_OPTIONS_DO_NOT_EXIST, DEPARTMENTS_DO_NOT_EXIST,
    FAILED_USER_PREFERENCE_VALIDATION, ONLY_ONE_PRIMARY_ADDRESS, PATRON_GROUP_DOES_NOT_EXIST,
};
use crate::import::preference::validate_request_preference;
use crate::import::reference::ReferenceTables;
use crate::models::IncomingUser;

pub fn validate_user(user: &IncomingUser, tables: &ReferenceTables) -> Result<(), String> {
    validate_primary_address(user)?;
    validate_patron_group(user, tables)?;
    validate_departments(user, tables)?;
    validate_custom_fields(user, tables)?;

    if let Some(preference) = &user.request_preference {
        validate_request_preference(preference, user, tables)
            .map_err(|violation| format!("{}{}", FAILED_USER_PREFERENCE_VALIDATION, violation))?;
    }

    Ok(())
}

fn validate_primary_address(user: &IncomingUser) -> Result<(), String> {
    let primary = user
        .addresses()
        .iter()
        .filter(|address| address.is_primary())
        .count();
    if primary > 1 {
        return Err(ONLY_ONE_PRIMARY_ADDRESS.to_string());
    }
    Ok(())
}

fn validate_patron_group(user: &IncomingUser, tables: &ReferenceTables) -> Result<(), String> {
    match user.patron_group.as_deref() {
        Some(group) if tables.patron_groups.resolve(group).is_none() => {
            Err(format!("{}[{}]", PATRON_GROUP_DOES_NOT_EXIST, group))
        }
        _ => Ok(()),
    }
}

fn validate_departments(user: &IncomingUser, tables: &ReferenceTables) -> Result<(), String> {
    let Some(departments) = &user.departments else {
        return Ok(());
    };

    // BTreeSet iteration keeps the unresolved names sorted
    let missing: Vec<&str> = departments
        .iter()
        .map(String::as_str)
        .filter(|name| tables.departments.resolve(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("{}[{}]", DEPARTMENTS_DO_NOT_EXIST, missing.join(", ")));
    }
    Ok(())
}

fn validate_custom_fields(user: &IncomingUser, tables: &ReferenceTables) -> Result<(), String> {
    let Some(fields) = &user.custom_fields else {
        return Ok(());
    };

    let unknown: BTreeSet<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|ref_id| tables.custom_field(ref_id).is_none())
        .collect();
    if !unknown.is_empty() {
        let unknown: Vec<&str> = unknown.into_iter().collect();
        return Err(format!("{}[{}].", CUSTOM_FIELDS_DO_NOT_EXIST, unknown.join(", ")));
    }

    let mut missing_options = Vec::new();
    for (ref_id, value) in fields {
        let Some(definition) = tables.custom_field(ref_id) else {
            continue;
        };
        if !definition.is_selectable() {
            continue;
        }
        let missing: Vec<&str> = value
            .values()
            .into_iter()
            .filter(|option| definition.find_option(option).is_none())
            .collect();
        if !missing.is_empty() {
            missing_options.push(format!(
                "[refId = {}, options: [{}]]",
                ref_id,
                missing.join(", ")
            ));
        }
    }
    if !missing_options.is_empty() {
        return Err(format!(
            "{}{}.",
            CUSTOM_FIELD_OPTIONS_DO_NOT_EXIST,
            missing_options.join(", ")
        ));
    }

    Ok(())
}
