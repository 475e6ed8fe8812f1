//! Structural checks applied to a batch before any record is processed
//!
//! Any violation rejects the whole request with 422.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{ImportBatch, IncomingUser};

lazy_static! {
    static ref UUID_PATTERN: Regex = Regex::new(
        r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[1-5][a-fA-F0-9]{3}-[89abAB][a-fA-F0-9]{3}-[a-fA-F0-9]{12}$"
    )
    .unwrap();
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameter {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub parameters: Vec<Parameter>,
}

impl ValidationError {
    fn new(message: &str, key: String, value: &str) -> Self {
        Self {
            message: message.to_string(),
            error_type: "1".to_string(),
            code: "-1".to_string(),
            parameters: vec![Parameter {
                key,
                value: value.to_string(),
            }],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct BatchValidationErrors {
    pub errors: Vec<ValidationError>,
    pub total_records: usize,
}

impl BatchValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate every record of the batch, collecting all violations
pub fn validate_batch(batch: &ImportBatch) -> Result<(), BatchValidationErrors> {
    let errors: Vec<ValidationError> = batch
        .users
        .iter()
        .enumerate()
        .flat_map(|(index, user)| validate_record(index, user))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BatchValidationErrors {
            errors,
            total_records: batch.declared_total(),
        })
    }
}

fn validate_record(index: usize, user: &IncomingUser) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if user.external_system_id.trim().is_empty() {
        errors.push(ValidationError::new(
            "must not be null",
            format!("users[{}].externalSystemId", index),
            "null",
        ));
    }

    if user.username.trim().is_empty() {
        errors.push(ValidationError::new(
            "must not be null",
            format!("users[{}].username", index),
            "null",
        ));
    }

    if let Some(service_point) = user
        .request_preference
        .as_ref()
        .and_then(|preference| preference.default_service_point_id.as_deref())
    {
        if !UUID_PATTERN.is_match(service_point) {
            errors.push(ValidationError::new(
                &format!("must match \"{}\"", UUID_PATTERN.as_str()),
                format!("users[{}].requestPreference.defaultServicePointId", index),
                service_point,
            ));
        }
    }

    errors
}
