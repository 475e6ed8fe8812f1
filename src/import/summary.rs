use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::import::constants::{ERROR_MESSAGE, FAILED_TO_IMPORT_USERS};

/// Result of reconciling one record
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created,
    Updated,
    Failed(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FailedUser {
    pub external_system_id: String,
    pub username: String,
    pub error_message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DeactivationReport {
    pub missing: usize,
    pub deactivated: usize,
    pub skipped: usize,
}

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportStatus {
    #[default]
    Completed,
    Aborted,
}

impl ImportStatus {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ImportStatus::Completed => StatusCode::OK,
            ImportStatus::Aborted => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_records: usize,
    pub created_records: usize,
    pub updated_records: usize,
    pub failed_records: usize,
    pub failed_external_system_ids: Vec<String>,
    pub failed_users: Vec<FailedUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivation: Option<DeactivationReport>,
    #[serde(skip)]
    pub status: ImportStatus,
}

impl BatchSummary {
    pub fn empty(message: &str) -> Self {
        Self {
            message: message.to_string(),
            ..Default::default()
        }
    }
}

/// Single accumulation point for per-record outcomes
#[derive(Debug, Default)]
pub struct ResultAggregator {
    total: usize,
    created: usize,
    updated: usize,
    failed_users: Vec<FailedUser>,
    seen_external_ids: Vec<String>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, external_system_id: &str, username: &str, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Created => {
                self.created += 1;
                self.seen_external_ids.push(external_system_id.to_string());
            }
            Outcome::Updated => {
                self.updated += 1;
                self.seen_external_ids.push(external_system_id.to_string());
            }
            Outcome::Failed(error_message) => self.failed_users.push(FailedUser {
                external_system_id: external_system_id.to_string(),
                username: username.to_string(),
                error_message,
            }),
        }
    }

    pub fn failed(&self) -> usize {
        self.failed_users.len()
    }

    /// External ids of records that were created or updated in this run
    pub fn seen_external_ids(&self) -> &[String] {
        &self.seen_external_ids
    }

    pub fn summarize(self, message: &str) -> BatchSummary {
        BatchSummary {
            message: message.to_string(),
            error: None,
            total_records: self.total,
            created_records: self.created,
            updated_records: self.updated,
            failed_records: self.failed_users.len(),
            failed_external_system_ids: self
                .failed_users
                .iter()
                .map(|user| user.external_system_id.clone())
                .collect(),
            failed_users: self.failed_users,
            deactivation: None,
            status: ImportStatus::Completed,
        }
    }
}

/// Summary of a whole-batch abort: every record failed with the same cause
pub fn aborted_summary<'a, I>(records: I, cause: &str) -> BatchSummary
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let error = format!("{}{}{}", FAILED_TO_IMPORT_USERS, ERROR_MESSAGE, cause);
    let mut aggregator = ResultAggregator::new();
    for (external_system_id, username) in records {
        aggregator.record(external_system_id, username, Outcome::Failed(error.clone()));
    }

    let mut summary = aggregator.summarize(FAILED_TO_IMPORT_USERS);
    summary.error = Some(error);
    summary.status = ImportStatus::Aborted;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_add_up() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record("a", "amy", Outcome::Created);
        aggregator.record("b", "bob", Outcome::Failed("nope".to_string()));
        aggregator.record("c", "cat", Outcome::Updated);
        aggregator.record("d", "dan", Outcome::Failed("again".to_string()));

        assert_eq!(aggregator.seen_external_ids(), ["a", "c"]);
        let summary = aggregator.summarize("done");

        assert_eq!(summary.total_records, 4);
        assert_eq!(
            summary.total_records,
            summary.created_records + summary.updated_records + summary.failed_records
        );
        assert_eq!(summary.failed_external_system_ids, vec!["b", "d"]);
        assert_eq!(summary.failed_users[1].error_message, "again");
    }

    #[test]
    fn test_aborted_summary_fails_every_record() {
        let summary = aborted_summary([("a", "amy"), ("b", "bob")], "Failed to list patron groups.");

        assert_eq!(summary.status, ImportStatus::Aborted);
        assert_eq!(summary.message, "Failed to import users.");
        assert_eq!(summary.failed_records, 2);
        assert_eq!(summary.created_records, 0);
        assert_eq!(
            summary.error.as_deref(),
            Some("Failed to import users. Error message: Failed to list patron groups.")
        );
        assert_eq!(summary.failed_users[0].error_message, summary.error.clone().unwrap());
    }

    #[test]
    fn test_summary_wire_shape() {
        let summary = BatchSummary::empty("No users to import.");
        let body = serde_json::to_value(&summary).unwrap();

        assert_eq!(
            body,
            json!({
                "message": "No users to import.",
                "totalRecords": 0,
                "createdRecords": 0,
                "updatedRecords": 0,
                "failedRecords": 0,
                "failedExternalSystemIds": [],
                "failedUsers": []
            })
        );
        assert_eq!(ImportStatus::Completed.status_code(), StatusCode::OK);
    }
}
