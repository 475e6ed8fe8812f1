//! User import reconciliation
//!
//! `UserImporter::import_users` runs one batch: reference data warm-up, the
//! per-record pass (create, update or reject) and the optional deactivation
//! sweep. Whole-batch aborts are reported through the summary, never as an
//! `Err`.

pub mod constants;
pub mod deactivation;
pub mod matcher;
pub mod merge;
pub mod preference;
pub mod reference;
pub mod summary;
pub mod validation;

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::backend::DirectoryBackend;
use crate::models::{ImportBatch, IncomingUser};
use constants::{
    DEACTIVATED_MISSING_USERS, ERROR_MESSAGE, FAILED_TO_CREATE_NEW_USER_WITH_EXTERNAL_SYSTEM_ID,
    FAILED_TO_UPDATE_USER_WITH_EXTERNAL_SYSTEM_ID, NO_USERS_TO_IMPORT,
    USERS_WERE_IMPORTED_SUCCESSFULLY, USER_DEACTIVATION_SKIPPED,
};
use reference::{ReferenceDataCache, ReferenceTables};
use summary::{aborted_summary, BatchSummary, Outcome, ResultAggregator};

pub use summary::ImportStatus;

/// Engine settings taken from the `import` configuration section
#[derive(Debug, Clone)]
pub struct ImportSettings {
    pub default_source_type: String,
    pub max_concurrency: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            default_source_type: "import".to_string(),
            max_concurrency: 1,
        }
    }
}

/// Per-batch settings shared by every record of a run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub source_type: String,
    /// Set when the batch names its own source type. Stored external ids
    /// become `<prefix>_<externalSystemId>`.
    pub external_id_prefix: Option<String>,
    pub update_only_present_fields: bool,
}

impl ReconcileOptions {
    pub fn for_batch(batch: &ImportBatch, settings: &ImportSettings) -> Self {
        let external_id_prefix = batch.source_type.clone().filter(|tag| !tag.is_empty());
        Self {
            source_type: external_id_prefix
                .clone()
                .unwrap_or_else(|| settings.default_source_type.clone()),
            external_id_prefix,
            update_only_present_fields: batch.update_only_present_fields,
        }
    }

    pub fn scoped_external_id(&self, external_system_id: &str) -> String {
        match &self.external_id_prefix {
            Some(prefix) => format!("{}_{}", prefix, external_system_id),
            None => external_system_id.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct UserImporter {
    backend: Arc<dyn DirectoryBackend>,
    settings: ImportSettings,
}

impl UserImporter {
    pub fn new(backend: Arc<dyn DirectoryBackend>, settings: ImportSettings) -> Self {
        Self { backend, settings }
    }

    pub async fn import_users(&self, batch: ImportBatch) -> BatchSummary {
        let declared_total = batch.declared_total();
        if declared_total == 0 || batch.users.is_empty() {
            info!("{}", NO_USERS_TO_IMPORT);
            return BatchSummary::empty(NO_USERS_TO_IMPORT);
        }

        if declared_total != batch.users.len() {
            warn!(
                declared = declared_total,
                actual = batch.users.len(),
                "Declared total does not match the number of users supplied"
            );
        }

        let options = ReconcileOptions::for_batch(&batch, &self.settings);

        info!(
            users = batch.users.len(),
            source_type = %options.source_type,
            deactivate_missing_users = batch.deactivate_missing_users,
            update_only_present_fields = batch.update_only_present_fields,
            "Starting user import"
        );

        let tables = match ReferenceDataCache::new(self.backend.as_ref())
            .warm(&batch)
            .await
        {
            Ok(tables) => Arc::new(tables),
            Err(e) => {
                error!(error = %e, "Reference data warm-up failed, import aborted");
                return aborted_summary(record_keys(&batch.users), &e.to_string());
            }
        };

        let outcomes = self
            .reconcile_all(&batch.users, tables, &options)
            .await;

        let mut aggregator = ResultAggregator::new();
        for (user, outcome) in batch.users.iter().zip(outcomes) {
            if let Outcome::Failed(reason) = &outcome {
                warn!(
                    external_system_id = %user.external_system_id,
                    username = %user.username,
                    error = %reason,
                    "User import failed"
                );
            }
            aggregator.record(&user.external_system_id, &user.username, outcome);
        }

        let summary = if !batch.deactivate_missing_users {
            aggregator.summarize(USERS_WERE_IMPORTED_SUCCESSFULLY)
        } else if aggregator.failed() > 0 {
            warn!(
                failed = aggregator.failed(),
                "Deactivation of missing users skipped"
            );
            aggregator.summarize(&format!(
                "{} {}",
                USERS_WERE_IMPORTED_SUCCESSFULLY, USER_DEACTIVATION_SKIPPED
            ))
        } else {
            let seen: Vec<String> = aggregator
                .seen_external_ids()
                .iter()
                .map(|id| options.scoped_external_id(id))
                .collect();
            match deactivation::deactivate_missing_users(
                self.backend.as_ref(),
                &options.source_type,
                &seen,
            )
            .await
            {
                Ok(report) => {
                    let message = if report.missing > 0 {
                        DEACTIVATED_MISSING_USERS
                    } else {
                        USERS_WERE_IMPORTED_SUCCESSFULLY
                    };
                    let mut summary = aggregator.summarize(message);
                    summary.deactivation = Some(report);
                    summary
                }
                Err(e) => {
                    error!(error = %e, "Listing users for deactivation failed, import aborted");
                    return aborted_summary(record_keys(&batch.users), &e.to_string());
                }
            }
        };

        info!(
            total = summary.total_records,
            created = summary.created_records,
            updated = summary.updated_records,
            failed = summary.failed_records,
            "User import finished"
        );

        summary
    }

    /// Reconcile every record and return the outcomes in input order.
    async fn reconcile_all(
        &self,
        users: &[IncomingUser],
        tables: Arc<ReferenceTables>,
        options: &ReconcileOptions,
    ) -> Vec<Outcome> {
        if self.settings.max_concurrency <= 1 {
            let mut outcomes = Vec::with_capacity(users.len());
            for user in users {
                outcomes.push(
                    reconcile_user(self.backend.as_ref(), &tables, user, options).await,
                );
            }
            return outcomes;
        }

        let mut outcomes: Vec<Option<Outcome>> = vec![None; users.len()];
        let mut join_set = JoinSet::new();

        for (index, user) in users.iter().enumerate() {
            if join_set.len() >= self.settings.max_concurrency {
                collect_next(&mut join_set, &mut outcomes).await;
            }

            let backend = Arc::clone(&self.backend);
            let tables = Arc::clone(&tables);
            let user = user.clone();
            let options = options.clone();
            join_set.spawn(async move {
                let outcome = reconcile_user(backend.as_ref(), &tables, &user, &options).await;
                (index, outcome)
            });
        }

        while !join_set.is_empty() {
            collect_next(&mut join_set, &mut outcomes).await;
        }

        outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| {
                    Outcome::Failed("Internal error: user processing task did not complete".to_string())
                })
            })
            .collect()
    }
}

async fn collect_next(
    join_set: &mut JoinSet<(usize, Outcome)>,
    outcomes: &mut [Option<Outcome>],
) {
    match join_set.join_next().await {
        Some(Ok((index, outcome))) => outcomes[index] = Some(outcome),
        Some(Err(e)) => error!(error = %e, "User processing task panicked"),
        None => {}
    }
}

/// Match, validate and persist one record.
pub async fn reconcile_user(
    backend: &dyn DirectoryBackend,
    tables: &ReferenceTables,
    user: &IncomingUser,
    options: &ReconcileOptions,
) -> Outcome {
    let external_id = options.scoped_external_id(&user.external_system_id);
    let existing = match matcher::find_existing_user(backend, &external_id).await {
        Ok(existing) => existing,
        Err(reason) => return Outcome::Failed(reason),
    };

    if let Err(reason) = validation::validate_user(user, tables) {
        return Outcome::Failed(reason);
    }

    let mut candidate = merge::build_candidate(user, tables, &options.source_type);
    candidate.external_system_id = Some(external_id);

    match existing {
        None => {
            let account = merge::new_account(candidate);
            let created = match backend.create_user(&account).await {
                Ok(id) => backend.create_permission_user(&id).await.map(|()| id),
                Err(e) => Err(e),
            };
            match created {
                Ok(id) => {
                    debug!(
                        external_system_id = %user.external_system_id,
                        user_id = %id,
                        "Created user"
                    );
                    Outcome::Created
                }
                Err(e) => Outcome::Failed(format!(
                    "{}{}{}{}",
                    FAILED_TO_CREATE_NEW_USER_WITH_EXTERNAL_SYSTEM_ID,
                    user.external_system_id,
                    ERROR_MESSAGE,
                    e
                )),
            }
        }
        Some(existing) => {
            let Some(id) = existing.id.clone() else {
                return Outcome::Failed(format!(
                    "{}{}{}Existing user has no id",
                    FAILED_TO_UPDATE_USER_WITH_EXTERNAL_SYSTEM_ID,
                    user.external_system_id,
                    ERROR_MESSAGE
                ));
            };
            let account = if options.update_only_present_fields {
                merge::merge_present_fields(&existing, candidate)
            } else {
                merge::replace_fields(&existing, candidate)
            };
            match backend.update_user(&id, &account).await {
                Ok(()) => {
                    debug!(
                        external_system_id = %user.external_system_id,
                        user_id = %id,
                        "Updated user"
                    );
                    Outcome::Updated
                }
                Err(e) => Outcome::Failed(format!(
                    "{}{}{}{}",
                    FAILED_TO_UPDATE_USER_WITH_EXTERNAL_SYSTEM_ID,
                    user.external_system_id,
                    ERROR_MESSAGE,
                    e
                )),
            }
        }
    }
}

fn record_keys(users: &[IncomingUser]) -> impl Iterator<Item = (&str, &str)> {
    users
        .iter()
        .map(|user| (user.external_system_id.as_str(), user.username.as_str()))
}
