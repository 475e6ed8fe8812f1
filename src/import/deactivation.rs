use std::collections::HashSet;
use tracing::{info, warn};

use crate::backend::UserDirectoryBackend;
use crate::error::ImportError;
use crate::import::summary::DeactivationReport;

/// Deactivate active accounts of `source_type` that the run did not touch.
///
/// Only the listing can fail the sweep; a failed deactivation call is
/// logged and counted as skipped.
pub async fn deactivate_missing_users<B>(
    backend: &B,
    source_type: &str,
    seen_external_ids: &[String],
) -> Result<DeactivationReport, ImportError>
where
    B: UserDirectoryBackend + ?Sized,
{
    let accounts = backend
        .list_users_by_source_type(source_type)
        .await
        .map_err(ImportError::DeactivationListing)?;

    let seen: HashSet<&str> = seen_external_ids.iter().map(String::as_str).collect();
    let missing: Vec<_> = accounts
        .iter()
        .filter(|account| account.is_active())
        .filter(|account| {
            account
                .external_system_id
                .as_deref()
                .map_or(true, |id| !seen.contains(id))
        })
        .collect();

    let mut report = DeactivationReport {
        missing: missing.len(),
        ..Default::default()
    };

    for account in missing {
        let Some(id) = account.id.as_deref() else {
            warn!(username = %account.username, "Missing user has no id, deactivation skipped");
            report.skipped += 1;
            continue;
        };

        match backend.deactivate_user(id).await {
            Ok(()) => report.deactivated += 1,
            Err(e) => {
                warn!(
                    user_id = %id,
                    external_system_id = account.external_system_id.as_deref().unwrap_or(""),
                    error = %e,
                    "Deactivation skipped"
                );
                report.skipped += 1;
            }
        }
    }

    info!(
        source_type = %source_type,
        missing = report.missing,
        deactivated = report.deactivated,
        skipped = report.skipped,
        "Deactivation sweep finished"
    );

    Ok(report)
}
