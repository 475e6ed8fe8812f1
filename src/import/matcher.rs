use crate::backend::UserDirectoryBackend;
use crate::error::AppError;
use crate::import::constants::{
    ERROR_MESSAGE, FAILED_TO_PROCESS_USER_SEARCH_RESPONSE, FAILED_TO_PROCESS_USER_SEARCH_RESULT,
};
use crate::models::DirectoryUser;

/// Looks up the existing account for an external system id.
///
/// `Ok(None)` means the record should be created. Errors are already
/// rendered as the user-facing cause.
pub async fn find_existing_user<B>(
    backend: &B,
    external_system_id: &str,
) -> Result<Option<DirectoryUser>, String>
where
    B: UserDirectoryBackend + ?Sized,
{
    let mut found = backend
        .search_users_by_external_id(external_system_id)
        .await
        .map_err(|err| search_failure(&err))?;

    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        n => Err(format!(
            "{} Found {} users with externalSystemId: {}",
            FAILED_TO_PROCESS_USER_SEARCH_RESULT, n, external_system_id
        )),
    }
}

fn search_failure(err: &AppError) -> String {
    if err.is_malformed_result() {
        format!("{} {}", FAILED_TO_PROCESS_USER_SEARCH_RESULT, err)
    } else {
        format!(
            "{}{}{} {}",
            FAILED_TO_PROCESS_USER_SEARCH_RESULT,
            ERROR_MESSAGE,
            FAILED_TO_PROCESS_USER_SEARCH_RESPONSE,
            err
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failure_names_response_stage() {
        let message = search_failure(&AppError::Database("timed out".to_string()));
        assert_eq!(
            message,
            "Failed to process user search result. Error message: Failed to process user search response. Database error: timed out"
        );
    }

    #[test]
    fn test_malformed_failure_names_result_stage() {
        let message = search_failure(&AppError::SchemaMismatch("missing username".to_string()));
        assert_eq!(
            message,
            "Failed to process user search result. Schema mismatch: missing username"
        );
    }
}
