use crate::error::AppResult;
use crate::models::{
    AddressType, CustomFieldDefinition, Department, DirectoryUser, PatronGroup, ServicePoint,
};
use async_trait::async_trait;
use std::sync::Arc;

pub mod database;

/// Supported database backend types
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseType {
    SQLite,
}

/// Core backend abstraction for the user directory
///
/// Lifecycle operations shared by every storage implementation. The
/// import engine never calls these; they are used at startup and by the
/// health endpoint.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Connect and initialize the storage backend
    async fn connect(config: &crate::backend::database::DatabaseBackendConfig) -> AppResult<Self>
    where
        Self: Sized;

    /// Check if the storage backend is healthy and accessible
    async fn health_check(&self) -> AppResult<()>;

    /// Create tables and indexes if needed
    async fn init_schema(&self) -> AppResult<()>;
}

/// Reference data collaborators consulted while warming up an import run
#[async_trait]
pub trait ReferenceDataBackend: Send + Sync {
    async fn list_patron_groups(&self) -> AppResult<Vec<PatronGroup>>;

    async fn list_address_types(&self) -> AppResult<Vec<AddressType>>;

    async fn list_service_points(&self) -> AppResult<Vec<ServicePoint>>;

    async fn list_departments(&self) -> AppResult<Vec<Department>>;

    /// Create a department and return it with its directory-assigned id
    async fn create_department(&self, department: &Department) -> AppResult<Department>;

    async fn update_department(&self, department: &Department) -> AppResult<()>;

    async fn list_custom_field_definitions(&self) -> AppResult<Vec<CustomFieldDefinition>>;

    /// Replace the stored custom field definitions with the given set
    async fn update_custom_field_definitions(
        &self,
        definitions: &[CustomFieldDefinition],
    ) -> AppResult<()>;
}

/// User account operations of the directory
///
/// Storage or transport failures must surface as `AppError::Database`;
/// records that cannot be decoded as `AppError::Serialization` or
/// `AppError::SchemaMismatch`.
#[async_trait]
pub trait UserDirectoryBackend: Send + Sync {
    /// Find every account carrying the given external system id
    async fn search_users_by_external_id(
        &self,
        external_system_id: &str,
    ) -> AppResult<Vec<DirectoryUser>>;

    /// Create an account and return its new id
    async fn create_user(&self, user: &DirectoryUser) -> AppResult<String>;

    /// Create the empty permission record every new account needs
    async fn create_permission_user(&self, user_id: &str) -> AppResult<()>;

    /// Replace an existing account
    async fn update_user(&self, id: &str, user: &DirectoryUser) -> AppResult<()>;

    async fn list_users_by_source_type(&self, source_type: &str) -> AppResult<Vec<DirectoryUser>>;

    async fn deactivate_user(&self, id: &str) -> AppResult<()>;
}

/// Combined collaborator interface consumed by the import engine
pub trait DirectoryBackend: ReferenceDataBackend + UserDirectoryBackend {}

/// Automatic implementation for any type that implements both traits
impl<T> DirectoryBackend for T where T: ReferenceDataBackend + UserDirectoryBackend {}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend based on configuration
    pub async fn create(
        config: &crate::backend::database::DatabaseBackendConfig,
    ) -> AppResult<Arc<database::SqliteBackend>> {
        match config.database_type {
            DatabaseType::SQLite => {
                let backend = database::SqliteBackend::connect(config).await?;
                backend.init_schema().await?;
                Ok(Arc::new(backend))
            }
        }
    }
}
