use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::info;

use super::config::DatabaseBackendConfig;
use super::reference_store::SqliteReferenceStore;
use super::user_store::SqliteUserStore;
use crate::backend::{Backend, ReferenceDataBackend, UserDirectoryBackend};
use crate::config::SeedConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    AddressType, CustomFieldDefinition, Department, DirectoryUser, PatronGroup, ServicePoint,
};

/// SQLite user directory
///
/// Holds accounts and the reference tables the import engine resolves
/// against.
pub struct SqliteBackend {
    pool: SqlitePool,
    users: SqliteUserStore,
    reference: SqliteReferenceStore,
}

impl SqliteBackend {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: SqliteUserStore::new(pool.clone()),
            reference: SqliteReferenceStore::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn users(&self) -> &SqliteUserStore {
        &self.users
    }

    /// Insert the configured reference data
    pub async fn seed(&self, seed: &SeedConfig) -> AppResult<()> {
        for group in &seed.patron_groups {
            self.reference.insert_patron_group(group).await?;
        }
        for address_type in &seed.address_types {
            self.reference.insert_address_type(address_type).await?;
        }
        for service_point in &seed.service_points {
            self.reference.insert_service_point(service_point).await?;
        }

        let known = self.reference.departments().await?;
        for department in &seed.departments {
            if !known.iter().any(|existing| existing.name == department.name) {
                self.reference.insert_department(department).await?;
            }
        }

        if !seed.custom_fields.is_empty() {
            self.reference.replace_custom_fields(&seed.custom_fields).await?;
        }

        info!(
            patron_groups = seed.patron_groups.len(),
            address_types = seed.address_types.len(),
            service_points = seed.service_points.len(),
            departments = seed.departments.len(),
            custom_fields = seed.custom_fields.len(),
            "Seeded reference data"
        );
        Ok(())
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn connect(config: &DatabaseBackendConfig) -> AppResult<Self> {
        config
            .validate()
            .map_err(|e| AppError::Configuration(format!("Invalid backend config: {}", e)))?;

        let max_connections = if config.is_memory_database() {
            1
        } else {
            config.max_connections
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(&config.connect_url())
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to SQLite: {}", e)))?;

        Ok(Self::new(pool))
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Health check failed: {}", e)))?;

        Ok(())
    }

    async fn init_schema(&self) -> AppResult<()> {
        super::schema::init_schema(&self.pool).await
    }
}

#[async_trait]
impl ReferenceDataBackend for SqliteBackend {
    async fn list_patron_groups(&self) -> AppResult<Vec<PatronGroup>> {
        self.reference.patron_groups().await
    }

    async fn list_address_types(&self) -> AppResult<Vec<AddressType>> {
        self.reference.address_types().await
    }

    async fn list_service_points(&self) -> AppResult<Vec<ServicePoint>> {
        self.reference.service_points().await
    }

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        self.reference.departments().await
    }

    async fn create_department(&self, department: &Department) -> AppResult<Department> {
        self.reference.insert_department(department).await
    }

    async fn update_department(&self, department: &Department) -> AppResult<()> {
        self.reference.update_department(department).await
    }

    async fn list_custom_field_definitions(&self) -> AppResult<Vec<CustomFieldDefinition>> {
        self.reference.custom_fields().await
    }

    async fn update_custom_field_definitions(
        &self,
        definitions: &[CustomFieldDefinition],
    ) -> AppResult<()> {
        self.reference.replace_custom_fields(definitions).await
    }
}

#[async_trait]
impl UserDirectoryBackend for SqliteBackend {
    async fn search_users_by_external_id(
        &self,
        external_system_id: &str,
    ) -> AppResult<Vec<DirectoryUser>> {
        self.users.find_by_external_id(external_system_id).await
    }

    async fn create_user(&self, user: &DirectoryUser) -> AppResult<String> {
        self.users.insert(user).await
    }

    async fn create_permission_user(&self, user_id: &str) -> AppResult<()> {
        self.users.insert_permission_user(user_id).await
    }

    async fn update_user(&self, id: &str, user: &DirectoryUser) -> AppResult<()> {
        self.users.update(id, user).await
    }

    async fn list_users_by_source_type(&self, source_type: &str) -> AppResult<Vec<DirectoryUser>> {
        self.users.list_by_source_type(source_type).await
    }

    async fn deactivate_user(&self, id: &str) -> AppResult<()> {
        self.users.deactivate(id).await
    }
}
