use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::{AddressType, CustomFieldDefinition, Department, PatronGroup, ServicePoint};

/// Reference tables consulted by the import engine
#[derive(Clone)]
pub struct SqliteReferenceStore {
    pool: SqlitePool,
}

impl SqliteReferenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn patron_groups(&self) -> AppResult<Vec<PatronGroup>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM patron_groups ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| list_error("patron groups", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| PatronGroup { id, name })
            .collect())
    }

    pub async fn address_types(&self) -> AppResult<Vec<AddressType>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, name FROM address_types ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| list_error("address types", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, name)| AddressType { id, name })
            .collect())
    }

    pub async fn service_points(&self) -> AppResult<Vec<ServicePoint>> {
        let rows: Vec<(String, Option<String>, Option<String>)> =
            sqlx::query_as("SELECT id, name, code FROM service_points ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| list_error("service points", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, code)| ServicePoint { id, name, code })
            .collect())
    }

    pub async fn departments(&self) -> AppResult<Vec<Department>> {
        let rows: Vec<(String, String, Option<String>)> =
            sqlx::query_as("SELECT id, name, code FROM departments ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| list_error("departments", e))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, code)| Department {
                id: Some(id),
                name,
                code,
            })
            .collect())
    }

    pub async fn custom_fields(&self) -> AppResult<Vec<CustomFieldDefinition>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, data FROM custom_fields ORDER BY position, ref_id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| list_error("custom fields", e))?;

        rows.into_iter()
            .map(|(id, data)| {
                let mut definition: CustomFieldDefinition = serde_json::from_str(&data)?;
                definition.id = Some(id);
                Ok(definition)
            })
            .collect()
    }

    pub async fn insert_patron_group(&self, group: &PatronGroup) -> AppResult<()> {
        sqlx::query("INSERT OR REPLACE INTO patron_groups (id, name) VALUES (?1, ?2)")
            .bind(&group.id)
            .bind(&group.name)
            .execute(&self.pool)
            .await
            .map_err(|e| save_error("patron group", e))?;
        Ok(())
    }

    pub async fn insert_address_type(&self, address_type: &AddressType) -> AppResult<()> {
        sqlx::query("INSERT OR REPLACE INTO address_types (id, name) VALUES (?1, ?2)")
            .bind(&address_type.id)
            .bind(&address_type.name)
            .execute(&self.pool)
            .await
            .map_err(|e| save_error("address type", e))?;
        Ok(())
    }

    pub async fn insert_service_point(&self, service_point: &ServicePoint) -> AppResult<()> {
        sqlx::query("INSERT OR REPLACE INTO service_points (id, name, code) VALUES (?1, ?2, ?3)")
            .bind(&service_point.id)
            .bind(&service_point.name)
            .bind(&service_point.code)
            .execute(&self.pool)
            .await
            .map_err(|e| save_error("service point", e))?;
        Ok(())
    }

    /// Insert a department, assigning an id when it has none
    pub async fn insert_department(&self, department: &Department) -> AppResult<Department> {
        let id = department
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        sqlx::query("INSERT INTO departments (id, name, code) VALUES (?1, ?2, ?3)")
            .bind(&id)
            .bind(&department.name)
            .bind(&department.code)
            .execute(&self.pool)
            .await
            .map_err(|e| save_error("department", e))?;

        Ok(Department {
            id: Some(id),
            name: department.name.clone(),
            code: department.code.clone(),
        })
    }

    pub async fn update_department(&self, department: &Department) -> AppResult<()> {
        let id = department
            .id
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Department id is required".to_string()))?;

        let result = sqlx::query("UPDATE departments SET name = ?1, code = ?2 WHERE id = ?3")
            .bind(&department.name)
            .bind(&department.code)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| save_error("department", e))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Department {} not found", id)));
        }
        Ok(())
    }

    /// Replace every stored custom field definition with `definitions`
    pub async fn replace_custom_fields(&self, definitions: &[CustomFieldDefinition]) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| save_error("custom fields", e))?;

        sqlx::query("DELETE FROM custom_fields")
            .execute(&mut *tx)
            .await
            .map_err(|e| save_error("custom fields", e))?;

        for (position, definition) in definitions.iter().enumerate() {
            let id = definition
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let mut stored = definition.clone();
            stored.id = Some(id.clone());
            let data = serde_json::to_string(&stored)?;

            sqlx::query(
                "INSERT INTO custom_fields (id, ref_id, position, data) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&id)
            .bind(&stored.ref_id)
            .bind(position as i64)
            .bind(&data)
            .execute(&mut *tx)
            .await
            .map_err(|e| save_error("custom field", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| save_error("custom fields", e))?;
        Ok(())
    }
}

fn list_error(what: &str, e: sqlx::Error) -> AppError {
    AppError::Database(format!("Failed to list {}: {}", what, e))
}

fn save_error(what: &str, e: sqlx::Error) -> AppError {
    AppError::Database(format!("Failed to save {}: {}", what, e))
}
