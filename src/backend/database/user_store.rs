use chrono::Utc;
use sqlx::SqlitePool;

use crate::error::{AppError, AppResult};
use crate::models::DirectoryUser;

/// Account storage in the `users` table
///
/// The full account document lives in the `data` column as JSON TEXT; the
/// columns next to it only mirror fields that are looked up.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_external_id(&self, external_system_id: &str) -> AppResult<Vec<DirectoryUser>> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT id, data FROM users WHERE external_system_id = ?1")
                .bind(external_system_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::Database(format!("Failed to search users: {}", e)))?;

        rows.into_iter().map(decode_user).collect()
    }

    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<DirectoryUser>> {
        let row: Option<(String, String)> = sqlx::query_as("SELECT id, data FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read user: {}", e)))?;

        row.map(decode_user).transpose()
    }

    pub async fn list_by_source_type(&self, source_type: &str) -> AppResult<Vec<DirectoryUser>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, data FROM users WHERE source_type = ?1 ORDER BY created_at, username",
        )
        .bind(source_type)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to list users: {}", e)))?;

        rows.into_iter().map(decode_user).collect()
    }

    pub async fn insert(&self, user: &DirectoryUser) -> AppResult<String> {
        let id = user
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut stored = user.clone();
        stored.id = Some(id.clone());
        let data = serde_json::to_string(&stored)?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO users (id, username, external_system_id, source_type, active, data, version, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8)",
        )
        .bind(&id)
        .bind(&stored.username)
        .bind(&stored.external_system_id)
        .bind(&stored.source_type)
        .bind(stored.is_active())
        .bind(&data)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_database_error(e, "create"))?;

        Ok(id)
    }

    pub async fn update(&self, id: &str, user: &DirectoryUser) -> AppResult<()> {
        let mut stored = user.clone();
        stored.id = Some(id.to_string());
        let data = serde_json::to_string(&stored)?;

        let result = sqlx::query(
            "UPDATE users SET username = ?1, external_system_id = ?2, source_type = ?3, active = ?4, data = ?5, version = version + 1, updated_at = ?6 WHERE id = ?7",
        )
        .bind(&stored.username)
        .bind(&stored.external_system_id)
        .bind(&stored.source_type)
        .bind(stored.is_active())
        .bind(&data)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_database_error(e, "update"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    /// Attach an empty permission set to a newly created account
    pub async fn insert_permission_user(&self, user_id: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO permission_users (id, user_id, permissions, created_at) VALUES (?1, ?2, '[]', ?3)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::BadRequest(format!("Permission user for {} already exists", user_id))
            } else {
                AppError::Database(format!("Failed to create permission user: {}", e))
            }
        })?;

        Ok(())
    }

    pub async fn has_permission_user(&self, user_id: &str) -> AppResult<bool> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM permission_users WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read permission user: {}", e)))?;

        Ok(count.0 > 0)
    }

    pub async fn deactivate(&self, id: &str) -> AppResult<()> {
        let mut user = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        user.active = Some(false);
        self.update(id, &user).await
    }
}

fn decode_user((id, data): (String, String)) -> AppResult<DirectoryUser> {
    let mut user: DirectoryUser = serde_json::from_str(&data)?;
    if user.id.as_deref().is_some_and(|stored| stored != id) {
        return Err(AppError::SchemaMismatch(format!(
            "Stored user document {} carries a different id",
            id
        )));
    }
    user.id = Some(id);
    Ok(user)
}

/// Map sqlx errors, turning unique-constraint violations into readable messages
pub fn map_database_error(error: sqlx::Error, action: &str) -> AppError {
    let error_str = error.to_string();
    if error_str.contains("UNIQUE constraint") {
        if error_str.contains("username") {
            AppError::BadRequest("Username already exists".to_string())
        } else if error_str.contains("external_system_id") {
            AppError::BadRequest("External system id already exists".to_string())
        } else {
            AppError::BadRequest("User already exists".to_string())
        }
    } else {
        AppError::Database(format!("Failed to {} user: {}", action, error_str))
    }
}
