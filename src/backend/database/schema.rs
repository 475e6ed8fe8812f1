use crate::error::{AppError, AppResult};
use sqlx::SqlitePool;

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            external_system_id TEXT UNIQUE,
            source_type TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            data TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
    (
        "patron_groups",
        r#"
        CREATE TABLE IF NOT EXISTS patron_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "address_types",
        r#"
        CREATE TABLE IF NOT EXISTS address_types (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    ),
    (
        "service_points",
        r#"
        CREATE TABLE IF NOT EXISTS service_points (
            id TEXT PRIMARY KEY,
            name TEXT,
            code TEXT
        )
        "#,
    ),
    (
        "departments",
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            code TEXT
        )
        "#,
    ),
    (
        "custom_fields",
        r#"
        CREATE TABLE IF NOT EXISTS custom_fields (
            id TEXT PRIMARY KEY,
            ref_id TEXT NOT NULL UNIQUE,
            position INTEGER NOT NULL DEFAULT 0,
            data TEXT NOT NULL
        )
        "#,
    ),
    (
        "permission_users",
        r#"
        CREATE TABLE IF NOT EXISTS permission_users (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            permissions TEXT NOT NULL DEFAULT '[]',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    ),
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_source_type ON users (source_type)",
    "CREATE INDEX IF NOT EXISTS idx_users_external_system_id ON users (external_system_id)",
];

/// Create the directory tables and indexes if they do not exist yet
pub async fn init_schema(pool: &SqlitePool) -> AppResult<()> {
    for (table, sql) in TABLES {
        sqlx::query(sql).execute(pool).await.map_err(|e| {
            AppError::Database(format!("Failed to create {} table: {}", table, e))
        })?;
    }

    for sql in INDEXES {
        sqlx::query(sql)
            .execute(pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create index: {}", e)))?;
    }

    Ok(())
}
