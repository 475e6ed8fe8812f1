//! SQLite user directory
//!
//! ```text
//! SqliteBackend (backend_impl.rs)
//!     ├── SqliteUserStore      (accounts, user_store.rs)
//!     └── SqliteReferenceStore (lookup tables, reference_store.rs)
//! ```

pub mod backend_impl;
pub mod config;
pub mod reference_store;
pub mod schema;
pub mod user_store;

pub use backend_impl::SqliteBackend;
pub use config::DatabaseBackendConfig;
