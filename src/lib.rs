pub mod backend;
pub mod config;
pub mod error;
pub mod extractors;
pub mod import;
pub mod logging;
pub mod models;
pub mod resource;
pub mod schema;
pub mod startup;

// Re-export commonly used types for easier access
pub use import::summary::BatchSummary;
pub use import::UserImporter;
pub use models::{DirectoryUser, ImportBatch, IncomingUser};
