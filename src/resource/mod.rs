use std::sync::Arc;

use crate::backend::Backend;
use crate::import::UserImporter;

pub mod health;
pub mod import;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub importer: UserImporter,
    pub backend: Arc<dyn Backend>,
}

impl AppState {
    pub fn new(importer: UserImporter, backend: Arc<dyn Backend>) -> Self {
        Self { importer, backend }
    }
}
