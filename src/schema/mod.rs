pub mod validation;

pub use validation::{validate_batch, BatchValidationErrors};
