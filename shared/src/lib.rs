pub mod fixtures;
pub mod models;
pub mod validation;

pub use fixtures::*;
pub use models::*;
pub use validation::{FieldError, Validatable, ValidationBuilder, ValidationError};
