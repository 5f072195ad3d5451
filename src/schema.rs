pub mod selector;
pub mod validator;

pub use selector::{select_schema, SelectionError, JSON_MEDIA_TYPE};
pub use validator::{resolve_schema, validate_instance, ValidationError, Violation, Violations};
