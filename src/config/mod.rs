pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_toml_str, parse_request, ConfigError};
pub use schema::{BatchOptions, BatchRequest, Operation, ValidationError, ValidationIssue};
