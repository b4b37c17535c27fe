use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstGrepError {
    /// The member or namespace name cannot appear in a pattern.
    #[error("invalid pattern: {message}")]
    InvalidPattern { message: String },
}
