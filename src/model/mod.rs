pub mod department;
pub mod leave_request;
pub mod role;
pub mod user;

use thiserror::Error;

/// Raised when a stored string column does not map back to a domain enum.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    #[error("unknown request status `{0}`")]
    UnknownStatus(String),
    #[error("unknown leave kind `{0}`")]
    UnknownKind(String),
}
