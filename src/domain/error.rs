use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("`{id}` is not a valid post identifier")]
    InvalidId { id: String },
    #[error("field `{field}` {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
}

impl DomainError {
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId { id: id.into() }
    }

    pub fn validation(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field, message }
    }
}
