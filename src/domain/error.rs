use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("required schema key `{key}` is missing")]
    MissingKey { key: &'static str },
    #[error("schema record for `{key}` already exists")]
    DuplicateKey { key: String },
    #[error("schema validation failed: {message}")]
    Validation { message: String },
    #[error("invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn missing_key(key: &'static str) -> Self {
        Self::MissingKey { key }
    }

    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
