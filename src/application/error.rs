use thiserror::Error;

use crate::domain::error::DomainError;
use crate::domain::record::ExportError;
use crate::infra::confluence::WikiError;
use crate::infra::error::InfraError;
use crate::presentation::views::PageBuildError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("wiki error: {0}")]
    Wiki(#[from] WikiError),
    #[error("export error: {0}")]
    Export(#[from] ExportError),
    #[error("page rendering failed: {0}")]
    Page(#[from] PageBuildError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
