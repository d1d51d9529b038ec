use thiserror::Error;

use crate::types::ScheduleStatus;

/// Error taxonomy shared by every layer.
///
/// `NotFound` deliberately covers both "does not exist" and "belongs to
/// another caregiver" so one tenant cannot probe for another's records.
#[derive(Debug, Error)]
pub enum CareError {
    #[error("not found")]
    NotFound,

    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: ScheduleStatus,
        to: ScheduleStatus,
    },

    #[error("validation failure: {0}")]
    Validation(String),

    #[error("forbidden")]
    Forbidden,

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CareError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CareError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        CareError::Unauthorized(msg.into())
    }

    /// Short error code string sent to clients in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CareError::NotFound => "NOT_FOUND",
            CareError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            CareError::Validation(_) => "VALIDATION_FAILURE",
            CareError::Forbidden => "FORBIDDEN",
            CareError::Unauthorized(_) => "UNAUTHORIZED",
            CareError::Config(_) => "CONFIG_ERROR",
            CareError::Database(_) => "DATABASE_ERROR",
            CareError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, CareError>;
