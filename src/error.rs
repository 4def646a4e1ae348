// ⚠️ Risk Control Errors
// One error type for the library; binaries wrap it in anyhow

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid rule {rule_id}: {reason}")]
    InvalidRule { rule_id: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned: {0}")]
    Lock(String),
}

impl RiskError {
    pub fn validation(message: impl Into<String>) -> Self {
        RiskError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        RiskError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn invalid_rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        RiskError::InvalidRule {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
