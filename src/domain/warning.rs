//! Non-fatal store fetch failures collected during a ledger load.

use std::fmt;

use serde::Serialize;
use utoipa::ToSchema;

/// Store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FetchOperation {
    /// Set membership read.
    Smembers,
    /// Hash read.
    Hgetall,
}

impl fmt::Display for FetchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smembers => f.write_str("SMEMBERS"),
            Self::Hgetall => f.write_str("HGETALL"),
        }
    }
}

/// One failed fetch. The ledger treats the key as holding nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FetchWarning {
    /// Key that could not be read.
    pub key: String,
    /// Operation that failed.
    pub operation: FetchOperation,
    /// Error message from the store.
    pub message: String,
}

impl FetchWarning {
    /// Records a failed fetch and logs it.
    pub fn new(key: impl Into<String>, operation: FetchOperation, error: impl fmt::Display) -> Self {
        let warning = Self {
            key: key.into(),
            operation,
            message: error.to_string(),
        };
        tracing::warn!(
            key = %warning.key,
            operation = %warning.operation,
            error = %warning.message,
            "store fetch failed, continuing without it"
        );
        warning
    }
}
