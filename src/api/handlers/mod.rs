//! REST endpoint handlers organized by resource.

pub mod partner;
pub mod system;
pub mod user;

use axum::Router;

use crate::app_state::AppState;
use crate::error::LedgerError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(partner::routes())
        .merge(user::routes())
}

/// Rejects path identifiers longer than `max` characters.
fn check_length(name: &str, value: &str, max: usize) -> Result<(), LedgerError> {
    let len = value.chars().count();
    if len > max {
        return Err(LedgerError::InvalidRequest(format!(
            "{name} is {len} characters long, at most {max} allowed"
        )));
    }
    Ok(())
}
