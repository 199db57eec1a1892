//! Data Transfer Objects for REST response serialization.
//!
//! Ledger bodies are camelCase: they are consumed as-is by the partner
//! and customer dashboards.

pub mod common_dto;
pub mod partner_dto;
pub mod user_dto;

pub use common_dto::*;
pub use partner_dto::*;
pub use user_dto::*;
