//! Service layer: ledger read orchestration.
//!
//! [`RecordLoader`] owns every store read and its failure policy;
//! [`LedgerService`] drives a request from key resolution to the
//! projection handed to the API.

pub mod ledger_service;
pub mod record_loader;

pub use ledger_service::LedgerService;
pub use record_loader::{LoadOutcome, RecordLoader, SourcedRecord};
