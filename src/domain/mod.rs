//! Domain layer: reconciliation of stored visit records.
//!
//! Leaves first: payload decoding, storage key resolution, the status
//! vocabulary, raw records and their merge rule, the canonical [`Visit`]
//! and its normalizer, ledger metrics, and the projections handed to
//! callers.

pub mod keys;
pub mod ledger;
pub mod metrics;
pub mod partner_id;
pub mod payload;
pub mod record;
pub mod reward;
pub mod status;
pub mod visit;
pub mod warning;

pub use ledger::{PartnerLedger, UserBonus};
pub use metrics::Metrics;
pub use partner_id::PartnerId;
pub use record::{LoadedRecord, RawRecord, SourceKey};
pub use reward::{Reward, RewardCatalog};
pub use status::RawStatus;
pub use visit::Visit;
pub use warning::FetchWarning;
