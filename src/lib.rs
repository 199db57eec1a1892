//! # zabava-ledger
//!
//! Read-side visit ledger for the Zabava loyalty platform.
//!
//! Partners record customer visits in Redis under two coexisting key
//! schemes, with payloads that are sometimes JSON-encoded twice. This
//! crate reconciles those records into one canonical ledger per partner
//! and one points view per customer, and serves both over HTTP. It never
//! writes to the store.
//!
//! ## Architecture
//!
//! ```text
//! Clients (partner & customer dashboards)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── LedgerService (service/)
//!     │     └── RecordLoader: bounded, order-preserving fetches
//!     │
//!     ├── Key resolution, payload decoding, normalization,
//!     │   metrics and projections (domain/)
//!     │
//!     └── KeyValueStore (store/): Redis or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod store;
