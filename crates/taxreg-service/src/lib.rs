//! # taxreg-service: The Taxpayer Registry Store
//!
//! Wraps the components of `taxreg-state` in one explicit store
//! ([`LedgerState`]) behind one serialized mutation entry point
//! ([`TaxRegistry`]).
//!
//! ## Architecture
//!
//! - **Store** (`state.rs`): owns roles, profiles, the TIN index, the
//!   catalog, payments, histories and the upgrade gate. Every mutation
//!   returns its value together with the [`LedgerEvent`]s it produced.
//! - **Handle** (`registry.rs`): `Arc<RwLock<LedgerState>>`. Writers hold
//!   the write guard across validate and commit, then notify sinks in commit
//!   order after it drops; readers share the read guard.
//! - **Notifications** (`event.rs`, `sink.rs`): [`EventSink`] receivers, the
//!   bounded digest-carrying [`EventJournal`], and [`TracingSink`].
//! - **Configuration** (`config.rs`): YAML plus environment overrides.
//! - **Snapshots** (`snapshot.rs`): JSON images checked against the running
//!   logic's storage layout on restore.
//!
//! ## Logging
//!
//! Each mutation logs one `info` event when applied or one `warn` event
//! with the error and its kind when rejected. Queries do not log.
//! Installing a subscriber is left to the embedding binary.

pub mod clock;
pub mod config;
pub mod event;
pub mod registry;
pub mod sink;
pub mod snapshot;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, RegistryConfig};
pub use event::{EventKind, LedgerEvent};
pub use registry::TaxRegistry;
pub use sink::{EventJournal, EventSink, JournalEntry, TracingSink};
pub use snapshot::{LedgerSnapshot, SnapshotError};
pub use state::{Applied, LedgerState};

// Pure helpers exposed alongside the query surface.
pub use taxreg_core::{basis_points_to_percent, calculate_tax_amount};
