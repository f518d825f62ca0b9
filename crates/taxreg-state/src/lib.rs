//! # taxreg-state: Registry Components
//!
//! The five components of the registry, each a plain data structure whose
//! mutating methods validate fully before writing. Nothing here locks or
//! performs I/O; serialization of mutations is the job of the store in
//! `taxreg-service`.
//!
//! ## Components
//!
//! - **Roles** (`role.rs`): Super-Admin / Sub-Admin / Tax-Payer with the
//!   pure authorization function [`permits`].
//!
//! - **Registry** (`registry.rs`): individual and business profiles keyed by
//!   address, with the `tin → address` index.
//!
//! - **Catalog** (`catalog.rs`): append-only tax items with an active flag.
//!
//! - **Ledger** (`ledger.rs`): immutable payment records and per-payer
//!   histories.
//!
//! - **Upgrade** (`upgrade.rs`): the versioned storage-layout contract and
//!   the gate that authorizes new logic revisions.
//!
//! ## Design
//!
//! Components that depend on others take them as explicit arguments
//! (`PaymentLedger::record` borrows the catalog and the registry). Every
//! check runs before the first write, so an `Err` leaves all of them
//! untouched.

pub mod catalog;
pub mod error;
pub mod ledger;
pub mod profile;
pub mod registry;
pub mod role;
pub mod upgrade;

// ─── Error re-exports ───────────────────────────────────────────────

pub use error::{ErrorKind, IncompatibleTarget, InvariantViolation, LedgerError};

// ─── Component re-exports ───────────────────────────────────────────

pub use catalog::{NewTaxItem, TaxCategory, TaxItem, TaxItemCatalog};
pub use ledger::{PaymentLedger, PaymentRecord, PaymentRequest};
pub use profile::{
    BusinessProfile, BusinessRegistration, Gender, IndividualProfile, IndividualRegistration,
    TaxpayerKind, TaxpayerProfile,
};
pub use registry::TaxpayerRegistry;
pub use role::{permits, Role, RoleManager, RoleSet};

// ─── Upgrade re-exports ─────────────────────────────────────────────

pub use upgrade::{
    EntityLayout, FieldLayout, LayoutViolation, LogicDescriptor, StorageLayout, UpgradeGate,
    UpgradeRecord, BUILTIN_LOGIC_NAME, MIGRATION_ENTRY_SLOT,
};
