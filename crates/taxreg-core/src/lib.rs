//! # taxreg-core: Foundational Types for the Taxpayer Registry
//!
//! The leaf crate of the workspace. It defines the domain primitives every
//! other crate builds on and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Address`, `Tin`,
//!    `TaxItemId`, `PaymentId` are distinct types. A payment id cannot be
//!    passed where a tax item id is expected.
//!
//! 2. **Id 0 is never an entity.** `TaxItemId` and `PaymentId` reserve zero
//!    as the "absent" sentinel; allocation starts at 1.
//!
//! 3. **Integer-only money.** Amounts are `u128` in the smallest currency
//!    unit and rates are basis points. Percentages and tax amounts use
//!    truncating integer division, never floats.
//!
//! 4. **UTC-only timestamps** with seconds precision.
//!
//! 5. **`sha256_digest()` accepts only `&CanonicalBytes`.** Every digest in
//!    the workspace flows through JCS canonicalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `taxreg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod rate;
pub mod temporal;

mod hex;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{Address, PaymentId, TaxItemId, Tin};
pub use rate::{basis_points_to_percent, calculate_tax_amount, BasisPoints, BASIS_POINTS_DENOMINATOR};
pub use temporal::Timestamp;
