//! # Ledger Errors
//!
//! One variant per named failure so callers can branch on cause.
//! [`LedgerError::kind()`] folds them into the six-way [`ErrorKind`]
//! taxonomy.
//!
//! Every error is raised during validation, before any write. A returned
//! `Err` guarantees zero observable state change.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use taxreg_core::{Address, ContentDigest, PaymentId, TaxItemId, Tin};

use crate::profile::TaxpayerKind;
use crate::role::Role;
use crate::upgrade::LayoutViolation;

/// Coarse classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Caller lacks the required role.
    Authorization,
    /// Empty, zero, or malformed input; unrecognized enum literal.
    Validation,
    /// TIN or profile already exists.
    Conflict,
    /// Referenced item or tin/address pair does not resolve, or resolves
    /// to a mismatched owner.
    Referential,
    /// Lookup by id or address found no entity.
    NotFound,
    /// Upgrade target lacks the required migration surface.
    UpgradeIncompatible,
}

impl ErrorKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::Referential => "referential",
            Self::NotFound => "not_found",
            Self::UpgradeIncompatible => "upgrade_incompatible",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by ledger operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // -- Authorization ------------------------------------------------------
    /// Caller does not hold (or dominate) the required role.
    #[error("unauthorized: {caller} lacks role {required}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The role the operation requires.
        required: Role,
    },

    // -- Validation ---------------------------------------------------------
    /// Role is not administrable through grant/revoke.
    #[error("invalid role for admin grant/revoke: {0}")]
    InvalidRole(Role),

    /// The null address was supplied where an account is required.
    #[error("zero address")]
    ZeroAddress,

    /// Empty tax identification number.
    #[error("tax identification number must be non-empty")]
    EmptyTin,

    /// Gender literal is not exactly "male" or "female".
    #[error("invalid gender: \"{0}\"")]
    InvalidGender(String),

    /// Empty tax item name.
    #[error("tax item name must be non-empty")]
    EmptyName,

    /// Empty tax item description.
    #[error("tax item description must be non-empty")]
    EmptyDescription,

    /// Payment amount is zero.
    #[error("payment amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// The rejected amount.
        amount: u128,
    },

    /// Empty external payment reference.
    #[error("payment reference must be non-empty")]
    MissingPaymentReference,

    /// Empty external receipt identifier.
    #[error("receipt reference must be non-empty")]
    MissingReceiptReference,

    // -- Conflict -----------------------------------------------------------
    /// The TIN is already mapped to an address.
    #[error("tin already registered: {0}")]
    TinExists(Tin),

    /// The address already owns an individual or business profile.
    #[error("address already owns a taxpayer profile: {0}")]
    ProfileExists(Address),

    // -- Referential --------------------------------------------------------
    /// Payment references a tax item that does not exist.
    #[error("payment references unknown {0}")]
    ItemNotFound(TaxItemId),

    /// Payment references a deactivated tax item.
    #[error("payment references inactive {0}")]
    ItemInactive(TaxItemId),

    /// The asserted TIN does not resolve to the payer.
    #[error("tin \"{tin}\" does not resolve to payer {payer}")]
    TinAddressMismatch {
        /// The offending TIN as supplied.
        tin: String,
        /// The payer the TIN was asserted for.
        payer: Address,
    },

    // -- Not found ----------------------------------------------------------
    /// No tax item with this id.
    #[error("{0} not found")]
    TaxItemNotFound(TaxItemId),

    /// No payment record with this id.
    #[error("{0} not found")]
    PaymentNotFound(PaymentId),

    /// No profile of the expected kind at this address.
    #[error("no {expected} profile for {address}")]
    ProfileNotFound {
        /// The queried address.
        address: Address,
        /// The profile kind the lookup asked for.
        expected: TaxpayerKind,
    },

    // -- Upgrade ------------------------------------------------------------
    /// The upgrade target cannot interpret the persisted state.
    #[error("incompatible upgrade target: {0}")]
    IncompatibleTarget(#[from] IncompatibleTarget),
}

impl LedgerError {
    /// The taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::InvalidRole(_)
            | Self::ZeroAddress
            | Self::EmptyTin
            | Self::InvalidGender(_)
            | Self::EmptyName
            | Self::EmptyDescription
            | Self::NonPositiveAmount { .. }
            | Self::MissingPaymentReference
            | Self::MissingReceiptReference => ErrorKind::Validation,
            Self::TinExists(_) | Self::ProfileExists(_) => ErrorKind::Conflict,
            Self::ItemNotFound(_) | Self::ItemInactive(_) | Self::TinAddressMismatch { .. } => {
                ErrorKind::Referential
            }
            Self::TaxItemNotFound(_) | Self::PaymentNotFound(_) | Self::ProfileNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::IncompatibleTarget(_) => ErrorKind::UpgradeIncompatible,
        }
    }
}

/// Why an upgrade target was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IncompatibleTarget {
    /// The target exposes no migration entry point.
    #[error("target {logic} v{version} exposes no migration entry point")]
    MissingMigrationEntry {
        /// Target logic name.
        logic: String,
        /// Target version.
        version: u32,
    },

    /// The target's migration entry point is not the one this ledger speaks.
    #[error("migration entry mismatch: expected {expected}, found {found}")]
    MigrationEntryMismatch {
        /// The slot this ledger requires.
        expected: ContentDigest,
        /// The slot the target exposes.
        found: ContentDigest,
    },

    /// The target version does not move forward.
    #[error("target version {target} does not exceed active version {active}")]
    VersionNotIncreasing {
        /// Currently active version.
        active: u32,
        /// Rejected target version.
        target: u32,
    },

    /// The target layout does not extend the persisted layout.
    #[error("storage layout violation: {0}")]
    Layout(#[from] LayoutViolation),
}

/// A derived structure disagrees with the entities it indexes.
///
/// Never produced by the ledger's own operations; raised when checking
/// state that arrived from outside (a restored snapshot).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// The TIN index and the profile table disagree.
    #[error("tin index inconsistent for tin \"{tin}\"")]
    TinIndex {
        /// The inconsistent TIN.
        tin: String,
    },

    /// A profile owner lacks the Tax-Payer role, or a Tax-Payer has no profile.
    #[error("tax-payer role out of sync with profiles at {0}")]
    TaxpayerRole(Address),

    /// A profile is keyed under the null address.
    #[error("profile stored under the zero address")]
    ZeroAddressProfile,

    /// A stored id does not equal its dense position.
    #[error("{entity} id {found} stored at position {expected}")]
    NonDenseId {
        /// Entity table name.
        entity: &'static str,
        /// The id its position implies.
        expected: u64,
        /// The id actually stored.
        found: u64,
    },

    /// A payment references a tax item that does not exist.
    #[error("{payment} references unknown {item}")]
    DanglingItem {
        /// The offending record.
        payment: PaymentId,
        /// The missing item.
        item: TaxItemId,
    },

    /// Payment histories do not partition the payment table in order.
    #[error("payment history inconsistent for {0}")]
    History(Address),

    /// An upgrade record does not continue the chain that ends at the
    /// active logic.
    #[error("upgrade record {position} breaks the chain: {reason}")]
    UpgradeChain {
        /// Index into the upgrade history.
        position: usize,
        reason: &'static str,
    },
}
