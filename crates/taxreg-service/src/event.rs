//! # Ledger Notifications
//!
//! One [`LedgerEvent`] per observable state change, produced by the store
//! after the change commits. Idempotent no-op grants and revokes produce
//! none.

use serde::{Deserialize, Serialize};

use taxreg_core::{Address, BasisPoints, TaxItemId, Timestamp, Tin};
use taxreg_state::{PaymentRecord, Role, TaxCategory, TaxpayerKind};

/// A committed state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// An admin role was granted.
    AdminAdded { address: Address, role: Role },
    /// An admin role was revoked.
    AdminRemoved { address: Address, role: Role },
    /// A taxpayer profile was created.
    TaxpayerRegistered {
        address: Address,
        tin: Tin,
        kind: TaxpayerKind,
        timestamp: Timestamp,
    },
    /// A tax item was added to the catalog.
    TaxItemCreated {
        id: TaxItemId,
        name: String,
        category: TaxCategory,
        rate_bps: BasisPoints,
    },
    /// A tax item's active flag was written.
    TaxItemUpdated {
        id: TaxItemId,
        is_active: bool,
        timestamp: Timestamp,
    },
    /// A payment was recorded. Carries every field of the record.
    PaymentRecorded(PaymentRecord),
    /// A new logic revision became active.
    UpgradeAuthorized {
        from_version: u32,
        to_version: u32,
        logic: String,
        timestamp: Timestamp,
    },
}

/// Discriminant of a [`LedgerEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AdminAdded,
    AdminRemoved,
    TaxpayerRegistered,
    TaxItemCreated,
    TaxItemUpdated,
    PaymentRecorded,
    UpgradeAuthorized,
}

impl EventKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdminAdded => "admin_added",
            Self::AdminRemoved => "admin_removed",
            Self::TaxpayerRegistered => "taxpayer_registered",
            Self::TaxItemCreated => "tax_item_created",
            Self::TaxItemUpdated => "tax_item_updated",
            Self::PaymentRecorded => "payment_recorded",
            Self::UpgradeAuthorized => "upgrade_authorized",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::AdminAdded { .. } => EventKind::AdminAdded,
            Self::AdminRemoved { .. } => EventKind::AdminRemoved,
            Self::TaxpayerRegistered { .. } => EventKind::TaxpayerRegistered,
            Self::TaxItemCreated { .. } => EventKind::TaxItemCreated,
            Self::TaxItemUpdated { .. } => EventKind::TaxItemUpdated,
            Self::PaymentRecorded(_) => EventKind::PaymentRecorded,
            Self::UpgradeAuthorized { .. } => EventKind::UpgradeAuthorized,
        }
    }

    /// The account this event concerns, if any.
    pub fn address(&self) -> Option<Address> {
        match self {
            Self::AdminAdded { address, .. }
            | Self::AdminRemoved { address, .. }
            | Self::TaxpayerRegistered { address, .. } => Some(*address),
            Self::PaymentRecorded(record) => Some(record.payer),
            Self::TaxItemCreated { .. }
            | Self::TaxItemUpdated { .. }
            | Self::UpgradeAuthorized { .. } => None,
        }
    }
}
