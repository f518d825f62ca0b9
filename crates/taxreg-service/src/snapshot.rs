//! # Snapshots
//!
//! A [`LedgerSnapshot`] is the full persisted state plus the active logic
//! and its upgrade history, serialized as JSON. Restoring checks, before
//! anything is rebuilt, that:
//!
//! 1. the running logic can interpret the snapshot's storage layout and is
//!    not older than the logic that wrote it;
//! 2. the TIN index, Tax-Payer roles, dense ids and payment histories agree
//!    with the entities they index.
//!
//! The restored registry keeps the snapshot's active logic; only the
//! upgrade gate changes it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use taxreg_core::Timestamp;
use taxreg_state::{
    IncompatibleTarget, InvariantViolation, LogicDescriptor, PaymentLedger, RoleManager,
    TaxItemCatalog, TaxpayerRegistry, UpgradeGate, UpgradeRecord,
};

use crate::config::ConfigError;
use crate::state::LedgerState;

/// Errors writing, reading or restoring a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// IO error reading or writing the snapshot file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot is not valid JSON for this layout.
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),

    /// The running logic cannot interpret the snapshot.
    #[error("snapshot incompatible with running logic: {0}")]
    Incompatible(#[from] IncompatibleTarget),

    /// A derived index disagrees with the entities it indexes.
    #[error("snapshot inconsistent: {0}")]
    Inconsistent(#[from] InvariantViolation),

    /// The configuration to restore under is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Serialized image of a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub taken_at: Timestamp,
    pub roles: RoleManager,
    pub registry: TaxpayerRegistry,
    pub catalog: TaxItemCatalog,
    pub ledger: PaymentLedger,
    pub active_logic: LogicDescriptor,
    pub upgrade_history: Vec<UpgradeRecord>,
}

impl LedgerSnapshot {
    /// Copy the full state.
    pub fn capture(state: &LedgerState, taken_at: Timestamp) -> Self {
        Self {
            taken_at,
            roles: state.roles().clone(),
            registry: state.registry().clone(),
            catalog: state.catalog().clone(),
            ledger: state.ledger().clone(),
            active_logic: state.gate().active_logic().clone(),
            upgrade_history: state.gate().upgrade_history().to_vec(),
        }
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as JSON to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a JSON snapshot from `path`.
    pub fn read_from(path: &Path) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Rebuild state for a process running `logic`.
    pub fn into_state(self, logic: &LogicDescriptor) -> Result<LedgerState, SnapshotError> {
        logic.check_interprets(&self.active_logic.layout)?;
        if logic.version < self.active_logic.version {
            return Err(IncompatibleTarget::VersionNotIncreasing {
                active: self.active_logic.version,
                target: logic.version,
            }
            .into());
        }
        let gate = UpgradeGate::from_parts(self.active_logic, self.upgrade_history);
        Ok(LedgerState::from_parts(
            self.roles,
            self.registry,
            self.catalog,
            self.ledger,
            gate,
        )?)
    }
}
