//! # Logic Upgrades and Snapshot Restore
//!
//! Verifies that:
//!
//! - an authorized upgrade swaps the active logic without touching any
//!   persisted entity (the state digest is unchanged)
//! - incompatible targets and non-Super-Admin callers are rejected before
//!   anything changes
//! - a snapshot written to disk restores to an identical registry, and only
//!   under logic that can interpret its storage layout
//! - restore refuses snapshots whose indexes or upgrade history were edited

use std::sync::Arc;

use taxreg_core::{Address, PaymentId, TaxItemId, Timestamp};
use taxreg_service::{
    EventKind, LedgerEvent, LedgerSnapshot, ManualClock, RegistryConfig, SnapshotError,
    TaxRegistry,
};
use taxreg_state::{
    ErrorKind, IncompatibleTarget, IndividualRegistration, InvariantViolation, LayoutViolation,
    LedgerError, LogicDescriptor, NewTaxItem, PaymentRequest, Role, StorageLayout, TaxCategory,
    MIGRATION_ENTRY_SLOT,
};

fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[0] = 0xc0;
    bytes[19] = n;
    Address::from_bytes(bytes)
}

const SUPER: u8 = 1;
const SUB: u8 = 2;
const PAYER: u8 = 7;

fn config() -> RegistryConfig {
    let mut config = RegistryConfig::new(addr(SUPER));
    config.trace_events = false;
    config
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Timestamp::parse("2025-06-01T00:00:00Z").unwrap(),
    ))
}

fn v2() -> LogicDescriptor {
    LogicDescriptor {
        name: "taxreg-ledger".into(),
        version: 2,
        migration_entry: Some(MIGRATION_ENTRY_SLOT),
        layout: StorageLayout::v1()
            .with_field("tax_item", "jurisdiction", "string")
            .with_entity("refund_record", &[("payment_id", "payment_id"), ("amount", "u128")]),
    }
}

/// A registry holding one Sub-Admin, one item, one taxpayer and one payment.
fn populated() -> (TaxRegistry, Arc<ManualClock>) {
    let clock = clock();
    let registry = TaxRegistry::with_clock(config(), clock.clone()).unwrap();
    registry
        .grant_admin(&addr(SUPER), Role::SubAdmin, addr(SUB))
        .unwrap();
    registry
        .create_tax_item(
            &addr(SUB),
            NewTaxItem {
                name: "Capital gains".into(),
                description: "Gains on disposals".into(),
                category: TaxCategory::CapitalGains,
                rate_bps: 150,
            },
        )
        .unwrap();
    registry
        .register_individual(
            addr(PAYER),
            "T-77",
            IndividualRegistration {
                first_name: "Kemi".into(),
                gender: "female".into(),
                ..Default::default()
            },
        )
        .unwrap();
    clock.advance(120);
    registry
        .record_payment(&addr(SUB), payment(250_000, "S1"))
        .unwrap();
    (registry, clock)
}

fn payment(amount: u128, reference: &str) -> PaymentRequest {
    PaymentRequest {
        payer: addr(PAYER),
        tin: "T-77".into(),
        tax_item_id: TaxItemId::new(1),
        amount,
        payment_reference: format!("PAY-{reference}"),
        receipt_reference: format!("RCT-{reference}"),
    }
}

// ===========================================================================
// Upgrade gate
// ===========================================================================

/// Upgrading swaps logic metadata only: every persisted entity is intact
/// and the ledger keeps accepting payments afterwards.
#[test]
fn upgrade_preserves_persisted_state() {
    let (registry, clock) = populated();
    let before = registry.state_digest().unwrap();

    clock.advance(30);
    let record = registry.authorize_upgrade(&addr(SUPER), v2()).unwrap();
    assert_eq!(record.from_version, 1);
    assert_eq!(record.to_version, 2);
    assert_eq!(record.authorized_by, addr(SUPER));

    assert_eq!(registry.state_digest().unwrap(), before);
    assert_eq!(registry.active_logic(), v2());
    assert_eq!(registry.upgrade_history(), vec![record]);
    assert_eq!(registry.payment_history(&addr(PAYER)), vec![PaymentId::new(1)]);

    let next = registry
        .record_payment(&addr(SUB), payment(10_000, "S2"))
        .unwrap();
    assert_eq!(next.id, PaymentId::new(2));

    let upgrades = registry.journal().entries_by_kind(EventKind::UpgradeAuthorized);
    assert_eq!(upgrades.len(), 1);
    assert!(matches!(
        upgrades[0].event,
        LedgerEvent::UpgradeAuthorized {
            from_version: 1,
            to_version: 2,
            ..
        }
    ));
}

/// Every rejected upgrade leaves the active logic and history unchanged.
#[test]
fn incompatible_upgrades_rejected() {
    let (registry, _clock) = populated();

    let err = registry.authorize_upgrade(&addr(SUB), v2()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let mut no_entry = v2();
    no_entry.migration_entry = None;
    let err = registry.authorize_upgrade(&addr(SUPER), no_entry).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::IncompatibleTarget(IncompatibleTarget::MissingMigrationEntry { .. })
    ));

    let mut same_version = v2();
    same_version.version = 1;
    let err = registry
        .authorize_upgrade(&addr(SUPER), same_version)
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::IncompatibleTarget(IncompatibleTarget::VersionNotIncreasing { .. })
    ));

    let mut dropped_entity = v2();
    dropped_entity.layout = StorageLayout {
        entities: StorageLayout::v1().entities[1..].to_vec(),
    };
    let err = registry
        .authorize_upgrade(&addr(SUPER), dropped_entity)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UpgradeIncompatible);

    assert_eq!(registry.active_logic(), LogicDescriptor::builtin());
    assert!(registry.upgrade_history().is_empty());
    assert!(registry
        .journal()
        .entries_by_kind(EventKind::UpgradeAuthorized)
        .is_empty());
}

// ===========================================================================
// Snapshot restore
// ===========================================================================

/// A snapshot written to disk restores to a registry with the same state,
/// the same active logic and an empty journal.
#[test]
fn snapshot_file_restores_identical_registry() {
    let (registry, clock) = populated();
    registry.authorize_upgrade(&addr(SUPER), v2()).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger-snapshot.json");
    registry.snapshot().write_to(&path).unwrap();

    let mut running = config();
    running.logic = v2();
    let snapshot = LedgerSnapshot::read_from(&path).unwrap();
    let restored = TaxRegistry::restore(running, snapshot, clock.clone()).unwrap();

    assert_eq!(restored.state_digest().unwrap(), registry.state_digest().unwrap());
    assert_eq!(restored.active_logic(), v2());
    assert_eq!(restored.upgrade_history(), registry.upgrade_history());
    assert_eq!(restored.address_of("T-77"), Some(addr(PAYER)));
    assert!(restored.has_role(Role::SubAdmin, &addr(SUB)));
    assert!(restored.journal().is_empty());

    // The restored registry continues allocating where the original stopped.
    let next = restored
        .record_payment(&addr(SUB), payment(5, "S3"))
        .unwrap();
    assert_eq!(next.id, PaymentId::new(2));
}

/// Logic that cannot read the snapshot's layout refuses to restore it.
#[test]
fn older_logic_refuses_newer_snapshot() {
    let (registry, clock) = populated();
    registry.authorize_upgrade(&addr(SUPER), v2()).unwrap();
    let snapshot = registry.snapshot();

    let err = TaxRegistry::restore(config(), snapshot, clock).unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::Incompatible(IncompatibleTarget::Layout(LayoutViolation::EntityRemoved { .. }))
            | SnapshotError::Incompatible(IncompatibleTarget::Layout(LayoutViolation::FieldRemoved { .. }))
    ));
}

/// A snapshot is restored only under a valid configuration.
#[test]
fn restore_requires_valid_config() {
    let (registry, clock) = populated();
    let mut bad = config();
    bad.initial_super_admin = Address::ZERO;
    let err = TaxRegistry::restore(bad, registry.snapshot(), clock).unwrap_err();
    assert!(matches!(err, SnapshotError::Config(_)));
}

/// Hand-edited snapshots whose indexes disagree with their entities are
/// refused.
#[test]
fn tampered_history_refused() {
    let (registry, clock) = populated();
    let mut json: serde_json::Value = serde_json::to_value(registry.snapshot()).unwrap();
    let payer = addr(PAYER).to_string();
    json["ledger"]["histories"][payer.as_str()] = serde_json::json!([1, 1]);
    let tampered: LedgerSnapshot = serde_json::from_value(json).unwrap();

    let err = TaxRegistry::restore(config(), tampered, clock).unwrap_err();
    assert!(matches!(err, SnapshotError::Inconsistent(_)));
}

/// An upgrade history that does not lead to the snapshot's active logic is
/// refused, even when every entity table is intact.
#[test]
fn forged_upgrade_history_refused() {
    let (registry, clock) = populated();
    let mut json: serde_json::Value = serde_json::to_value(registry.snapshot()).unwrap();
    assert_eq!(json["upgrade_history"], serde_json::json!([]));
    json["upgrade_history"] = serde_json::json!([{
        "from_version": 7,
        "to_version": 9,
        "logic": "forged",
        "authorized_by": addr(SUB).to_string(),
        "timestamp": "2025-06-01T00:00:00Z",
    }]);
    let forged: LedgerSnapshot = serde_json::from_value(json).unwrap();

    let err = TaxRegistry::restore(config(), forged, clock.clone()).unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::Inconsistent(InvariantViolation::UpgradeChain { position: 0, .. })
    ));

    // A genuine history survives the same round trip.
    registry.authorize_upgrade(&addr(SUPER), v2()).unwrap();
    let mut running = config();
    running.logic = v2();
    let restored = TaxRegistry::restore(running, registry.snapshot(), clock).unwrap();
    assert_eq!(restored.upgrade_history(), registry.upgrade_history());
}
