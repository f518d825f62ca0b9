//! # Ledger State
//!
//! The single store owning every component and index. Each mutation
//! validates through the owning component, commits, and returns the
//! notifications the change produced in an [`Applied`]. `LedgerState` does
//! no locking of its own; [`crate::TaxRegistry`] holds it behind one
//! `RwLock` and is the only path to `&mut LedgerState` at runtime.

use serde::Serialize;

use taxreg_core::{
    sha256_digest, Address, CanonicalBytes, CanonicalizationError, ContentDigest, TaxItemId,
    Timestamp,
};
use taxreg_state::{
    BusinessRegistration, IncompatibleTarget, IndividualRegistration, InvariantViolation,
    LedgerError, LogicDescriptor, NewTaxItem, PaymentLedger, PaymentRecord, PaymentRequest, Role,
    RoleManager, TaxItem, TaxItemCatalog, TaxpayerProfile, TaxpayerRegistry, UpgradeGate,
    UpgradeRecord,
};

use crate::event::LedgerEvent;

/// The result of a committed mutation plus the events it produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied<T> {
    pub value: T,
    pub events: Vec<LedgerEvent>,
}

impl<T> Applied<T> {
    fn new(value: T, events: Vec<LedgerEvent>) -> Self {
        Self { value, events }
    }
}

/// The persisted entities, excluding logic metadata.
#[derive(Serialize)]
struct PersistedView<'a> {
    roles: &'a RoleManager,
    registry: &'a TaxpayerRegistry,
    catalog: &'a TaxItemCatalog,
    ledger: &'a PaymentLedger,
}

/// Every component of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerState {
    roles: RoleManager,
    registry: TaxpayerRegistry,
    catalog: TaxItemCatalog,
    ledger: PaymentLedger,
    gate: UpgradeGate,
}

impl LedgerState {
    /// Fresh state with one Super-Admin and `logic` active.
    pub fn new(initial_super_admin: Address, logic: LogicDescriptor) -> Result<Self, LedgerError> {
        Ok(Self {
            roles: RoleManager::new(initial_super_admin)?,
            registry: TaxpayerRegistry::new(),
            catalog: TaxItemCatalog::new(),
            ledger: PaymentLedger::new(),
            gate: UpgradeGate::new(logic)?,
        })
    }

    /// Reassemble state from persisted parts, checking every derived index.
    pub fn from_parts(
        roles: RoleManager,
        registry: TaxpayerRegistry,
        catalog: TaxItemCatalog,
        ledger: PaymentLedger,
        gate: UpgradeGate,
    ) -> Result<Self, InvariantViolation> {
        let state = Self {
            roles,
            registry,
            catalog,
            ledger,
            gate,
        };
        state.check_consistency()?;
        Ok(state)
    }

    // -- Roles --------------------------------------------------------------

    pub fn grant_admin(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<Applied<bool>, LedgerError> {
        let changed = self.roles.grant(caller, role, account)?;
        let events = if changed {
            vec![LedgerEvent::AdminAdded {
                address: account,
                role,
            }]
        } else {
            Vec::new()
        };
        Ok(Applied::new(changed, events))
    }

    pub fn revoke_admin(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<Applied<bool>, LedgerError> {
        let changed = self.roles.revoke(caller, role, account)?;
        let events = if changed {
            vec![LedgerEvent::AdminRemoved {
                address: account,
                role,
            }]
        } else {
            Vec::new()
        };
        Ok(Applied::new(changed, events))
    }

    // -- Registry -----------------------------------------------------------

    pub fn register_individual(
        &mut self,
        address: Address,
        tin: &str,
        registration: IndividualRegistration,
        now: Timestamp,
    ) -> Result<Applied<TaxpayerProfile>, LedgerError> {
        let profile = self
            .registry
            .register_individual(&mut self.roles, address, tin, registration, now)?
            .clone();
        Ok(Self::registered(address, profile))
    }

    pub fn register_business(
        &mut self,
        address: Address,
        tin: &str,
        registration: BusinessRegistration,
        now: Timestamp,
    ) -> Result<Applied<TaxpayerProfile>, LedgerError> {
        let profile = self
            .registry
            .register_business(&mut self.roles, address, tin, registration, now)?
            .clone();
        Ok(Self::registered(address, profile))
    }

    fn registered(address: Address, profile: TaxpayerProfile) -> Applied<TaxpayerProfile> {
        let event = LedgerEvent::TaxpayerRegistered {
            address,
            tin: profile.tin().clone(),
            kind: profile.kind(),
            timestamp: profile.registered_at(),
        };
        Applied::new(profile, vec![event])
    }

    // -- Catalog ------------------------------------------------------------

    pub fn create_tax_item(
        &mut self,
        caller: &Address,
        item: NewTaxItem,
        now: Timestamp,
    ) -> Result<Applied<TaxItem>, LedgerError> {
        let item = self.catalog.create(&self.roles, caller, item, now)?.clone();
        let event = LedgerEvent::TaxItemCreated {
            id: item.id,
            name: item.name.clone(),
            category: item.category,
            rate_bps: item.rate_bps,
        };
        Ok(Applied::new(item, vec![event]))
    }

    pub fn set_tax_item_active(
        &mut self,
        caller: &Address,
        id: TaxItemId,
        active: bool,
        now: Timestamp,
    ) -> Result<Applied<TaxItem>, LedgerError> {
        let item = self
            .catalog
            .set_active(&self.roles, caller, id, active, now)?
            .clone();
        let event = LedgerEvent::TaxItemUpdated {
            id: item.id,
            is_active: item.is_active,
            timestamp: item.updated_at,
        };
        Ok(Applied::new(item, vec![event]))
    }

    // -- Ledger -------------------------------------------------------------

    pub fn record_payment(
        &mut self,
        caller: &Address,
        request: PaymentRequest,
        now: Timestamp,
    ) -> Result<Applied<PaymentRecord>, LedgerError> {
        let record = self
            .ledger
            .record(
                &self.roles,
                caller,
                &self.catalog,
                &mut self.registry,
                request,
                now,
            )?
            .clone();
        let event = LedgerEvent::PaymentRecorded(record.clone());
        Ok(Applied::new(record, vec![event]))
    }

    // -- Upgrade ------------------------------------------------------------

    pub fn authorize_upgrade(
        &mut self,
        caller: &Address,
        target: LogicDescriptor,
        now: Timestamp,
    ) -> Result<Applied<UpgradeRecord>, LedgerError> {
        let record = self.gate.authorize(&self.roles, caller, target, now)?.clone();
        let event = LedgerEvent::UpgradeAuthorized {
            from_version: record.from_version,
            to_version: record.to_version,
            logic: record.logic.clone(),
            timestamp: record.timestamp,
        };
        Ok(Applied::new(record, vec![event]))
    }

    // -- Accessors ----------------------------------------------------------

    pub fn roles(&self) -> &RoleManager {
        &self.roles
    }

    pub fn registry(&self) -> &TaxpayerRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &TaxItemCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    pub fn gate(&self) -> &UpgradeGate {
        &self.gate
    }

    /// Digest over every persisted entity. Logic metadata is excluded, so
    /// an upgrade leaves it unchanged.
    pub fn persisted_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        let view = PersistedView {
            roles: &self.roles,
            registry: &self.registry,
            catalog: &self.catalog,
            ledger: &self.ledger,
        };
        Ok(sha256_digest(&CanonicalBytes::new(&view)?))
    }

    /// Verify every derived index against the entities it indexes, and the
    /// upgrade history against the active logic.
    pub fn check_consistency(&self) -> Result<(), InvariantViolation> {
        self.registry.check_consistency(&self.roles)?;
        self.catalog.check_consistency()?;
        self.ledger.check_consistency(&self.catalog)?;
        self.gate.check_consistency()?;
        Ok(())
    }

    /// Whether `logic` may operate over this state's persisted layout.
    pub fn check_interpretable_by(&self, logic: &LogicDescriptor) -> Result<(), IncompatibleTarget> {
        logic.check_interprets(&self.gate.active_logic().layout)
    }
}
