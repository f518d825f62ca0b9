//! # Registry Handle
//!
//! [`TaxRegistry`] is the cloneable, thread-safe entry point. Every clone
//! shares one `Arc<RwLock<LedgerState>>`.
//!
//! ## Serialized writer
//!
//! A mutation takes the write guard once and holds it across
//! read-validate-write: the clock is read and the state mutated under one
//! guard. Before the guard drops, the writer takes the emit lock; sinks are
//! then notified with the state unlocked, so they may query the registry,
//! and the next writer waits on the emit lock until they finish. Sinks
//! therefore see events in commit order. Queries take the read guard and
//! run concurrently with each other. Both locks are `parking_lot` and never
//! held across an `.await`; the API is synchronous.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use taxreg_core::{Address, CanonicalizationError, ContentDigest, PaymentId, TaxItemId, Timestamp, Tin};
use taxreg_state::{
    BusinessProfile, BusinessRegistration, IndividualProfile, IndividualRegistration, LedgerError,
    LogicDescriptor, NewTaxItem, PaymentRecord, PaymentRequest, Role, RoleSet, TaxItem,
    TaxpayerKind, TaxpayerProfile, UpgradeRecord,
};

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, RegistryConfig};
use crate::sink::{EventJournal, EventSink, TracingSink};
use crate::snapshot::{LedgerSnapshot, SnapshotError};
use crate::state::{Applied, LedgerState};

struct Inner {
    state: RwLock<LedgerState>,
    /// Taken before the write guard drops and held while sinks run.
    emit: Mutex<()>,
    clock: Arc<dyn Clock>,
    journal: Arc<EventJournal>,
    sinks: Vec<Arc<dyn EventSink>>,
}

/// Shared handle to one registry.
#[derive(Clone)]
pub struct TaxRegistry {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for TaxRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaxRegistry")
            .field("clock", &self.inner.clock)
            .field("journal_len", &self.inner.journal.len())
            .field("sinks", &self.inner.sinks.len())
            .finish()
    }
}

impl TaxRegistry {
    /// Create a registry on the system clock.
    pub fn new(config: RegistryConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a registry reading time from `clock`.
    pub fn with_clock(config: RegistryConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        Self::with_sinks(config, clock, Vec::new())
    }

    /// Create a registry that also notifies `extra_sinks`, in order, after
    /// the journal (and the tracing sink when enabled).
    pub fn with_sinks(
        config: RegistryConfig,
        clock: Arc<dyn Clock>,
        extra_sinks: Vec<Arc<dyn EventSink>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = LedgerState::new(config.initial_super_admin, config.logic.clone()).map_err(
            |e| match e {
                LedgerError::IncompatibleTarget(reason) => ConfigError::IncompatibleLogic(reason),
                _ => ConfigError::ZeroSuperAdmin,
            },
        )?;
        tracing::info!(
            super_admin = %config.initial_super_admin,
            logic = %config.logic.name,
            version = config.logic.version,
            "tax registry created"
        );
        Ok(Self::assemble(state, &config, clock, extra_sinks))
    }

    /// Rebuild a registry from a snapshot.
    ///
    /// `config.initial_super_admin` must still be valid but is not applied:
    /// roles come from the snapshot.
    pub fn restore(
        config: RegistryConfig,
        snapshot: LedgerSnapshot,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SnapshotError> {
        config.validate()?;
        let taken_at = snapshot.taken_at;
        let state = snapshot.into_state(&config.logic).map_err(|e| {
            tracing::warn!(error = %e, "snapshot restore rejected");
            e
        })?;
        tracing::info!(
            %taken_at,
            taxpayers = state.registry().taxpayer_count(),
            payments = state.ledger().payment_count(),
            "tax registry restored"
        );
        Ok(Self::assemble(state, &config, clock, Vec::new()))
    }

    fn assemble(
        state: LedgerState,
        config: &RegistryConfig,
        clock: Arc<dyn Clock>,
        extra_sinks: Vec<Arc<dyn EventSink>>,
    ) -> Self {
        let journal = Arc::new(EventJournal::new(config.journal_capacity));
        let mut sinks: Vec<Arc<dyn EventSink>> = Vec::with_capacity(2 + extra_sinks.len());
        sinks.push(journal.clone());
        if config.trace_events {
            sinks.push(Arc::new(TracingSink));
        }
        sinks.extend(extra_sinks);
        Self {
            inner: Arc::new(Inner {
                state: RwLock::new(state),
                emit: Mutex::new(()),
                clock,
                journal,
                sinks,
            }),
        }
    }

    /// Run one mutation under the write guard, then notify sinks in commit
    /// order with the state unlocked.
    fn mutate<T>(
        &self,
        op: &'static str,
        caller: &Address,
        f: impl FnOnce(&mut LedgerState, Timestamp) -> Result<Applied<T>, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut guard = self.inner.state.write();
        let now = self.inner.clock.now();
        let outcome = f(&mut *guard, now);
        match outcome {
            Ok(Applied { value, events }) => {
                let _emitting = self.inner.emit.lock();
                drop(guard);
                for event in &events {
                    for sink in &self.inner.sinks {
                        sink.emit(event);
                    }
                }
                tracing::info!(op, caller = %caller, events = events.len(), "ledger mutation applied");
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(op, caller = %caller, kind = %e.kind(), error = %e, "ledger mutation rejected");
                Err(e)
            }
        }
    }

    // -- Mutations ----------------------------------------------------------

    /// Grant Super-Admin or Sub-Admin. Returns whether anything changed.
    pub fn grant_admin(
        &self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<bool, LedgerError> {
        self.mutate("grant_admin", caller, |s, _| s.grant_admin(caller, role, account))
    }

    /// Revoke Super-Admin or Sub-Admin. Returns whether anything changed.
    pub fn revoke_admin(
        &self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<bool, LedgerError> {
        self.mutate("revoke_admin", caller, |s, _| s.revoke_admin(caller, role, account))
    }

    /// Register the calling address as an individual taxpayer.
    pub fn register_individual(
        &self,
        address: Address,
        tin: &str,
        registration: IndividualRegistration,
    ) -> Result<TaxpayerProfile, LedgerError> {
        self.mutate("register_individual", &address, |s, now| {
            s.register_individual(address, tin, registration, now)
        })
    }

    /// Register the calling address as a business taxpayer.
    pub fn register_business(
        &self,
        address: Address,
        tin: &str,
        registration: BusinessRegistration,
    ) -> Result<TaxpayerProfile, LedgerError> {
        self.mutate("register_business", &address, |s, now| {
            s.register_business(address, tin, registration, now)
        })
    }

    pub fn create_tax_item(&self, caller: &Address, item: NewTaxItem) -> Result<TaxItem, LedgerError> {
        self.mutate("create_tax_item", caller, |s, now| s.create_tax_item(caller, item, now))
    }

    pub fn set_tax_item_active(
        &self,
        caller: &Address,
        id: TaxItemId,
        active: bool,
    ) -> Result<TaxItem, LedgerError> {
        self.mutate("set_tax_item_active", caller, |s, now| {
            s.set_tax_item_active(caller, id, active, now)
        })
    }

    pub fn record_payment(
        &self,
        caller: &Address,
        request: PaymentRequest,
    ) -> Result<PaymentRecord, LedgerError> {
        self.mutate("record_payment", caller, |s, now| s.record_payment(caller, request, now))
    }

    pub fn authorize_upgrade(
        &self,
        caller: &Address,
        target: LogicDescriptor,
    ) -> Result<UpgradeRecord, LedgerError> {
        self.mutate("authorize_upgrade", caller, |s, now| {
            s.authorize_upgrade(caller, target, now)
        })
    }

    // -- Queries ------------------------------------------------------------

    /// Run `f` against a consistent view of the state under the read guard.
    pub fn read<R>(&self, f: impl FnOnce(&LedgerState) -> R) -> R {
        let guard = self.inner.state.read();
        f(&*guard)
    }

    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.read(|s| s.roles().has_role(role, account))
    }

    pub fn roles_of(&self, account: &Address) -> RoleSet {
        self.read(|s| s.roles().roles_of(account))
    }

    pub fn members(&self, role: Role) -> Vec<Address> {
        self.read(|s| s.roles().members(role))
    }

    pub fn individual(&self, address: &Address) -> Result<IndividualProfile, LedgerError> {
        self.read(|s| s.registry().individual(address).cloned())
    }

    pub fn business(&self, address: &Address) -> Result<BusinessProfile, LedgerError> {
        self.read(|s| s.registry().business(address).cloned())
    }

    pub fn profile(&self, address: &Address) -> Option<TaxpayerProfile> {
        self.read(|s| s.registry().profile(address).cloned())
    }

    pub fn address_of(&self, tin: &str) -> Option<Address> {
        self.read(|s| s.registry().address_of(tin))
    }

    pub fn tin_of(&self, address: &Address) -> Option<Tin> {
        self.read(|s| s.registry().tin_of(address).cloned())
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.read(|s| s.registry().is_registered(address))
    }

    pub fn classify(&self, address: &Address) -> TaxpayerKind {
        self.read(|s| s.registry().classify(address))
    }

    pub fn taxpayer_count(&self) -> usize {
        self.read(|s| s.registry().taxpayer_count())
    }

    pub fn tax_item(&self, id: TaxItemId) -> Result<TaxItem, LedgerError> {
        self.read(|s| s.catalog().get(id).cloned())
    }

    pub fn active_tax_items(&self) -> Vec<TaxItem> {
        self.read(|s| s.catalog().active_items().into_iter().cloned().collect())
    }

    pub fn tax_item_count(&self) -> usize {
        self.read(|s| s.catalog().item_count())
    }

    pub fn payment(&self, id: PaymentId) -> Result<PaymentRecord, LedgerError> {
        self.read(|s| s.ledger().get(id).cloned())
    }

    /// Payment ids for `payer` in creation order; empty for unknown payers.
    pub fn payment_history(&self, payer: &Address) -> Vec<PaymentId> {
        self.read(|s| s.ledger().history(payer).to_vec())
    }

    pub fn payment_history_records(&self, payer: &Address) -> Vec<PaymentRecord> {
        self.read(|s| {
            s.ledger()
                .history_records(payer)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    pub fn payment_count(&self) -> usize {
        self.read(|s| s.ledger().payment_count())
    }

    pub fn active_logic(&self) -> LogicDescriptor {
        self.read(|s| s.gate().active_logic().clone())
    }

    pub fn upgrade_history(&self) -> Vec<UpgradeRecord> {
        self.read(|s| s.gate().upgrade_history().to_vec())
    }

    /// The journal of committed events.
    pub fn journal(&self) -> &EventJournal {
        &self.inner.journal
    }

    /// Capture the full state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let now = self.inner.clock.now();
        self.read(|s| LedgerSnapshot::capture(s, now))
    }

    /// Digest of every persisted entity, excluding logic metadata.
    pub fn state_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        self.read(LedgerState::persisted_digest)
    }
}
