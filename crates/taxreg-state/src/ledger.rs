//! # Payment Ledger
//!
//! Immutable payment records plus a per-payer, append-only history of
//! record ids. Records are a `Vec` indexed by `id - 1`; nothing is ever
//! mutated or removed.
//!
//! ## Validation order
//!
//! After the Sub-Admin gate:
//!
//! 1. `ItemNotFound`
//! 2. `ItemInactive`
//! 3. `TinAddressMismatch`: the asserted TIN must resolve to the payer
//! 4. `NonPositiveAmount`
//! 5. `MissingPaymentReference`
//! 6. `MissingReceiptReference`
//!
//! A successful record appends to the payer's history and advances the
//! payer's last payment date in the same call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use taxreg_core::{Address, PaymentId, TaxItemId, Timestamp, Tin};

use crate::catalog::{TaxCategory, TaxItemCatalog};
use crate::error::{InvariantViolation, LedgerError};
use crate::registry::TaxpayerRegistry;
use crate::role::{Role, RoleManager};

/// An immutable payment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub payer: Address,
    pub tin: Tin,
    pub tax_item_id: TaxItemId,
    /// Amount in the smallest currency unit.
    #[serde(with = "taxreg_core::amount::decimal")]
    pub amount: u128,
    pub payment_reference: String,
    pub receipt_reference: String,
    pub timestamp: Timestamp,
    /// The item's category when the payment was recorded.
    pub category: TaxCategory,
}

/// Input for [`PaymentLedger::record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub payer: Address,
    /// TIN asserted for the payer; must resolve to `payer`.
    pub tin: String,
    pub tax_item_id: TaxItemId,
    #[serde(with = "taxreg_core::amount::decimal")]
    pub amount: u128,
    pub payment_reference: String,
    pub receipt_reference: String,
}

/// Payment records and per-payer histories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLedger {
    records: Vec<PaymentRecord>,
    histories: BTreeMap<Address, Vec<PaymentId>>,
}

impl PaymentLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append a payment record.
    pub fn record(
        &mut self,
        roles: &RoleManager,
        caller: &Address,
        catalog: &TaxItemCatalog,
        registry: &mut TaxpayerRegistry,
        request: PaymentRequest,
        now: Timestamp,
    ) -> Result<&PaymentRecord, LedgerError> {
        roles.require_role(Role::SubAdmin, caller)?;

        let item = catalog
            .find(request.tax_item_id)
            .ok_or(LedgerError::ItemNotFound(request.tax_item_id))?;
        if !item.is_active {
            return Err(LedgerError::ItemInactive(item.id));
        }
        if registry.address_of(&request.tin) != Some(request.payer) {
            return Err(LedgerError::TinAddressMismatch {
                tin: request.tin,
                payer: request.payer,
            });
        }
        if request.amount == 0 {
            return Err(LedgerError::NonPositiveAmount {
                amount: request.amount,
            });
        }
        if request.payment_reference.is_empty() {
            return Err(LedgerError::MissingPaymentReference);
        }
        if request.receipt_reference.is_empty() {
            return Err(LedgerError::MissingReceiptReference);
        }

        // The index resolved the TIN to the payer, so both exist.
        let profile = registry
            .profile_mut(&request.payer)
            .ok_or_else(|| LedgerError::TinAddressMismatch {
                tin: request.tin.clone(),
                payer: request.payer,
            })?;
        let tin = profile.tin().clone();
        profile.touch_last_payment(now);

        let id = self.next_id();
        self.histories.entry(request.payer).or_default().push(id);
        self.records.push(PaymentRecord {
            id,
            payer: request.payer,
            tin,
            tax_item_id: item.id,
            amount: request.amount,
            payment_reference: request.payment_reference,
            receipt_reference: request.receipt_reference,
            timestamp: now,
            category: item.category,
        });
        let index = self.records.len() - 1;
        Ok(&self.records[index])
    }

    /// Look up a record by id.
    pub fn get(&self, id: PaymentId) -> Result<&PaymentRecord, LedgerError> {
        if id.is_none() {
            return Err(LedgerError::PaymentNotFound(id));
        }
        usize::try_from(id.value() - 1)
            .ok()
            .and_then(|i| self.records.get(i))
            .ok_or(LedgerError::PaymentNotFound(id))
    }

    /// Record ids for `payer` in creation order; empty for unknown payers.
    pub fn history(&self, payer: &Address) -> &[PaymentId] {
        self.histories.get(payer).map_or(&[], Vec::as_slice)
    }

    /// Records for `payer` in creation order.
    pub fn history_records(&self, payer: &Address) -> Vec<&PaymentRecord> {
        self.history(payer)
            .iter()
            .filter_map(|id| self.get(*id).ok())
            .collect()
    }

    /// All records in ascending id order.
    pub fn records(&self) -> &[PaymentRecord] {
        &self.records
    }

    pub fn payment_count(&self) -> usize {
        self.records.len()
    }

    /// The id the next recorded payment will receive.
    pub fn next_id(&self) -> PaymentId {
        PaymentId::new(self.records.len() as u64 + 1)
    }

    /// Verify dense ids, live item references, and that the histories
    /// partition the records in creation order.
    pub fn check_consistency(&self, catalog: &TaxItemCatalog) -> Result<(), InvariantViolation> {
        for (pos, record) in self.records.iter().enumerate() {
            let expected = pos as u64 + 1;
            if record.id.value() != expected {
                return Err(InvariantViolation::NonDenseId {
                    entity: "payment",
                    expected,
                    found: record.id.value(),
                });
            }
            if catalog.find(record.tax_item_id).is_none() {
                return Err(InvariantViolation::DanglingItem {
                    payment: record.id,
                    item: record.tax_item_id,
                });
            }
        }
        let mut seen = 0usize;
        for (payer, ids) in &self.histories {
            let in_order = ids.windows(2).all(|w| w[0] < w[1]);
            let owned = ids
                .iter()
                .all(|id| self.get(*id).is_ok_and(|r| r.payer == *payer));
            if ids.is_empty() || !in_order || !owned {
                return Err(InvariantViolation::History(*payer));
            }
            seen += ids.len();
        }
        if seen != self.records.len() {
            let missing = self
                .records
                .iter()
                .find(|r| !self.history(&r.payer).contains(&r.id))
                .map_or(Address::ZERO, |r| r.payer);
            return Err(InvariantViolation::History(missing));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewTaxItem;
    use crate::profile::{BusinessRegistration, IndividualRegistration};

    fn addr(last: u8) -> Address {
        let mut b = [0u8; 20];
        b[19] = last;
        Address::from_bytes(b)
    }

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_epoch_secs(secs).unwrap()
    }

    const ADMIN: u8 = 1;
    const CLERK: u8 = 2;
    const PAYER: u8 = 5;
    const OTHER: u8 = 6;

    struct Fixture {
        roles: RoleManager,
        registry: TaxpayerRegistry,
        catalog: TaxItemCatalog,
        ledger: PaymentLedger,
    }

    impl Fixture {
        fn new() -> Self {
            let mut roles = RoleManager::new(addr(ADMIN)).unwrap();
            roles.grant(&addr(ADMIN), Role::SubAdmin, addr(CLERK)).unwrap();
            let mut registry = TaxpayerRegistry::new();
            registry
                .register_individual(
                    &mut roles,
                    addr(PAYER),
                    "T1",
                    IndividualRegistration {
                        gender: "male".into(),
                        ..Default::default()
                    },
                    ts(0),
                )
                .unwrap();
            registry
                .register_business(
                    &mut roles,
                    addr(OTHER),
                    "B1",
                    BusinessRegistration {
                        is_active: true,
                        ..Default::default()
                    },
                    ts(0),
                )
                .unwrap();
            let mut catalog = TaxItemCatalog::new();
            for (rate, category) in [(750, TaxCategory::ValueAddedTax), (2500, TaxCategory::IncomeTax)] {
                catalog
                    .create(
                        &roles,
                        &addr(CLERK),
                        NewTaxItem {
                            name: "item".into(),
                            description: "desc".into(),
                            category,
                            rate_bps: rate,
                        },
                        ts(0),
                    )
                    .unwrap();
            }
            Self {
                roles,
                registry,
                catalog,
                ledger: PaymentLedger::new(),
            }
        }

        fn pay(&mut self, req: PaymentRequest, now: Timestamp) -> Result<PaymentRecord, LedgerError> {
            self.ledger
                .record(
                    &self.roles,
                    &addr(CLERK),
                    &self.catalog,
                    &mut self.registry,
                    req,
                    now,
                )
                .cloned()
        }
    }

    fn request(payer: u8, tin: &str, item: u64) -> PaymentRequest {
        PaymentRequest {
            payer: addr(payer),
            tin: tin.into(),
            tax_item_id: TaxItemId::new(item),
            amount: 1_000_000,
            payment_reference: "PAY-1".into(),
            receipt_reference: "RCPT-1".into(),
        }
    }

    // ── Happy path ───────────────────────────────────────────────────

    #[test]
    fn record_appends_history_and_touches_profile() {
        let mut f = Fixture::new();
        let r1 = f.pay(request(PAYER, "T1", 1), ts(100)).unwrap();
        assert_eq!(r1.id, PaymentId::new(1));
        assert_eq!(r1.category, TaxCategory::ValueAddedTax);
        assert_eq!(r1.tin.as_str(), "T1");
        assert_eq!(f.ledger.history(&addr(PAYER)), &[PaymentId::new(1)]);
        assert_eq!(
            f.registry.profile(&addr(PAYER)).unwrap().last_payment_date(),
            Some(ts(100))
        );

        let r2 = f.pay(request(PAYER, "T1", 2), ts(200)).unwrap();
        assert_eq!(r2.id, PaymentId::new(2));
        assert_eq!(r2.category, TaxCategory::IncomeTax);
        assert_eq!(
            f.ledger.history(&addr(PAYER)),
            &[PaymentId::new(1), PaymentId::new(2)]
        );
        assert_eq!(
            f.registry.profile(&addr(PAYER)).unwrap().last_payment_epoch(),
            200
        );
        assert!(f.ledger.check_consistency(&f.catalog).is_ok());
    }

    #[test]
    fn ids_dense_across_payers() {
        let mut f = Fixture::new();
        f.pay(request(PAYER, "T1", 1), ts(1)).unwrap();
        f.pay(request(OTHER, "B1", 1), ts(2)).unwrap();
        f.pay(request(PAYER, "T1", 2), ts(3)).unwrap();
        assert_eq!(
            f.ledger.history(&addr(PAYER)),
            &[PaymentId::new(1), PaymentId::new(3)]
        );
        assert_eq!(f.ledger.history(&addr(OTHER)), &[PaymentId::new(2)]);
        assert_eq!(f.ledger.history_records(&addr(OTHER))[0].tin.as_str(), "B1");
        assert_eq!(f.ledger.payment_count(), 3);
    }

    #[test]
    fn clock_regression_does_not_rewind_last_payment() {
        let mut f = Fixture::new();
        f.pay(request(PAYER, "T1", 1), ts(500)).unwrap();
        let r = f.pay(request(PAYER, "T1", 1), ts(400)).unwrap();
        assert_eq!(r.timestamp, ts(400));
        assert_eq!(
            f.registry.profile(&addr(PAYER)).unwrap().last_payment_epoch(),
            500
        );
    }

    #[test]
    fn deactivated_item_reference_stays_valid() {
        let mut f = Fixture::new();
        let r = f.pay(request(PAYER, "T1", 1), ts(1)).unwrap();
        f.catalog
            .set_active(&f.roles, &addr(CLERK), TaxItemId::new(1), false, ts(2))
            .unwrap();
        assert_eq!(f.ledger.get(r.id).unwrap().tax_item_id, TaxItemId::new(1));
        assert!(f.ledger.check_consistency(&f.catalog).is_ok());
    }

    // ── Validation order ─────────────────────────────────────────────

    #[test]
    fn unauthorized_caller_rejected_first() {
        let mut f = Fixture::new();
        let err = f
            .ledger
            .record(
                &f.roles,
                &addr(PAYER),
                &f.catalog,
                &mut f.registry,
                request(PAYER, "T1", 99),
                ts(1),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Unauthorized { .. }));
    }

    #[test]
    fn item_checks_precede_identity_checks() {
        let mut f = Fixture::new();
        assert_eq!(
            f.pay(request(PAYER, "nope", 9), ts(1)).unwrap_err(),
            LedgerError::ItemNotFound(TaxItemId::new(9))
        );
        f.catalog
            .set_active(&f.roles, &addr(CLERK), TaxItemId::new(2), false, ts(1))
            .unwrap();
        assert_eq!(
            f.pay(request(PAYER, "nope", 2), ts(1)).unwrap_err(),
            LedgerError::ItemInactive(TaxItemId::new(2))
        );
    }

    #[test]
    fn tin_of_another_payer_is_mismatch() {
        let mut f = Fixture::new();
        let err = f.pay(request(PAYER, "B1", 1), ts(1)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::TinAddressMismatch {
                tin: "B1".into(),
                payer: addr(PAYER)
            }
        );
        assert!(f.ledger.history(&addr(PAYER)).is_empty());
        assert!(f.ledger.history(&addr(OTHER)).is_empty());
        assert_eq!(f.ledger.next_id(), PaymentId::new(1));
        assert_eq!(
            f.registry.profile(&addr(PAYER)).unwrap().last_payment_date(),
            None
        );
    }

    #[test]
    fn unregistered_payer_is_mismatch() {
        let mut f = Fixture::new();
        let err = f.pay(request(9, "T9", 1), ts(1)).unwrap_err();
        assert!(matches!(err, LedgerError::TinAddressMismatch { .. }));
        let err = f.pay(request(PAYER, "", 1), ts(1)).unwrap_err();
        assert!(matches!(err, LedgerError::TinAddressMismatch { .. }));
    }

    #[test]
    fn amount_then_references() {
        let mut f = Fixture::new();
        let mut req = request(PAYER, "T1", 1);
        req.amount = 0;
        req.payment_reference.clear();
        assert_eq!(
            f.pay(req.clone(), ts(1)).unwrap_err(),
            LedgerError::NonPositiveAmount { amount: 0 }
        );
        req.amount = 1;
        req.receipt_reference.clear();
        assert_eq!(
            f.pay(req.clone(), ts(1)).unwrap_err(),
            LedgerError::MissingPaymentReference
        );
        req.payment_reference = "P".into();
        assert_eq!(
            f.pay(req, ts(1)).unwrap_err(),
            LedgerError::MissingReceiptReference
        );
        assert_eq!(f.ledger.payment_count(), 0);
    }

    // ── Queries ──────────────────────────────────────────────────────

    #[test]
    fn lookups() {
        let f = Fixture::new();
        assert_eq!(
            f.ledger.get(PaymentId::NONE).unwrap_err(),
            LedgerError::PaymentNotFound(PaymentId::NONE)
        );
        assert_eq!(
            f.ledger.get(PaymentId::new(1)).unwrap_err(),
            LedgerError::PaymentNotFound(PaymentId::new(1))
        );
        assert!(f.ledger.history(&addr(42)).is_empty());
        assert!(f.ledger.history_records(&addr(42)).is_empty());
    }

    #[test]
    fn amount_serializes_as_decimal_string() {
        let mut f = Fixture::new();
        let mut req = request(PAYER, "T1", 1);
        req.amount = u128::MAX;
        let r = f.pay(req, ts(1)).unwrap();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["amount"], u128::MAX.to_string());
        assert_eq!(json["category"], "value_added_tax");
    }
}
