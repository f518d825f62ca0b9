//! # Tax Item Catalog
//!
//! Taxable items with basis-point rates. Items are never deleted: the
//! catalog is a `Vec` whose position `n - 1` holds the item with id `n`, so
//! ids are dense from 1 by construction.
//!
//! Mutation requires Sub-Admin (Super-Admin passes by dominance).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use taxreg_core::{Address, BasisPoints, TaxItemId, Timestamp, ValidationError};

use crate::error::{InvariantViolation, LedgerError};
use crate::role::{Role, RoleManager};

// ---------------------------------------------------------------------------
// TaxCategory
// ---------------------------------------------------------------------------

/// Closed set of tax categories a catalog item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxCategory {
    /// Tax on personal or business income.
    IncomeTax,
    /// Value-added tax on goods and services.
    ValueAddedTax,
    /// Corporate profit tax.
    CorporateTax,
    /// Tax on real property.
    PropertyTax,
    /// Duty on specific goods (fuel, tobacco, alcohol).
    ExciseDuty,
    /// Duty on imported goods.
    CustomsDuty,
    /// Tax on realized capital gains.
    CapitalGains,
    /// Tax withheld at source.
    WithholdingTax,
}

impl TaxCategory {
    /// Return the string representation of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IncomeTax => "income_tax",
            Self::ValueAddedTax => "value_added_tax",
            Self::CorporateTax => "corporate_tax",
            Self::PropertyTax => "property_tax",
            Self::ExciseDuty => "excise_duty",
            Self::CustomsDuty => "customs_duty",
            Self::CapitalGains => "capital_gains",
            Self::WithholdingTax => "withholding_tax",
        }
    }

    /// All categories in declaration order.
    pub fn all() -> &'static [TaxCategory] {
        &[
            Self::IncomeTax,
            Self::ValueAddedTax,
            Self::CorporateTax,
            Self::PropertyTax,
            Self::ExciseDuty,
            Self::CustomsDuty,
            Self::CapitalGains,
            Self::WithholdingTax,
        ]
    }
}

impl std::fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// TaxItem
// ---------------------------------------------------------------------------

/// A taxable item definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxItem {
    pub id: TaxItemId,
    pub name: String,
    pub description: String,
    pub category: TaxCategory,
    /// Rate in basis points. Not capped.
    pub rate_bps: BasisPoints,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for [`TaxItemCatalog::create`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTaxItem {
    pub name: String,
    pub description: String,
    pub category: TaxCategory,
    pub rate_bps: u32,
}

// ---------------------------------------------------------------------------
// TaxItemCatalog
// ---------------------------------------------------------------------------

/// Append-only catalog of tax items.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxItemCatalog {
    items: Vec<TaxItem>,
}

impl TaxItemCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an active item under the next id.
    pub fn create(
        &mut self,
        roles: &RoleManager,
        caller: &Address,
        item: NewTaxItem,
        now: Timestamp,
    ) -> Result<&TaxItem, LedgerError> {
        roles.require_role(Role::SubAdmin, caller)?;
        if item.name.is_empty() {
            return Err(LedgerError::EmptyName);
        }
        if item.description.is_empty() {
            return Err(LedgerError::EmptyDescription);
        }
        let id = self.next_id();
        self.items.push(TaxItem {
            id,
            name: item.name,
            description: item.description,
            category: item.category,
            rate_bps: BasisPoints::new(item.rate_bps),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        let index = self.items.len() - 1;
        Ok(&self.items[index])
    }

    /// Set the active flag and refresh `updated_at`.
    ///
    /// Applied even when the flag already has the requested value.
    pub fn set_active(
        &mut self,
        roles: &RoleManager,
        caller: &Address,
        id: TaxItemId,
        active: bool,
        now: Timestamp,
    ) -> Result<&TaxItem, LedgerError> {
        roles.require_role(Role::SubAdmin, caller)?;
        let index = Self::index_of(id)
            .filter(|i| *i < self.items.len())
            .ok_or(LedgerError::TaxItemNotFound(id))?;
        let item = &mut self.items[index];
        item.is_active = active;
        item.updated_at = now;
        Ok(item)
    }

    /// Look up an item by id.
    pub fn get(&self, id: TaxItemId) -> Result<&TaxItem, LedgerError> {
        self.find(id).ok_or(LedgerError::TaxItemNotFound(id))
    }

    /// Look up an item by id, `None` when absent.
    pub fn find(&self, id: TaxItemId) -> Option<&TaxItem> {
        Self::index_of(id).and_then(|i| self.items.get(i))
    }

    /// Active items in ascending id order.
    pub fn active_items(&self) -> Vec<&TaxItem> {
        self.items.iter().filter(|i| i.is_active).collect()
    }

    /// All items in ascending id order.
    pub fn items(&self) -> &[TaxItem] {
        &self.items
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The id the next created item will receive.
    pub fn next_id(&self) -> TaxItemId {
        TaxItemId::new(self.items.len() as u64 + 1)
    }

    /// Verify every stored id equals its dense position.
    pub fn check_consistency(&self) -> Result<(), InvariantViolation> {
        for (pos, item) in self.items.iter().enumerate() {
            let expected = pos as u64 + 1;
            if item.id.value() != expected {
                return Err(InvariantViolation::NonDenseId {
                    entity: "tax_item",
                    expected,
                    found: item.id.value(),
                });
            }
        }
        Ok(())
    }

    fn index_of(id: TaxItemId) -> Option<usize> {
        if id.is_none() {
            return None;
        }
        usize::try_from(id.value() - 1).ok()
    }
}
