//! # Role Hierarchy
//!
//! Three roles in two tiers:
//!
//! ```text
//! SuperAdmin ──administers──▶ SuperAdmin, SubAdmin
//!     │
//!     └─dominates──▶ SubAdmin        (passes every Sub-Admin gate)
//!
//! TaxPayer   ── granted only as a side effect of profile registration
//! ```
//!
//! Authorization is the pure function [`permits`], evaluated at the top of
//! every mutating operation before any state is read for validation.
//!
//! There is no self-revocation guard: a Super-Admin may revoke its own role,
//! including the last one, which leaves the ledger without administrators.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use taxreg_core::Address;

use crate::error::LedgerError;

/// A permission role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// System owner; administers itself and Sub-Admin.
    SuperAdmin,
    /// Operational tier: catalog maintenance and payment recording.
    SubAdmin,
    /// Holder of a registered taxpayer profile.
    TaxPayer,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::SubAdmin => "sub_admin",
            Self::TaxPayer => "tax_payer",
        }
    }

    /// Whether this role is administered through grant/revoke.
    pub fn is_admin_role(&self) -> bool {
        matches!(self, Self::SuperAdmin | Self::SubAdmin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The set of roles held by one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    /// Whether the set directly contains `role`.
    pub fn contains(&self, role: Role) -> bool {
        self.0.contains(&role)
    }

    /// Iterate held roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        self.0.iter().copied()
    }

    /// Whether no role is held.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn insert(&mut self, role: Role) -> bool {
        self.0.insert(role)
    }

    fn remove(&mut self, role: Role) -> bool {
        self.0.remove(&role)
    }
}

/// Whether a holder of `held` may perform an action gated on `required`.
///
/// Super-Admin dominates Sub-Admin. Tax-Payer grants no administrative
/// capability.
pub fn permits(held: &RoleSet, required: Role) -> bool {
    match required {
        Role::SuperAdmin => held.contains(Role::SuperAdmin),
        Role::SubAdmin => held.contains(Role::SubAdmin) || held.contains(Role::SuperAdmin),
        Role::TaxPayer => held.contains(Role::TaxPayer),
    }
}

/// Role assignments keyed by address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleManager {
    assignments: BTreeMap<Address, RoleSet>,
}

impl RoleManager {
    /// Create the hierarchy with its single initial Super-Admin.
    pub fn new(initial_super_admin: Address) -> Result<Self, LedgerError> {
        if initial_super_admin.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        let mut assignments = BTreeMap::new();
        let mut set = RoleSet::default();
        set.insert(Role::SuperAdmin);
        assignments.insert(initial_super_admin, set);
        Ok(Self { assignments })
    }

    /// Whether `account` directly holds `role`.
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.assignments
            .get(account)
            .is_some_and(|set| set.contains(role))
    }

    /// Fail with `Unauthorized` unless `caller` is permitted `required`.
    pub fn require_role(&self, required: Role, caller: &Address) -> Result<(), LedgerError> {
        let empty = RoleSet::default();
        let held = self.assignments.get(caller).unwrap_or(&empty);
        if permits(held, required) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: *caller,
                required,
            })
        }
    }

    /// Roles held by `account` (empty when unknown).
    pub fn roles_of(&self, account: &Address) -> RoleSet {
        self.assignments.get(account).cloned().unwrap_or_default()
    }

    /// All addresses directly holding `role`, in address order.
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.assignments
            .iter()
            .filter(|(_, set)| set.contains(role))
            .map(|(addr, _)| *addr)
            .collect()
    }

    /// Grant an admin role. Returns whether the assignment changed.
    ///
    /// Check order: caller is Super-Admin, role is administrable, account
    /// is non-null.
    pub fn grant(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<bool, LedgerError> {
        self.check_admin_change(caller, role, &account)?;
        Ok(self.assignments.entry(account).or_default().insert(role))
    }

    /// Revoke an admin role. Returns whether the assignment changed.
    pub fn revoke(
        &mut self,
        caller: &Address,
        role: Role,
        account: Address,
    ) -> Result<bool, LedgerError> {
        self.check_admin_change(caller, role, &account)?;
        let changed = match self.assignments.get_mut(&account) {
            Some(set) => set.remove(role),
            None => false,
        };
        if self.assignments.get(&account).is_some_and(RoleSet::is_empty) {
            self.assignments.remove(&account);
        }
        Ok(changed)
    }

    /// Grant Tax-Payer as part of profile registration.
    pub(crate) fn grant_taxpayer(&mut self, account: Address) {
        self.assignments
            .entry(account)
            .or_default()
            .insert(Role::TaxPayer);
    }

    pub(crate) fn assignments(&self) -> &BTreeMap<Address, RoleSet> {
        &self.assignments
    }

    fn check_admin_change(
        &self,
        caller: &Address,
        role: Role,
        account: &Address,
    ) -> Result<(), LedgerError> {
        self.require_role(Role::SuperAdmin, caller)?;
        if !role.is_admin_role() {
            return Err(LedgerError::InvalidRole(role));
        }
        if account.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        Ok(())
    }
}
