//! # Taxpayer Registry
//!
//! Profiles keyed by owning address plus the `tin → address` index. The
//! reverse direction (`address → tin`) is read straight off the profile, so
//! the two directions cannot drift apart.
//!
//! ## Registration check order
//!
//! 1. `EmptyTin`
//! 2. `ZeroAddress`
//! 3. `TinExists`
//! 4. `ProfileExists` (either kind)
//! 5. `InvalidGender` (individuals only)
//!
//! Every check runs before the first write. On success the profile, the
//! index entry and the Tax-Payer role are written together.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use taxreg_core::{Address, Timestamp, Tin};

use crate::error::{InvariantViolation, LedgerError};
use crate::profile::{
    BusinessProfile, BusinessRegistration, Gender, IndividualProfile, IndividualRegistration,
    TaxpayerKind, TaxpayerProfile,
};
use crate::role::{Role, RoleManager};

/// Individual and business profiles with the TIN index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxpayerRegistry {
    profiles: BTreeMap<Address, TaxpayerProfile>,
    tin_index: BTreeMap<Tin, Address>,
}

impl TaxpayerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an individual at `address`. Open to any caller.
    pub fn register_individual(
        &mut self,
        roles: &mut RoleManager,
        address: Address,
        tin: &str,
        registration: IndividualRegistration,
        now: Timestamp,
    ) -> Result<&TaxpayerProfile, LedgerError> {
        let tin = self.check_new_taxpayer(address, tin)?;
        let gender = Gender::parse(&registration.gender)?;
        let profile = IndividualProfile::new(tin, registration, gender, now);
        Ok(self.insert(roles, address, TaxpayerProfile::Individual(profile)))
    }

    /// Register a business at `address`. Open to any caller.
    pub fn register_business(
        &mut self,
        roles: &mut RoleManager,
        address: Address,
        tin: &str,
        registration: BusinessRegistration,
        now: Timestamp,
    ) -> Result<&TaxpayerProfile, LedgerError> {
        let tin = self.check_new_taxpayer(address, tin)?;
        let profile = BusinessProfile::new(tin, registration, now);
        Ok(self.insert(roles, address, TaxpayerProfile::Business(profile)))
    }

    fn check_new_taxpayer(&self, address: Address, tin: &str) -> Result<Tin, LedgerError> {
        let tin = Tin::new(tin).map_err(|_| LedgerError::EmptyTin)?;
        if address.is_zero() {
            return Err(LedgerError::ZeroAddress);
        }
        if self.tin_index.contains_key(&tin) {
            return Err(LedgerError::TinExists(tin));
        }
        if self.profiles.contains_key(&address) {
            return Err(LedgerError::ProfileExists(address));
        }
        Ok(tin)
    }

    fn insert(
        &mut self,
        roles: &mut RoleManager,
        address: Address,
        profile: TaxpayerProfile,
    ) -> &TaxpayerProfile {
        self.tin_index.insert(profile.tin().clone(), address);
        roles.grant_taxpayer(address);
        self.profiles.entry(address).or_insert(profile)
    }

    // -- Queries ------------------------------------------------------------

    /// The individual profile at `address`.
    pub fn individual(&self, address: &Address) -> Result<&IndividualProfile, LedgerError> {
        match self.profiles.get(address) {
            Some(TaxpayerProfile::Individual(p)) => Ok(p),
            _ => Err(LedgerError::ProfileNotFound {
                address: *address,
                expected: TaxpayerKind::Individual,
            }),
        }
    }

    /// The business profile at `address`.
    pub fn business(&self, address: &Address) -> Result<&BusinessProfile, LedgerError> {
        match self.profiles.get(address) {
            Some(TaxpayerProfile::Business(p)) => Ok(p),
            _ => Err(LedgerError::ProfileNotFound {
                address: *address,
                expected: TaxpayerKind::Business,
            }),
        }
    }

    pub fn profile(&self, address: &Address) -> Option<&TaxpayerProfile> {
        self.profiles.get(address)
    }

    /// The address registered under `tin`, if any.
    pub fn address_of(&self, tin: &str) -> Option<Address> {
        self.tin_index.get(tin).copied()
    }

    /// The TIN held by the profile at `address`, if any.
    pub fn tin_of(&self, address: &Address) -> Option<&Tin> {
        self.profiles.get(address).map(TaxpayerProfile::tin)
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.profiles.contains_key(address)
    }

    pub fn classify(&self, address: &Address) -> TaxpayerKind {
        self.profiles
            .get(address)
            .map_or(TaxpayerKind::None, TaxpayerProfile::kind)
    }

    pub fn taxpayer_count(&self) -> usize {
        self.profiles.len()
    }

    /// All profiles in address order.
    pub fn profiles(&self) -> impl Iterator<Item = (&Address, &TaxpayerProfile)> {
        self.profiles.iter()
    }

    pub(crate) fn profile_mut(&mut self, address: &Address) -> Option<&mut TaxpayerProfile> {
        self.profiles.get_mut(address)
    }

    /// Verify the index and the Tax-Payer role agree with the profiles.
    pub fn check_consistency(&self, roles: &RoleManager) -> Result<(), InvariantViolation> {
        if self.profiles.contains_key(&Address::ZERO) {
            return Err(InvariantViolation::ZeroAddressProfile);
        }
        if self.tin_index.len() != self.profiles.len() {
            let orphan = self
                .tin_index
                .iter()
                .find(|(tin, addr)| self.tin_of(addr) != Some(*tin))
                .map(|(tin, _)| tin.to_string())
                .or_else(|| {
                    self.profiles
                        .values()
                        .find(|p| !self.tin_index.contains_key(p.tin()))
                        .map(|p| p.tin().to_string())
                })
                .unwrap_or_default();
            return Err(InvariantViolation::TinIndex { tin: orphan });
        }
        for (address, profile) in &self.profiles {
            if self.tin_index.get(profile.tin()) != Some(address) {
                return Err(InvariantViolation::TinIndex {
                    tin: profile.tin().to_string(),
                });
            }
            if !roles.has_role(Role::TaxPayer, address) {
                return Err(InvariantViolation::TaxpayerRole(*address));
            }
        }
        for (address, set) in roles.assignments() {
            if set.contains(Role::TaxPayer) && !self.profiles.contains_key(address) {
                return Err(InvariantViolation::TaxpayerRole(*address));
            }
        }
        Ok(())
    }
}
