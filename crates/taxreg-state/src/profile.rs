//! # Taxpayer Profiles
//!
//! An address owns at most one profile, individual or business. The two
//! kinds are a single tagged union so the "one profile per address" rule is
//! a property of the map type rather than a cross-table check.
//!
//! Registration inputs ([`IndividualRegistration`], [`BusinessRegistration`])
//! carry attributes exactly as attested. Gender arrives as a raw literal and
//! is parsed into [`Gender`] during validation.

use serde::{Deserialize, Serialize};

use taxreg_core::{Tin, Timestamp};

use crate::error::LedgerError;

/// Closed two-value gender set. Matching is exact-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// `"male"`.
    Male,
    /// `"female"`.
    Female,
}

impl Gender {
    /// Parse the exact literals `"male"` and `"female"`.
    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            other => Err(LedgerError::InvalidGender(other.to_string())),
        }
    }

    /// Return the string representation of this gender.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of profile an address holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxpayerKind {
    /// Natural person.
    Individual,
    /// Registered company.
    Business,
    /// No profile at the address.
    None,
}

impl TaxpayerKind {
    /// Return the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Business => "business",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for TaxpayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attributes supplied when registering an individual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualRegistration {
    /// National identity document number.
    pub id_number: String,
    /// Identity document type (passport, national id, ...).
    pub id_type: String,
    /// Given name.
    pub first_name: String,
    /// Middle name, possibly empty.
    pub middle_name: String,
    /// Family name.
    pub last_name: String,
    /// Date of birth as attested.
    pub date_of_birth: String,
    /// Contact phone.
    pub phone: String,
    /// Contact email.
    pub email: String,
    /// Residential address.
    pub residential_address: String,
    /// Raw gender literal; must be exactly `"male"` or `"female"`.
    pub gender: String,
}

/// Attributes supplied when registering a business.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRegistration {
    /// Company registry number.
    pub registration_number: String,
    /// Registered company name.
    pub company_name: String,
    /// Legal form.
    pub company_type: String,
    /// Registered office address.
    pub registered_address: String,
    /// Operational address.
    pub operational_address: String,
    /// Contact email.
    pub email: String,
    /// Contact phone.
    pub phone: String,
    /// Business classification.
    pub classification: String,
    /// Declared capital in the smallest currency unit.
    #[serde(with = "taxreg_core::amount::decimal")]
    pub capital: u128,
    /// Initial active flag, chosen by the registrant.
    pub is_active: bool,
}

/// A registered natural person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualProfile {
    pub tin: Tin,
    pub id_number: String,
    pub id_type: String,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub phone: String,
    pub email: String,
    pub residential_address: String,
    pub gender: Gender,
    pub is_active: bool,
    pub registered_at: Timestamp,
    /// `None` until the first recorded payment.
    pub last_payment_date: Option<Timestamp>,
}

impl IndividualProfile {
    /// Build a fresh profile from validated registration input.
    pub fn new(tin: Tin, reg: IndividualRegistration, gender: Gender, now: Timestamp) -> Self {
        Self {
            tin,
            id_number: reg.id_number,
            id_type: reg.id_type,
            first_name: reg.first_name,
            middle_name: reg.middle_name,
            last_name: reg.last_name,
            date_of_birth: reg.date_of_birth,
            phone: reg.phone,
            email: reg.email,
            residential_address: reg.residential_address,
            gender,
            is_active: true,
            registered_at: now,
            last_payment_date: None,
        }
    }
}

/// A registered company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub tin: Tin,
    pub registration_number: String,
    pub company_name: String,
    pub company_type: String,
    pub registered_address: String,
    pub operational_address: String,
    pub email: String,
    pub phone: String,
    pub classification: String,
    #[serde(with = "taxreg_core::amount::decimal")]
    pub capital: u128,
    pub is_active: bool,
    pub registered_at: Timestamp,
    /// `None` until the first recorded payment.
    pub last_payment_date: Option<Timestamp>,
}

impl BusinessProfile {
    /// Build a fresh profile from registration input.
    pub fn new(tin: Tin, reg: BusinessRegistration, now: Timestamp) -> Self {
        Self {
            tin,
            registration_number: reg.registration_number,
            company_name: reg.company_name,
            company_type: reg.company_type,
            registered_address: reg.registered_address,
            operational_address: reg.operational_address,
            email: reg.email,
            phone: reg.phone,
            classification: reg.classification,
            capital: reg.capital,
            is_active: reg.is_active,
            registered_at: now,
            last_payment_date: None,
        }
    }
}

/// The profile owned by one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaxpayerProfile {
    Individual(IndividualProfile),
    Business(BusinessProfile),
}

impl TaxpayerProfile {
    /// The TIN held by this profile.
    pub fn tin(&self) -> &Tin {
        match self {
            Self::Individual(p) => &p.tin,
            Self::Business(p) => &p.tin,
        }
    }

    pub fn kind(&self) -> TaxpayerKind {
        match self {
            Self::Individual(_) => TaxpayerKind::Individual,
            Self::Business(_) => TaxpayerKind::Business,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            Self::Individual(p) => p.is_active,
            Self::Business(p) => p.is_active,
        }
    }

    pub fn registered_at(&self) -> Timestamp {
        match self {
            Self::Individual(p) => p.registered_at,
            Self::Business(p) => p.registered_at,
        }
    }

    pub fn last_payment_date(&self) -> Option<Timestamp> {
        match self {
            Self::Individual(p) => p.last_payment_date,
            Self::Business(p) => p.last_payment_date,
        }
    }

    /// Last payment as Unix seconds, 0 when no payment was ever recorded.
    pub fn last_payment_epoch(&self) -> i64 {
        self.last_payment_date().map_or(0, |t| t.epoch_secs())
    }

    /// Advance the last payment date; never moves it backwards.
    pub(crate) fn touch_last_payment(&mut self, now: Timestamp) {
        let slot = match self {
            Self::Individual(p) => &mut p.last_payment_date,
            Self::Business(p) => &mut p.last_payment_date,
        };
        *slot = Some(match *slot {
            Some(prev) if prev > now => prev,
            _ => now,
        });
    }
}
