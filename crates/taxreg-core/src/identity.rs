//! # Identity Newtypes
//!
//! Domain-primitive newtypes for every identifier the registry stores.
//! Each identifier is a distinct type: you cannot pass a [`PaymentId`]
//! where a [`TaxItemId`] is expected, or a raw string where a [`Tin`] is.
//!
//! ## Validation
//!
//! - [`Address`] parses only `0x` + 40 hex digits. The all-zero address is
//!   representable (it is the null address) but [`Address::is_zero`] lets
//!   callers reject it.
//! - [`Tin`] rejects the empty string at construction. No other format is
//!   imposed: TIN schemes differ per jurisdiction and the registry records
//!   what an authorized caller attests.
//! - [`TaxItemId`] / [`PaymentId`] reserve 0 as the "absent" sentinel.

use std::borrow::Borrow;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::hex;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account address, rendered as `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    /// The null address.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Construct an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse an address from `0x` + 40 hex digits (either case).
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidAddress(s.to_string()))?;
        hex::decode_array::<20>(digits)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidAddress(s.to_string()))
    }

    /// Access the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the null address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tin
// ---------------------------------------------------------------------------

/// Tax Identification Number: the unique external identifier of a
/// registered payer, individual or business.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Tin(String);

impl Tin {
    /// Create a TIN, rejecting the empty string.
    ///
    /// Matching is byte-exact: no trimming or case folding is applied.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() {
            return Err(ValidationError::EmptyTin);
        }
        Ok(Self(s))
    }

    /// Access the TIN string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Tin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Tin {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Tin {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Sequential entity ids
// ---------------------------------------------------------------------------

/// Identifier of a catalog tax item. Allocated densely from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxItemId(u64);

/// Identifier of a payment record. Allocated densely from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(u64);

impl TaxItemId {
    /// The reserved "absent" id. Never denotes a stored item.
    pub const NONE: TaxItemId = TaxItemId(0);

    /// Wrap a raw id value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the reserved sentinel.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl PaymentId {
    /// The reserved "absent" id. Never denotes a stored record.
    pub const NONE: PaymentId = PaymentId(0);

    /// Wrap a raw id value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw id value.
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Whether this is the reserved sentinel.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for TaxItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tax-item:{}", self.0)
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "payment:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x00000000000000000000000000000000000000a1";

    #[test]
    fn address_parse_and_display() {
        let addr = Address::parse(ALICE).unwrap();
        assert_eq!(addr.to_string(), ALICE);
        assert!(!addr.is_zero());
        assert_eq!(addr.as_bytes()[19], 0xa1);
    }

    #[test]
    fn address_parse_uppercase_normalizes() {
        let addr: Address = "0X00000000000000000000000000000000000000A1".parse().unwrap();
        assert_eq!(addr.to_string(), ALICE);
    }

    #[test]
    fn address_rejects_malformed() {
        assert!(Address::parse("00000000000000000000000000000000000000a1").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzz000000000000000000000000000000000000a1").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn zero_address() {
        assert!(Address::ZERO.is_zero());
        assert_eq!(Address::default(), Address::ZERO);
        assert_eq!(
            Address::ZERO.to_string(),
            "0x0000000000000000000000000000000000000000"
        );
    }

    #[test]
    fn address_serde_is_hex_string() {
        let addr = Address::parse(ALICE).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{ALICE}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"0x12\"").is_err());
    }

    #[test]
    fn tin_rejects_empty() {
        assert_eq!(Tin::new(""), Err(ValidationError::EmptyTin));
        assert_eq!(Tin::new("T1").unwrap().as_str(), "T1");
    }

    #[test]
    fn tin_is_byte_exact() {
        assert_ne!(Tin::new("t1").unwrap(), Tin::new("T1").unwrap());
        assert_eq!(Tin::new(" T1").unwrap().as_str(), " T1");
    }

    #[test]
    fn tin_deserialize_rejects_empty() {
        assert!(serde_json::from_str::<Tin>("\"\"").is_err());
        let tin: Tin = serde_json::from_str("\"TIN-9\"").unwrap();
        assert_eq!(tin.as_str(), "TIN-9");
    }

    #[test]
    fn sentinel_ids() {
        assert!(TaxItemId::NONE.is_none());
        assert!(PaymentId::NONE.is_none());
        assert!(!TaxItemId::new(1).is_none());
        assert_eq!(PaymentId::new(7).value(), 7);
        assert_eq!(TaxItemId::new(3).to_string(), "tax-item:3");
        assert_eq!(PaymentId::new(3).to_string(), "payment:3");
    }

    #[test]
    fn ids_order_numerically() {
        assert!(TaxItemId::new(2) < TaxItemId::new(10));
        assert!(PaymentId::new(1) < PaymentId::new(2));
    }
}
