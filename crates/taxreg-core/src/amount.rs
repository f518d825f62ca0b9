//! # Monetary Amounts
//!
//! Amounts are `u128` integers in the smallest currency unit. JSON numbers
//! beyond `u64` are not portable and canonical bytes reject floats, so
//! amounts serialize as decimal strings (`"1000000"`).
//!
//! Use with `#[serde(with = "taxreg_core::amount::decimal")]`.

/// Serde adapter rendering a `u128` as a base-10 string.
pub mod decimal {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a `u128` as a decimal string.
    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    /// Deserialize a `u128` from a decimal string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(serde::de::Error::custom(format!(
                "amount must be a non-empty decimal string, got {s:?}"
            )));
        }
        s.parse::<u128>().map_err(serde::de::Error::custom)
    }
}
