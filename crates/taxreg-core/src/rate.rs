//! # Basis-Point Arithmetic
//!
//! Tax rates are integer basis points: 100 bps = 1%, 10_000 bps = 100%.
//! No upper cap is imposed; a rate above 10_000 is representable and
//! produces a tax amount larger than the base amount.
//!
//! All conversions truncate toward zero. `calculate_tax_amount(999, 100)`
//! is 9, not 10.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Basis points in one whole (100%).
pub const BASIS_POINTS_DENOMINATOR: u128 = 10_000;

/// A rate expressed in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasisPoints(u32);

impl BasisPoints {
    /// Wrap a raw basis-point value.
    pub const fn new(bps: u32) -> Self {
        Self(bps)
    }

    /// The raw basis-point value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Whole-percent value, truncated.
    pub fn percent(&self) -> u32 {
        basis_points_to_percent(self.0)
    }

    /// Apply this rate to `amount`, truncating.
    pub fn apply(&self, amount: u128) -> Result<u128, ValidationError> {
        calculate_tax_amount(amount, self.0)
    }
}

impl std::fmt::Display for BasisPoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}bps", self.0)
    }
}

/// Convert basis points to whole percent by integer division by 100.
pub fn basis_points_to_percent(bps: u32) -> u32 {
    bps / 100
}

/// `floor(amount × bps / 10_000)`.
///
/// Fails only when `amount × bps` does not fit in `u128`.
pub fn calculate_tax_amount(amount: u128, bps: u32) -> Result<u128, ValidationError> {
    amount
        .checked_mul(u128::from(bps))
        .map(|scaled| scaled / BASIS_POINTS_DENOMINATOR)
        .ok_or(ValidationError::ArithmeticOverflow {
            operation: "tax amount",
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tax_amount_truncates() {
        assert_eq!(calculate_tax_amount(1000, 750), Ok(75));
        assert_eq!(calculate_tax_amount(999, 100), Ok(9));
        assert_eq!(calculate_tax_amount(1, 9_999), Ok(0));
    }

    #[test]
    fn tax_amount_edges() {
        assert_eq!(calculate_tax_amount(0, 2500), Ok(0));
        assert_eq!(calculate_tax_amount(1_000_000, 0), Ok(0));
        assert_eq!(calculate_tax_amount(1_000, 10_000), Ok(1_000));
        // No cap: rates beyond 100% are allowed.
        assert_eq!(calculate_tax_amount(1_000, 15_000), Ok(1_500));
    }

    #[test]
    fn tax_amount_overflow_is_reported() {
        assert!(matches!(
            calculate_tax_amount(u128::MAX, 2),
            Err(ValidationError::ArithmeticOverflow { .. })
        ));
        assert_eq!(calculate_tax_amount(u128::MAX, 1), Ok(u128::MAX / 10_000));
    }

    #[test]
    fn percent_truncates() {
        assert_eq!(basis_points_to_percent(750), 7);
        assert_eq!(basis_points_to_percent(2500), 25);
        assert_eq!(basis_points_to_percent(99), 0);
        assert_eq!(basis_points_to_percent(10_000), 100);
    }

    #[test]
    fn basis_points_newtype() {
        let rate = BasisPoints::new(750);
        assert_eq!(rate.value(), 750);
        assert_eq!(rate.percent(), 7);
        assert_eq!(rate.apply(1000), Ok(75));
        assert_eq!(rate.to_string(), "750bps");
        assert_eq!(serde_json::to_string(&rate).unwrap(), "750");
    }
}
