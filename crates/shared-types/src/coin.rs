//! # Coin Arithmetic
//!
//! Fixed-point coin amounts: whole units plus a fraction over a fixed
//! denominator. All arithmetic is checked; running out of range returns
//! `None` and the caller decides what that means. For a mirror applying a
//! validated log, a balance below zero is not a number problem, it is
//! proof the mirror has drifted.

use serde::{Deserialize, Serialize};

/// A coin amount: `units + fraction / FRACTION_DENOMINATOR`.
///
/// Always normalized: `fraction < FRACTION_DENOMINATOR`. The derived
/// ordering (units first, then fraction) is the numeric ordering because
/// of that invariant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Coin {
    /// Whole units.
    pub units: u64,
    /// Fractional part, in units of `1 / FRACTION_DENOMINATOR`.
    pub fraction: u64,
}

impl Coin {
    /// Number of fractional steps per whole unit.
    pub const FRACTION_DENOMINATOR: u64 = 100_000_000;

    /// The zero amount.
    pub const ZERO: Coin = Coin {
        units: 0,
        fraction: 0,
    };

    /// Builds an amount, normalizing a fraction at or above the
    /// denominator into whole units.
    pub fn new(units: u64, fraction: u64) -> Self {
        Coin {
            units: units + fraction / Self::FRACTION_DENOMINATOR,
            fraction: fraction % Self::FRACTION_DENOMINATOR,
        }
    }

    /// An amount of whole units.
    pub fn from_units(units: u64) -> Self {
        Coin { units, fraction: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.units == 0 && self.fraction == 0
    }

    /// Checked addition with fraction carry. `None` when the unit part
    /// leaves `u64`.
    pub fn checked_add(self, other: Coin) -> Option<Coin> {
        let mut units = self.units.checked_add(other.units)?;
        let mut fraction = self.fraction + other.fraction;
        if fraction >= Self::FRACTION_DENOMINATOR {
            fraction -= Self::FRACTION_DENOMINATOR;
            units = units.checked_add(1)?;
        }
        Some(Coin { units, fraction })
    }

    /// Checked subtraction with fraction borrow. `None` when the result
    /// would be negative.
    pub fn checked_sub(self, other: Coin) -> Option<Coin> {
        let borrow = self.fraction < other.fraction;
        let units = self
            .units
            .checked_sub(other.units)?
            .checked_sub(borrow as u64)?;
        let fraction = if borrow {
            self.fraction + Self::FRACTION_DENOMINATOR - other.fraction
        } else {
            self.fraction - other.fraction
        };
        Some(Coin { units, fraction })
    }
}

impl std::fmt::Display for Coin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:08}", self.units, self.fraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_overflowing_fraction() {
        let coin = Coin::new(1, 250_000_000);
        assert_eq!(coin, Coin::new(3, 50_000_000));
        assert_eq!(coin.units, 3);
        assert_eq!(coin.fraction, 50_000_000);
    }

    #[test]
    fn test_add_carries_fraction() {
        let a = Coin::new(1, 60_000_000);
        let b = Coin::new(2, 70_000_000);
        assert_eq!(a.checked_add(b), Some(Coin::new(4, 30_000_000)));
    }

    #[test]
    fn test_add_detects_unit_overflow() {
        let a = Coin::from_units(u64::MAX);
        assert_eq!(a.checked_add(Coin::from_units(1)), None);
        assert_eq!(
            Coin::new(u64::MAX, 99_999_999).checked_add(Coin::new(0, 1)),
            None
        );
    }

    #[test]
    fn test_sub_borrows_fraction() {
        let a = Coin::new(2, 10_000_000);
        let b = Coin::new(1, 60_000_000);
        assert_eq!(a.checked_sub(b), Some(Coin::new(0, 50_000_000)));
    }

    #[test]
    fn test_sub_below_zero_is_none() {
        assert_eq!(Coin::from_units(1).checked_sub(Coin::from_units(2)), None);
        assert_eq!(
            Coin::from_units(1).checked_sub(Coin::new(1, 1)),
            None
        );
    }

    #[test]
    fn test_sub_is_exact_inverse_of_add() {
        let start = Coin::new(7, 25_000_000);
        let delta = Coin::new(3, 90_000_000);
        let roundtrip = start
            .checked_add(delta)
            .and_then(|sum| sum.checked_sub(delta));
        assert_eq!(roundtrip, Some(start));
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(Coin::new(1, 99_999_999) < Coin::from_units(2));
        assert!(Coin::new(2, 1) > Coin::from_units(2));
    }

    #[test]
    fn test_display_pads_fraction() {
        assert_eq!(Coin::new(5, 1_000_000).to_string(), "5.01000000");
        assert_eq!(Coin::ZERO.to_string(), "0.00000000");
    }

    #[test]
    fn test_zero() {
        assert!(Coin::ZERO.is_zero());
        assert!(!Coin::new(0, 1).is_zero());
        assert_eq!(Coin::default(), Coin::ZERO);
    }
}
