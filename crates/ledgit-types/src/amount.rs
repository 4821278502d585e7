use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Base units per whole unit.
pub const BASE_UNITS_PER_UNIT: u64 = 1_000_000_000;

/// A non-negative amount in integer base units.
///
/// Bounties and donations are stored in base units so that sums never
/// accumulate floating-point error.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_base_units(units: u64) -> Self {
        Self(units)
    }

    pub fn base_units(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }
}

impl FromStr for Amount {
    type Err = TypeError;

    /// Parse a decimal number of whole units, e.g. `"0.5"` or `"12"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypeError::InvalidAmount(s.to_string());
        let s = s.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if frac.len() > 9 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let mut frac_units: u64 = 0;
        if !frac.is_empty() {
            let padded = format!("{frac:0<9}");
            frac_units = padded.parse().map_err(|_| invalid())?;
        }
        whole
            .checked_mul(BASE_UNITS_PER_UNIT)
            .and_then(|w| w.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(invalid)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Amount({})", self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / BASE_UNITS_PER_UNIT;
        let frac = self.0 % BASE_UNITS_PER_UNIT;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:09}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_fractional_units() {
        let half: Amount = "0.5".parse().unwrap();
        assert_eq!(half.base_units(), 500_000_000);
        assert_eq!(half.to_string(), "0.5");
        assert_eq!(".25".parse::<Amount>().unwrap().base_units(), 250_000_000);
        assert_eq!("3".parse::<Amount>().unwrap().to_string(), "3");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("".parse::<Amount>().is_err());
        assert!(".".parse::<Amount>().is_err());
        assert!("-1".parse::<Amount>().is_err());
        assert!("1.0000000001".parse::<Amount>().is_err());
        assert!("1.5x".parse::<Amount>().is_err());
    }

    #[test]
    fn checked_arithmetic() {
        let a = Amount::from_base_units(10);
        let b = Amount::from_base_units(4);
        assert_eq!(a.checked_sub(b), Some(Amount::from_base_units(6)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(Amount::from_base_units(u64::MAX).checked_add(b), None);
    }

    proptest! {
        #[test]
        fn display_parses_back(units in 0u64..u64::MAX / 2) {
            let amount = Amount::from_base_units(units);
            let parsed: Amount = amount.to_string().parse().unwrap();
            prop_assert_eq!(parsed, amount);
        }
    }
}
