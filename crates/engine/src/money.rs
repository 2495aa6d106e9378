use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **integer minor units** (rupiah).
///
/// Use this type for **all** monetary values in the engine (amounts, limits,
/// spent totals) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = income / increase
/// - negative = expense / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(50_000);
/// assert_eq!(amount.minor(), 50_000);
/// assert_eq!(amount.to_string(), "Rp50.000");
/// ```
///
/// Parsing from user input (strips `Rp`, spaces and digit-group separators;
/// rejects anything non-numeric):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("50000".parse::<Money>().unwrap().minor(), 50_000);
/// assert_eq!("Rp 50.000".parse::<Money>().unwrap().minor(), 50_000);
/// assert!("makan".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    /// Formats with id-ID digit grouping: `Rp50.000`, `-Rp1.250.000`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        let offset = digits.len() % 3;
        for (i, c) in digits.chars().enumerate() {
            if i != 0 && (i + 3 - offset) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(c);
        }
        write!(f, "{sign}Rp{grouped}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a free-form amount string into minor units.
    ///
    /// Accepts an optional leading `+`/`-` and an optional `Rp`/`rp` prefix.
    /// `.`/`,` and spaces are treated as digit-group separators (rupiah has
    /// no fractional unit in practice, so a trailing `,00` group is digits
    /// like any other).
    ///
    /// Validation rules:
    /// - at least one digit after stripping
    /// - nothing but digits and separators after the prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::Validation("empty amount".to_string());
        let invalid = || EngineError::Validation(format!("invalid amount: {s}"));
        let overflow = || EngineError::Validation("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let rest = rest.trim_start();
        let rest = rest
            .strip_prefix("Rp")
            .or_else(|| rest.strip_prefix("rp"))
            .or_else(|| rest.strip_prefix("RP"))
            .unwrap_or(rest);

        let mut minor: i64 = 0;
        let mut seen_digit = false;
        for c in rest.chars() {
            match c {
                '0'..='9' => {
                    seen_digit = true;
                    let digit = i64::from(c as u8 - b'0');
                    minor = minor
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(digit))
                        .ok_or_else(overflow)?;
                }
                '.' | ',' | ' ' => {}
                _ => return Err(invalid()),
            }
        }

        if !seen_digit {
            return Err(invalid());
        }

        let signed = if sign < 0 {
            minor.checked_neg().ok_or_else(overflow)?
        } else {
            minor
        };

        Ok(Money(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_digits() {
        assert_eq!(Money::new(0).to_string(), "Rp0");
        assert_eq!(Money::new(500).to_string(), "Rp500");
        assert_eq!(Money::new(50_000).to_string(), "Rp50.000");
        assert_eq!(Money::new(2_100_000).to_string(), "Rp2.100.000");
        assert_eq!(Money::new(-1_250_000).to_string(), "-Rp1.250.000");
    }

    #[test]
    fn parse_strips_prefix_and_separators() {
        assert_eq!("50000".parse::<Money>().unwrap().minor(), 50_000);
        assert_eq!("50.000".parse::<Money>().unwrap().minor(), 50_000);
        assert_eq!("Rp 50.000".parse::<Money>().unwrap().minor(), 50_000);
        assert_eq!("rp50,000".parse::<Money>().unwrap().minor(), 50_000);
        assert_eq!("  1 550 000 ".parse::<Money>().unwrap().minor(), 1_550_000);
        assert_eq!("-200".parse::<Money>().unwrap().minor(), -200);
    }

    #[test]
    fn parse_rejects_non_numeric() {
        assert!("".parse::<Money>().is_err());
        assert!("Rp".parse::<Money>().is_err());
        assert!("makan".parse::<Money>().is_err());
        assert!("12x00".parse::<Money>().is_err());
    }
}
