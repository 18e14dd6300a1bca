use std::{
    fmt,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Signed money amount represented as **integer minor units** (cents).
///
/// Stored record amounts are always non-negative; the sign only shows up in
/// derived values such as a net balance. Arithmetic saturates at the `i64`
/// bounds instead of overflowing.
///
/// # Examples
///
/// ```rust
/// use ledger::MoneyCents;
///
/// let amount = MoneyCents::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator and an
/// exponent; extra decimals round half up to the cent):
///
/// ```rust
/// use ledger::MoneyCents;
///
/// assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<MoneyCents>().unwrap().cents(), 1050);
/// assert_eq!("12.345".parse::<MoneyCents>().unwrap().cents(), 1235);
/// assert_eq!("1e3".parse::<MoneyCents>().unwrap().cents(), 100_000);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct MoneyCents(i64);

impl MoneyCents {
    pub const ZERO: MoneyCents = MoneyCents(0);

    /// Largest magnitude accepted from text: one trillion units.
    pub const MAX_PARSED: MoneyCents = MoneyCents(100_000_000_000_000);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_add(rhs.0).map(MoneyCents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: MoneyCents) -> Option<MoneyCents> {
        self.0.checked_sub(rhs.0).map(MoneyCents)
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: MoneyCents) -> MoneyCents {
        MoneyCents(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: MoneyCents) -> MoneyCents {
        MoneyCents(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for MoneyCents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for MoneyCents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<MoneyCents> for i64 {
    fn from(value: MoneyCents) -> Self {
        value.0
    }
}

impl Add for MoneyCents {
    type Output = MoneyCents;

    fn add(self, rhs: MoneyCents) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl AddAssign for MoneyCents {
    fn add_assign(&mut self, rhs: MoneyCents) {
        *self = self.saturating_add(rhs);
    }
}

impl Sub for MoneyCents {
    type Output = MoneyCents;

    fn sub(self, rhs: MoneyCents) -> Self::Output {
        self.saturating_sub(rhs)
    }
}

impl SubAssign for MoneyCents {
    fn sub_assign(&mut self, rhs: MoneyCents) {
        *self = self.saturating_sub(rhs);
    }
}

impl Neg for MoneyCents {
    type Output = MoneyCents;

    fn neg(self) -> Self::Output {
        MoneyCents(self.0.saturating_neg())
    }
}

impl std::iter::Sum for MoneyCents {
    fn sum<I: Iterator<Item = MoneyCents>>(iter: I) -> Self {
        iter.fold(MoneyCents::ZERO, Add::add)
    }
}

impl FromStr for MoneyCents {
    type Err = LedgerError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator, an optional leading `+`/`-`, a
    /// missing units part (`.5`) and an exponent (`1e3`). Digits past the cent
    /// are rounded half up. Magnitudes above [`MoneyCents::MAX_PARSED`] are
    /// rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LedgerError::InvalidAmount(format!("invalid amount: {s:?}"));
        let too_large = || LedgerError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::InvalidAmount("empty amount".to_string()));
        }

        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(stripped) => (true, stripped),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let rest = rest.trim().replace(',', ".");
        let (mantissa, exponent) = match rest.split_once(['e', 'E']) {
            Some((mantissa, exponent)) => {
                (mantissa, exponent.parse::<i64>().map_err(|_| invalid())?)
            }
            None => (rest.as_str(), 0),
        };
        let (units, frac) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if units.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !units.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        // All digits as one integer, scaled by 10^shift to land on cents.
        let digits = format!("{units}{frac}");
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(MoneyCents::ZERO);
        }
        let frac_len = i64::try_from(frac.len()).map_err(|_| invalid())?;
        let shift = exponent.saturating_add(2).saturating_sub(frac_len);

        let max_digits = 18;
        let total: i64 = if shift >= 0 {
            if shift > max_digits || digits.len() > max_digits as usize {
                return Err(too_large());
            }
            let value: i64 = digits.parse().map_err(|_| too_large())?;
            value
                .checked_mul(10_i64.pow(shift as u32))
                .ok_or_else(too_large)?
        } else {
            let dropped = usize::try_from(shift.unsigned_abs()).unwrap_or(usize::MAX);
            if dropped > digits.len() {
                0
            } else {
                let (kept, tail) = digits.split_at(digits.len() - dropped);
                if kept.len() > max_digits as usize {
                    return Err(too_large());
                }
                let kept: i64 = if kept.is_empty() {
                    0
                } else {
                    kept.parse().map_err(|_| too_large())?
                };
                let round_up = tail.as_bytes().first().is_some_and(|d| *d >= b'5');
                kept + i64::from(round_up)
            }
        };

        if total > MoneyCents::MAX_PARSED.0 {
            return Err(too_large());
        }
        Ok(MoneyCents(if negative { -total } else { total }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_minor_units() {
        assert_eq!(MoneyCents::new(0).to_string(), "0.00");
        assert_eq!(MoneyCents::new(7).to_string(), "0.07");
        assert_eq!(MoneyCents::new(100_000).to_string(), "1000.00");
        assert_eq!(MoneyCents::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<MoneyCents>().unwrap().cents(), 1000);
        assert_eq!("10.5".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("10,50".parse::<MoneyCents>().unwrap().cents(), 1050);
        assert_eq!("10.".parse::<MoneyCents>().unwrap().cents(), 1000);
        assert_eq!("-0.01".parse::<MoneyCents>().unwrap().cents(), -1);
        assert_eq!("+1.00".parse::<MoneyCents>().unwrap().cents(), 100);
        assert_eq!("  2.30 ".parse::<MoneyCents>().unwrap().cents(), 230);
    }

    #[test]
    fn parse_accepts_loose_decimal_forms() {
        assert_eq!(".5".parse::<MoneyCents>().unwrap().cents(), 50);
        assert_eq!(",25".parse::<MoneyCents>().unwrap().cents(), 25);
        assert_eq!("1e3".parse::<MoneyCents>().unwrap().cents(), 100_000);
        assert_eq!("2.5E-1".parse::<MoneyCents>().unwrap().cents(), 25);
        assert_eq!("0.000".parse::<MoneyCents>().unwrap().cents(), 0);
        assert_eq!("0e99999".parse::<MoneyCents>().unwrap().cents(), 0);
    }

    #[test]
    fn parse_rounds_extra_decimals_half_up() {
        assert_eq!("12.345".parse::<MoneyCents>().unwrap().cents(), 1235);
        assert_eq!("12.344".parse::<MoneyCents>().unwrap().cents(), 1234);
        assert_eq!("0.004".parse::<MoneyCents>().unwrap().cents(), 0);
        assert_eq!("0.005".parse::<MoneyCents>().unwrap().cents(), 1);
        assert_eq!("1e-9".parse::<MoneyCents>().unwrap().cents(), 0);
        assert_eq!("-0.015".parse::<MoneyCents>().unwrap().cents(), -2);
    }

    #[test]
    fn parse_caps_magnitude() {
        assert_eq!(
            "1000000000000".parse::<MoneyCents>().unwrap(),
            MoneyCents::MAX_PARSED
        );
        assert!("1000000000000.01".parse::<MoneyCents>().is_err());
        assert!("92233720368547758".parse::<MoneyCents>().is_err());
        assert!("1e13".parse::<MoneyCents>().is_err());
        assert!("1e400".parse::<MoneyCents>().is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<MoneyCents>().is_err());
        assert!("abc".parse::<MoneyCents>().is_err());
        assert!("1.2.3".parse::<MoneyCents>().is_err());
        assert!(".".parse::<MoneyCents>().is_err());
        assert!("1e".parse::<MoneyCents>().is_err());
        assert!("e5".parse::<MoneyCents>().is_err());
        assert!("NaN".parse::<MoneyCents>().is_err());
        assert!("Infinity".parse::<MoneyCents>().is_err());
        assert!("99999999999999999999".parse::<MoneyCents>().is_err());
    }

    #[test]
    fn sum_folds_from_zero() {
        let total: MoneyCents = [MoneyCents::new(150), MoneyCents::new(50)].into_iter().sum();
        assert_eq!(total, MoneyCents::new(200));
        let empty: MoneyCents = std::iter::empty().sum();
        assert_eq!(empty, MoneyCents::ZERO);
    }

    #[test]
    fn arithmetic_saturates_instead_of_overflowing() {
        let big = MoneyCents::new(i64::MAX - 1);
        assert_eq!(big + MoneyCents::new(10), MoneyCents::new(i64::MAX));
        let total: MoneyCents = [big, big, big].into_iter().sum();
        assert_eq!(total, MoneyCents::new(i64::MAX));
        assert_eq!(-big - big, MoneyCents::new(i64::MIN));
        assert_eq!(-MoneyCents::new(i64::MIN), MoneyCents::new(i64::MAX));
    }
}
