//! Fixed-point money type.
//!
//! Values are stored as a signed count of 10⁻⁸ coin units, so sums and the
//! 2.5% levy are exact integer arithmetic and a replayed ledger conserves value
//! to the last unit.

use ledger_derive::{BinaryCodec, Error};
use std::fmt;
use std::str::FromStr;

/// Number of fractional decimal digits an [`Amount`] carries.
pub const DECIMALS: u32 = 8;

/// Smallest units per whole coin.
pub const UNITS_PER_COIN: i128 = 10i128.pow(DECIMALS);

/// Largest magnitude, in whole coins, that a parsed amount or an opening
/// balance may have.
pub const MAX_COINS: i128 = 1_000_000_000_000_000_000;

/// Signed count of 10⁻⁸ units. Arithmetic is checked only; there are no
/// `+`/`-` operators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct Amount(i128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// `MAX_COINS` whole coins.
    pub const MAX: Amount = Amount(MAX_COINS * UNITS_PER_COIN);

    pub const fn from_units(units: i128) -> Self {
        Amount(units)
    }

    pub const fn units(self) -> i128 {
        self.0
    }

    /// Whole coins, e.g. `from_coins(200)` is `200.00`.
    pub const fn from_coins(coins: i64) -> Self {
        Amount(coins as i128 * UNITS_PER_COIN)
    }

    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// True when `|self|` is larger than [`Amount::MAX`].
    pub const fn exceeds_max(self) -> bool {
        self.0.unsigned_abs() > Self::MAX.0.unsigned_abs()
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Sum of `amounts`, or `None` on the first overflow.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Option<Amount> {
        amounts
            .into_iter()
            .try_fold(Amount::ZERO, Amount::checked_add)
    }

    /// `self * rate / 1000`, truncated toward zero to whole units.
    pub fn per_mille(self, rate: i128) -> Amount {
        Amount(self.0.saturating_mul(rate) / 1000)
    }
}

/// Renders with at least two decimals and no trailing zeros beyond them:
/// `250.00`, `148.75`, `0.00125`.
impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = UNITS_PER_COIN as u128;
        let whole = abs / scale;
        let mut frac = format!("{:0width$}", abs % scale, width = DECIMALS as usize);
        while frac.len() > 2 && frac.ends_with('0') {
            frac.pop();
        }
        let text = format!("{sign}{whole}.{frac}");
        f.pad(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountParseError {
    #[error("amount is empty")]
    Empty,

    #[error("invalid amount '{0}'")]
    Malformed(String),

    #[error("amount '{0}' has more than 8 decimal places")]
    TooPrecise(String),

    #[error("amount '{0}' is out of range")]
    OutOfRange(String),
}

impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        if text.is_empty() {
            return Err(AmountParseError::Empty);
        }

        let (negative, digits) = match text.as_bytes()[0] {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(AmountParseError::Malformed(text.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountParseError::TooPrecise(text.to_string()));
        }

        let out_of_range = || AmountParseError::OutOfRange(text.to_string());
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<i128>().map_err(|_| out_of_range())?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<width$}", width = DECIMALS as usize);
            padded.parse::<i128>().map_err(|_| out_of_range())?
        };

        let units = whole_units
            .checked_mul(UNITS_PER_COIN)
            .and_then(|u| u.checked_add(frac_units))
            .ok_or_else(out_of_range)?;
        let amount = Amount(if negative { -units } else { units });
        if amount.exceeds_max() {
            return Err(out_of_range());
        }
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!(amt("200"), Amount::from_coins(200));
        assert_eq!(amt("1.25").units(), 125_000_000);
        assert_eq!(amt(".5").units(), 50_000_000);
        assert_eq!(amt("7.").units(), 700_000_000);
        assert_eq!(amt("0.00000001").units(), 1);
    }

    #[test]
    fn parses_signs() {
        assert_eq!(amt("-10"), Amount::from_coins(-10));
        assert!(amt("-10").is_negative());
        assert_eq!(amt("+3"), Amount::from_coins(3));
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<Amount>(), Err(AmountParseError::Empty));
        assert!(matches!("abc".parse::<Amount>(), Err(AmountParseError::Malformed(_))));
        assert!(matches!("1.2.3".parse::<Amount>(), Err(AmountParseError::Malformed(_))));
        assert!(matches!(".".parse::<Amount>(), Err(AmountParseError::Malformed(_))));
        assert!(matches!("-".parse::<Amount>(), Err(AmountParseError::Malformed(_))));
        assert!(matches!(
            "0.000000001".parse::<Amount>(),
            Err(AmountParseError::TooPrecise(_))
        ));
        assert!(matches!(
            "999999999999999999999999999999999999999".parse::<Amount>(),
            Err(AmountParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn display_keeps_two_decimals() {
        assert_eq!(Amount::from_coins(250).to_string(), "250.00");
        assert_eq!(amt("148.75").to_string(), "148.75");
        assert_eq!(amt("1.25").to_string(), "1.25");
        assert_eq!(amt("0.00125").to_string(), "0.00125");
        assert_eq!(Amount::ZERO.to_string(), "0.00");
        assert_eq!(amt("-10").to_string(), "-10.00");
    }

    #[test]
    fn display_honours_padding() {
        assert_eq!(format!("{:>8}", amt("1.5")), "    1.50");
    }

    #[test]
    fn per_mille_of_fifty_is_exact() {
        assert_eq!(amt("50").per_mille(25), amt("1.25"));
        assert_eq!(amt("0.00000039").per_mille(25).units(), 0);
    }

    #[test]
    fn parse_caps_at_max() {
        assert_eq!(amt("1000000000000000000"), Amount::MAX);
        assert_eq!(amt("-1000000000000000000").units(), -Amount::MAX.units());
        assert!(matches!(
            "1000000000000000000.00000001".parse::<Amount>(),
            Err(AmountParseError::OutOfRange(_))
        ));
        assert!(matches!(
            "1701411834604692317316873037158".parse::<Amount>(),
            Err(AmountParseError::OutOfRange(_))
        ));
    }

    #[test]
    fn checked_arithmetic() {
        assert_eq!(
            Amount::checked_sum([amt("148.75"), amt("250"), amt("1.25")]),
            Some(Amount::from_coins(400))
        );
        assert_eq!(amt("5").checked_sub(amt("7")), Some(amt("-2")));
        assert_eq!(Amount::from_units(i128::MAX).checked_add(Amount::from_units(1)), None);
        assert_eq!(
            Amount::checked_sum([Amount::from_units(i128::MAX), Amount::from_units(1)]),
            None
        );
        assert!(Amount::from_units(i128::MIN).exceeds_max());
        assert!(!Amount::MAX.exceeds_max());
    }
}
