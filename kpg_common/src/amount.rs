use std::{
    fmt::{self, Display},
    iter::Sum,
    ops::{Add, AddAssign, Mul, Sub},
    str::FromStr,
};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The number of minor units in one major unit. Every supported currency is quoted with two decimal places.
const MINOR_UNITS: i64 = 100;

//--------------------------------------       Amount        ---------------------------------------------------------
/// A non-negative monetary amount, held as an integer number of minor units (hundredths).
///
/// Amounts are always rendered with exactly two decimal places and a `.` separator, which is the form the QR payload
/// requires in its transaction amount field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Type)]
#[sqlx(transparent)]
pub struct Amount(i64);

op!(binary Amount, Add, add);
op!(binary Amount, Sub, sub);
op!(inplace Amount, AddAssign, add_assign);

impl Mul<i64> for Amount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid amount: {0}")]
pub struct AmountParseError(String);

impl Amount {
    pub fn from_minor_units(units: i64) -> Self {
        Self(units)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parses an amount that must already be formatted with exactly two decimal places, e.g. `"12.50"`.
    ///
    /// This is the strict form used when building payloads. Use [`Amount::from_str`] to accept user input such as
    /// `"12.5"` or `"12"`.
    pub fn parse_formatted(s: &str) -> Result<Self, AmountParseError> {
        match s.split_once('.') {
            Some((_, frac)) if frac.len() == 2 => parse_decimal(s),
            _ => Err(AmountParseError(format!("'{s}' is not formatted with exactly two decimal places"))),
        }
    }
}

/// Accepts a non-negative decimal number with at most two decimal places.
impl FromStr for Amount {
    type Err = AmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_decimal(s.trim())
    }
}

fn parse_decimal(s: &str) -> Result<Amount, AmountParseError> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    let is_digits = |v: &str| v.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !is_digits(whole) || !is_digits(frac) {
        return Err(AmountParseError(format!("'{s}' is not a non-negative decimal number")));
    }
    if frac.len() > 2 || (s.contains('.') && frac.is_empty()) {
        return Err(AmountParseError(format!("'{s}' must have one or two decimal places")));
    }
    let whole = whole.parse::<i64>().map_err(|e| AmountParseError(format!("'{s}': {e}")))?;
    let frac = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|e| AmountParseError(e.to_string()))? * 10,
        _ => frac.parse::<i64>().map_err(|e| AmountParseError(e.to_string()))?,
    };
    whole
        .checked_mul(MINOR_UNITS)
        .and_then(|v| v.checked_add(frac))
        .map(Amount)
        .ok_or_else(|| AmountParseError(format!("'{s}' is too large")))
}

impl Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / MINOR_UNITS, self.0 % MINOR_UNITS)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative amount with at most two decimal places")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_mul(MINOR_UNITS))
                    .map(Amount)
                    .ok_or_else(|| E::custom(format!("{v} is too large")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v < 0 {
                    return Err(E::custom(format!("{v} is negative")));
                }
                self.visit_u64(v as u64)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                format!("{v}").parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_and_display() {
        assert_eq!("0.03".parse::<Amount>().unwrap(), Amount::from_minor_units(3));
        assert_eq!("12.5".parse::<Amount>().unwrap().to_string(), "12.50");
        assert_eq!("10000".parse::<Amount>().unwrap().to_string(), "10000.00");
        assert_eq!(Amount::from_minor_units(100_005).to_string(), "1000.05");
    }

    #[test]
    fn rejects_malformed_amounts() {
        for bad in ["KHR 10000", "-1.00", "1.005", "", ".50", "1.", "1,50", "1e3"] {
            assert!(bad.parse::<Amount>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn strict_format_requires_two_decimals() {
        assert!(Amount::parse_formatted("0.03").is_ok());
        assert!(Amount::parse_formatted("1.5").is_err());
        assert!(Amount::parse_formatted("100").is_err());
        assert!(Amount::parse_formatted("1.500").is_err());
    }

    #[test]
    fn json_accepts_strings_and_numbers() {
        let a: Amount = serde_json::from_str("\"4.20\"").unwrap();
        let b: Amount = serde_json::from_str("4.2").unwrap();
        let c: Amount = serde_json::from_str("4").unwrap();
        assert_eq!(a, b);
        assert_eq!(c.to_string(), "4.00");
        assert!(serde_json::from_str::<Amount>("-4").is_err());
        assert_eq!(serde_json::to_string(&a).unwrap(), "\"4.20\"");
    }

    #[test]
    fn arithmetic() {
        let total: Amount = [Amount::from_minor_units(150), Amount::from_minor_units(250) * 2].into_iter().sum();
        assert_eq!(total.to_string(), "6.50");
    }
}
