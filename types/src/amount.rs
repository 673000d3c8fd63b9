//! Token amount type.
//!
//! Amounts are fixed-point integers (u128) in the chain's base denomination,
//! 18 fractional digits below one human-readable unit. Every conversion from
//! decimal text truncates toward zero; precision below 1e-18 is dropped.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::error::TypesError;

/// Number of fractional digits in the base denomination.
pub const DECIMALS: u32 = 18;

/// One human-readable unit expressed in base units (10^18).
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// An amount of tokens, stored as raw base units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const ONE_UNIT: Self = Self(UNIT);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Whole human-readable units, scaled to base units.
    pub fn from_units(units: u64) -> Self {
        Self(units as u128 * UNIT)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn checked_mul(self, factor: u64) -> Option<Self> {
        self.0.checked_mul(factor as u128).map(Self)
    }

    /// Integer division in base units, truncating the remainder.
    pub fn checked_div(self, divisor: u64) -> Option<Self> {
        self.0.checked_div(divisor as u128).map(Self)
    }

    /// Parse a human-readable decimal (`"100"`, `"0.25"`, `"1.5e3"`) into base units.
    ///
    /// Digits beyond the 18th fractional place are truncated. Signs other
    /// than a leading `+` are rejected.
    pub fn parse_decimal(text: &str) -> Result<Self, TypesError> {
        let s = text.trim();
        let invalid = || TypesError::InvalidAmount(text.to_string());

        let (mantissa, exponent) = match s.find(['e', 'E']) {
            Some(pos) => {
                let exp: i64 = s[pos + 1..].parse().map_err(|_| invalid())?;
                (&s[..pos], exp)
            }
            None => (s, 0),
        };
        let mantissa = mantissa.strip_prefix('+').unwrap_or(mantissa);
        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let all_digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part}");
        let digits = digits.trim_start_matches('0');
        if digits.is_empty() {
            return Ok(Self::ZERO);
        }

        // value = digits * 10^(DECIMALS + exponent - frac_len) in base units
        // Computed in i128 so no exponent from the input can overflow it.
        let shift = i128::from(DECIMALS) + i128::from(exponent) - frac_part.len() as i128;
        if shift >= 0 {
            let significand: u128 = digits.parse().map_err(|_| invalid())?;
            let scale = u32::try_from(shift)
                .ok()
                .and_then(|s| 10u128.checked_pow(s))
                .ok_or_else(invalid)?;
            significand.checked_mul(scale).map(Self).ok_or_else(invalid)
        } else {
            // More dropped digits than usize can count truncates to zero anyway.
            let dropped = usize::try_from(-shift).unwrap_or(usize::MAX);
            if dropped >= digits.len() {
                return Ok(Self::ZERO);
            }
            let kept = &digits[..digits.len() - dropped];
            kept.parse().map(Self).map_err(|_| invalid())
        }
    }

    /// Human-readable decimal form without trailing zeros (`"99"`, `"0.5"`).
    pub fn to_decimal_string(&self) -> String {
        let whole = self.0 / UNIT;
        let frac = self.0 % UNIT;
        if frac == 0 {
            return whole.to_string();
        }
        let frac = format!("{:018}", frac);
        format!("{}.{}", whole, frac.trim_end_matches('0'))
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string())
    }
}

impl FromStr for Amount {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_decimal(s)
    }
}

// ── Serde ──────────────────────────────────────────────────────────────
//
// The default representation is the human-readable decimal used by
// allocation files. Numbers and strings are both accepted on input.

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

struct DecimalVisitor;

impl Visitor<'_> for DecimalVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a non-negative decimal number or string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::parse_decimal(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::from_units(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        u64::try_from(v)
            .map(Amount::from_units)
            .map_err(|_| E::custom(TypesError::InvalidAmount(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        if !v.is_finite() {
            return Err(E::custom(TypesError::InvalidAmount(v.to_string())));
        }
        // `Display` for f64 yields the shortest round-tripping decimal, never exponent form.
        Amount::parse_decimal(&v.to_string()).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }
}

/// Serde adapter that encodes an [`Amount`] as a string of raw base units,
/// the representation the node RPC expects.
pub mod as_raw {
    use super::Amount;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.raw().to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u128>()
            .map(Amount::new)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_whole_units() {
        assert_eq!(Amount::parse_decimal("100").unwrap(), Amount::from_units(100));
        assert_eq!(Amount::parse_decimal("+7").unwrap(), Amount::from_units(7));
    }

    #[test]
    fn parses_fractions() {
        assert_eq!(Amount::parse_decimal("0.5").unwrap().raw(), UNIT / 2);
        assert_eq!(Amount::parse_decimal(".25").unwrap().raw(), UNIT / 4);
        assert_eq!(Amount::parse_decimal("1.").unwrap(), Amount::ONE_UNIT);
    }

    #[test]
    fn truncates_beyond_eighteen_places() {
        let a = Amount::parse_decimal("0.0000000000000000019").unwrap();
        assert_eq!(a.raw(), 1);
        let b = Amount::parse_decimal("0.00000000000000000099").unwrap();
        assert_eq!(b, Amount::ZERO);
    }

    #[test]
    fn parses_exponent_form() {
        assert_eq!(Amount::parse_decimal("1.5e3").unwrap(), Amount::from_units(1500));
        assert_eq!(Amount::parse_decimal("25E-1").unwrap().raw(), 25 * UNIT / 10);
    }

    #[test]
    fn rejects_garbage_and_negatives() {
        for bad in ["", ".", "-1", "abc", "1.2.3", "1e", "0x10", " - 3"] {
            assert!(Amount::parse_decimal(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn rejects_overflow() {
        assert!(Amount::parse_decimal("1e40").is_err());
        assert!(Amount::parse_decimal("999999999999999999999999999999999999999").is_err());
    }

    #[test]
    fn extreme_exponents_do_not_overflow() {
        assert!(Amount::parse_decimal("1e9223372036854775807").is_err());
        assert!(serde_json::from_str::<Amount>("\"1e9223372036854775807\"").is_err());
        assert!(Amount::parse_decimal("1.5e9223372036854775807").is_err());
        assert_eq!(Amount::parse_decimal("1e-9223372036854775808").unwrap(), Amount::ZERO);
        assert_eq!(
            Amount::parse_decimal("0.0000000000000000001e-9223372036854775808").unwrap(),
            Amount::ZERO
        );
        assert!(Amount::parse_decimal("1e9223372036854775808").is_err());
    }

    #[test]
    fn decimal_string_trims_trailing_zeros() {
        assert_eq!(Amount::from_units(99).to_decimal_string(), "99");
        assert_eq!(Amount::new(UNIT + UNIT / 2).to_decimal_string(), "1.5");
        assert_eq!(Amount::new(1).to_decimal_string(), "0.000000000000000001");
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let a: Amount = serde_json::from_str("100").unwrap();
        let b: Amount = serde_json::from_str("\"100\"").unwrap();
        let c: Amount = serde_json::from_str("12.75").unwrap();
        assert_eq!(a, b);
        assert_eq!(c.to_decimal_string(), "12.75");
        assert!(serde_json::from_str::<Amount>("-3").is_err());
        assert!(serde_json::from_str::<Amount>("\"-3\"").is_err());
    }

    #[test]
    fn raw_adapter_uses_base_units() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "as_raw")]
            value: Amount,
        }
        let json = serde_json::to_string(&Wrapper { value: Amount::ONE_UNIT }).unwrap();
        assert_eq!(json, r#"{"value":"1000000000000000000"}"#);
        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.value, Amount::ONE_UNIT);
    }

    proptest! {
        #[test]
        fn decimal_string_parses_back(raw in 0u128..u128::MAX / 2) {
            let a = Amount::new(raw);
            prop_assert_eq!(Amount::parse_decimal(&a.to_decimal_string()).unwrap(), a);
        }
    }
}
