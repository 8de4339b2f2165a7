//! Lenient parsing for currency amounts.
//!
//! The remote service stores amounts as arbitrary-precision decimals and
//! serializes them as JSON numbers, but older records and bulk imports have
//! been seen to carry them as strings. A malformed amount must never fail a
//! fetch and must never poison an aggregate, so item-level amounts are
//! coerced to zero instead of rejected.

use std::fmt;

use serde::de::{Deserializer, Visitor};

/// Deserialize an `f64` from a JSON number, a numeric string, or null.
/// Anything unparseable becomes `0.0`.
///
/// For use with `#[serde(deserialize_with = "crate::amount::lenient_f64")]`.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = f64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or a numeric string")
        }

        fn visit_f64<E>(self, value: f64) -> Result<f64, E> {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_u64<E>(self, value: u64) -> Result<f64, E> {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<f64, E> {
            Ok(value.trim().parse().unwrap_or(0.0))
        }

        fn visit_unit<E>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_none<E>(self) -> Result<f64, E> {
            Ok(0.0)
        }

        fn visit_some<D2>(self, deserializer: D2) -> Result<f64, D2::Error>
        where
            D2: Deserializer<'de>,
        {
            deserializer.deserialize_any(AmountVisitor)
        }

        fn visit_bool<E>(self, _: bool) -> Result<f64, E> {
            Ok(0.0)
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}

/// The contribution of a stored amount to an aggregate. NaN and infinities
/// count as zero so one bad value cannot turn every total into NaN.
pub(crate) fn or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}


#[cfg(test)]
mod or_zero_tests {
    use super::or_zero;

    #[test]
    fn passes_finite_values_through() {
        assert_eq!(-42.5, or_zero(-42.5));
    }

    #[test]
    fn zeroes_nan_and_infinities() {
        assert_eq!(0.0, or_zero(f64::NAN));
        assert_eq!(0.0, or_zero(f64::INFINITY));
        assert_eq!(0.0, or_zero(f64::NEG_INFINITY));
    }
}
