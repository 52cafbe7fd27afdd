use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use serde_json::Number;

use crate::bail;
use crate::error::{ArchiverResult, ErrorKind};

/// Normalizes an arbitrary-precision decimal into a JSON number.
///
/// Integral decimals become integers and never lose precision: values outside the `i64` and
/// `u64` ranges are emitted as exact integer literals. Other decimals become `f64`, falling back
/// to the exact decimal literal when the value does not fit a finite float.
pub fn normalize_decimal(value: &BigDecimal) -> ArchiverResult<Number> {
    if value.is_integer() {
        if let Some(int) = value.to_i64() {
            return Ok(Number::from(int));
        }

        if let Some(uint) = value.to_u64() {
            return Ok(Number::from(uint));
        }

        let (digits, _) = value.with_scale(0).into_bigint_and_exponent();
        return parse_literal(&digits.to_string());
    }

    if let Some(number) = value.to_f64().and_then(Number::from_f64) {
        return Ok(number);
    }

    parse_literal(&value.to_string())
}

fn parse_literal(literal: &str) -> ArchiverResult<Number> {
    match Number::from_str(literal) {
        Ok(number) => Ok(number),
        Err(err) => bail!(
            ErrorKind::ConversionError,
            "Decimal cannot be represented as a JSON number",
            format!("{literal}: {err}")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(literal: &str) -> String {
        let decimal = BigDecimal::from_str(literal).unwrap();
        normalize_decimal(&decimal).unwrap().to_string()
    }

    #[test]
    fn integral_decimals_become_integers() {
        assert_eq!(normalize("42"), "42");
        assert_eq!(normalize("42.000"), "42");
        assert_eq!(normalize("-7"), "-7");
        assert_eq!(normalize("18446744073709551615"), "18446744073709551615");
    }

    #[test]
    fn integers_beyond_u64_keep_every_digit() {
        assert_eq!(
            normalize("123456789012345678901234567890"),
            "123456789012345678901234567890"
        );
    }

    #[test]
    fn fractional_decimals_become_floats() {
        assert_eq!(normalize("1.5"), "1.5");
        assert_eq!(normalize("-0.25"), "-0.25");
    }
}
