//! Decimal string <-> base unit conversion
//!
//! Amounts are written in configs as decimal strings ("20", "0.0000033")
//! and converted exactly, without going through floating point.

use crate::error::ConfigError;
use crate::types::Amount;

fn invalid(value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidAmount {
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Parse a non-negative decimal string into base units with `decimals` places
pub fn parse_units(value: &str, decimals: u32) -> Result<Amount, ConfigError> {
    let text = value.trim().replace('_', "");
    if text.is_empty() {
        return Err(invalid(value, "empty"));
    }

    let (whole, fraction) = match text.split_once('.') {
        Some((w, f)) => (w, f),
        None => (text.as_str(), ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid(value, "no digits"));
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid(value, "not a decimal number"));
    }
    if fraction.len() > decimals as usize {
        return Err(invalid(
            value,
            format!("more than {} decimal places", decimals),
        ));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or_else(|| invalid(value, "too many decimals"))?;

    let whole_units: Amount = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<Amount>()
            .map_err(|e| invalid(value, e.to_string()))?
    };

    let fraction_units: Amount = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = decimals as usize);
        padded
            .parse::<Amount>()
            .map_err(|e| invalid(value, e.to_string()))?
    };

    whole_units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(|| invalid(value, "overflow"))
}

/// Render base units as a decimal string, trimming trailing zeros
pub fn format_units(amount: Amount, decimals: u32) -> String {
    let scale = 10u128.pow(decimals);
    let whole = amount / scale;
    let fraction = amount % scale;

    if fraction == 0 {
        return whole.to_string();
    }

    let digits = format!("{:0>width$}", fraction, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_whole_and_fraction() {
        assert_eq!(parse_units("20", 18).unwrap(), 20 * 10u128.pow(18));
        assert_eq!(parse_units("0.0000033", 18).unwrap(), 3_300_000_000_000);
        assert_eq!(parse_units(".5", 2).unwrap(), 50);
        assert_eq!(parse_units("1_000", 0).unwrap(), 1000);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_units("", 18).is_err());
        assert!(parse_units("-1", 18).is_err());
        assert!(parse_units("1.2.3", 18).is_err());
        assert!(parse_units("0.001", 2).is_err());
        assert!(parse_units("abc", 18).is_err());
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_units(2 * 10u128.pow(18), 18), "2");
        assert_eq!(format_units(4_160_000_000_000_000, 18), "0.00416");
        assert_eq!(format_units(0, 18), "0");
    }
}
