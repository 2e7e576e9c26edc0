//! Built-in value parsers.
//!
//! Each parser takes a raw string that some source provided and returns the
//! typed value or a [`CastError::Invalid`] naming the offending value. Wrap them
//! with [`optional`](crate::optional), [`required`](crate::required) or
//! [`production`](crate::production) to form a declaration.

use crate::error::CastError;
use std::fmt::Display;
use std::str::FromStr;
use url::Url;

/// Any string is valid.
pub fn string(value: &str) -> Result<String, CastError> {
    Ok(value.to_string())
}

/// Exactly `"true"` or `"false"`.
pub fn boolean(value: &str) -> Result<bool, CastError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(CastError::invalid(format!(
            "Non-boolean value found: {}",
            value
        ))),
    }
}

/// A finite floating point number.
///
/// Surrounding whitespace is ignored and a blank value reads as `0`. Decimal
/// and exponent forms are accepted, as are unsigned `0x`, `0o` and `0b`
/// integer literals. `NaN` and infinities are rejected.
pub fn number(value: &str) -> Result<f64, CastError> {
    let trimmed = value.trim();
    let parsed = if trimmed.is_empty() {
        Some(0.0)
    } else {
        radix_literal(trimmed).or_else(|| trimmed.parse::<f64>().ok())
    };

    match parsed {
        Some(n) if n.is_finite() => Ok(n),
        _ => Err(CastError::invalid(format!(
            "Non-number value found: {}",
            value
        ))),
    }
}

/// `0x1f`, `0o17` or `0b101`. `None` when `value` has no radix prefix or a
/// digit is out of range.
fn radix_literal(value: &str) -> Option<f64> {
    let radix = match value.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &value[2..];
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix)
            .map(|d| acc * f64::from(radix) + f64::from(d))
    })
}

/// An absolute URL.
pub fn url(value: &str) -> Result<Url, CastError> {
    Url::parse(value)
        .map_err(|_| CastError::invalid(format!("Value is not a valid URL: {}", value)))
}

/// An absolute URL, returned in its normalized string form.
pub fn url_string(value: &str) -> Result<String, CastError> {
    url(value).map(|u| u.to_string())
}

/// Any type implementing [`FromStr`], e.g. `u16` or `SocketAddr`.
pub fn parsed<T>(value: &str) -> Result<T, CastError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse::<T>()
        .map_err(|e| CastError::invalid(format!("Failed to parse value '{}': {}", value, e)))
}

/// One of a fixed set of strings.
pub fn one_of(
    allowed: &'static [&'static str],
) -> impl Fn(&str) -> Result<String, CastError> + Send + Sync + Clone + 'static {
    move |value: &str| {
        if allowed.contains(&value) {
            Ok(value.to_string())
        } else {
            Err(CastError::invalid(format!(
                "Value '{}' is not one of [{}]",
                value,
                allowed.join(", ")
            )))
        }
    }
}
