//! Lenient field extraction for provider payloads
//!
//! Providers send numbers as JSON numbers, as strings, or as `null`. A value
//! that cannot be read becomes the absent sentinel and the record survives.

use serde_json::Value;
use tracing::debug;

use crate::adapters::errors::MalformedRecordError;

/// Strict parse: `Ok(None)` when absent, `Err` when present but unreadable
pub fn parse_f64(field: &str, value: Option<&Value>) -> Result<Option<f64>, MalformedRecordError> {
    let malformed = |raw: &Value| MalformedRecordError {
        field: field.to_string(),
        raw: raw.to_string(),
    };

    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v @ Value::Number(n)) => match n.as_f64() {
            Some(x) if x.is_finite() => Ok(Some(x)),
            _ => Err(malformed(v)),
        },
        Some(v @ Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(Some(x)),
                _ => Err(malformed(v)),
            }
        }
        Some(other) => Err(malformed(other)),
    }
}

/// Parse a number, logging and dropping malformed values
pub fn lenient_f64(field: &str, value: Option<&Value>) -> Option<f64> {
    match parse_f64(field, value) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Coercing malformed field to absent");
            None
        }
    }
}

/// Parse a non-negative amount where unknown reads as zero
pub fn amount(field: &str, value: Option<&Value>) -> f64 {
    lenient_f64(field, value).map(|v| v.max(0.0)).unwrap_or(0.0)
}

/// Parse a non-negative count
pub fn count(field: &str, value: Option<&Value>) -> Option<u64> {
    lenient_f64(field, value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.floor() as u64)
}

/// Read a string field, treating empty strings as absent
pub fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_and_string() {
        assert_eq!(parse_f64("x", Some(&json!(12.5))).unwrap(), Some(12.5));
        assert_eq!(parse_f64("x", Some(&json!("0.00042"))).unwrap(), Some(0.00042));
        assert_eq!(parse_f64("x", Some(&json!(" 7 "))).unwrap(), Some(7.0));
    }

    #[test]
    fn test_parse_absent_values() {
        assert_eq!(parse_f64("x", None).unwrap(), None);
        assert_eq!(parse_f64("x", Some(&Value::Null)).unwrap(), None);
        assert_eq!(parse_f64("x", Some(&json!(""))).unwrap(), None);
    }

    #[test]
    fn test_parse_malformed_values() {
        let err = parse_f64("liquidity", Some(&json!("n/a"))).unwrap_err();
        assert_eq!(err.field, "liquidity");
        assert!(parse_f64("x", Some(&json!({"usd": 1}))).is_err());
        assert!(parse_f64("x", Some(&json!(true))).is_err());
    }

    #[test]
    fn test_lenient_helpers_coerce() {
        assert_eq!(lenient_f64("x", Some(&json!("bad"))), None);
        assert_eq!(amount("x", Some(&json!("bad"))), 0.0);
        assert_eq!(amount("x", Some(&json!(-5))), 0.0);
        assert_eq!(count("x", Some(&json!(1204.0))), Some(1204));
        assert_eq!(count("x", Some(&json!(-3))), None);
    }

    #[test]
    fn test_text_field() {
        assert_eq!(text(Some(&json!("BONK"))), Some("BONK".to_string()));
        assert_eq!(text(Some(&json!("  "))), None);
        assert_eq!(text(Some(&json!(5))), None);
        assert_eq!(text(None), None);
    }
}
