//! # ASL Types
//!
//! Validated value types and contract coercion primitives for the ASL
//! simulator.
//!
//! The pt_data contract arrives as loosely-typed JSON: booleans may be
//! spelled `"yes"`, identifiers may carry separator characters, dates are
//! `DD/MM/YYYY` strings. The functions here convert a raw
//! [`serde_json::Value`] into a strongly typed result or a typed
//! [`CoerceError`], without touching any persistence handle, so they can be
//! tested in isolation. Field and object context is attached by the caller.

use serde_json::Value;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// Wraps a `String` and ensures it contains at least one non-whitespace
/// character. The input is trimmed during construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the
    /// trimmed result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// CONTRACT COERCIONS
// ============================================================================

/// Date format used throughout the pt_data contract.
pub const CONTRACT_DATE_FMT: &str = "%d/%m/%Y";

/// A coercion failure, without field context.
///
/// The ingestion layer wraps these with the offending field name and the
/// containing object.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoerceError {
    #[error("cannot convert {0} to bool")]
    NotBoolean(String),
    #[error("must be numeric")]
    NotNumeric,
    #[error("must be {expected} digits")]
    DigitCount { expected: usize },
    #[error("number is too large")]
    OutOfRange,
    #[error("must be DD/MM/YYYY")]
    NotADate,
    #[error("invalid drug code {0}")]
    DrugCode(String),
    #[error("expected a string, got {0}")]
    NotAString(String),
}

/// Returns the string form of a JSON value.
///
/// Strings yield their content unquoted; every other value uses its JSON
/// rendering, mirroring how the contract treats scalars interchangeably.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Coerces a boolean-like contract value.
///
/// Accepts boolean literals, the strings `true/1/yes/y` and `false/0/no/n`
/// (case-insensitive, trimmed), and numbers via truthiness. Anything else is
/// a [`CoerceError::NotBoolean`].
pub fn coerce_bool(value: &Value) -> Result<bool, CoerceError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "y" => Ok(true),
            "false" | "0" | "no" | "n" => Ok(false),
            _ => Err(CoerceError::NotBoolean(value.to_string())),
        },
        Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        _ => Err(CoerceError::NotBoolean(value.to_string())),
    }
}

/// Coerces a digit-bearing contract value to an integer.
///
/// All non-digit characters are stripped from the value's string form, so
/// `"4950-28640-11"` and `49502864011` coerce identically. Fails if nothing
/// remains after stripping.
pub fn digits_only(value: &Value) -> Result<i64, CoerceError> {
    let digits: String = string_form(value)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(CoerceError::NotNumeric);
    }
    digits.parse::<i64>().map_err(|_| CoerceError::OutOfRange)
}

/// Like [`digits_only`], but requires an exact digit count after stripping.
///
/// Used for fixed-width identifiers: Medicare numbers carry 11 digits, HPI-I
/// and HPI-O identifiers carry 16.
pub fn digits_exact(value: &Value, expected: usize) -> Result<i64, CoerceError> {
    let digits: String = string_form(value)
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Err(CoerceError::NotNumeric);
    }
    if digits.len() != expected {
        return Err(CoerceError::DigitCount { expected });
    }
    digits.parse::<i64>().map_err(|_| CoerceError::OutOfRange)
}

/// Validates a `DD/MM/YYYY` contract date.
///
/// The original string is returned unreformatted; the contract stores dates
/// as presented.
pub fn coerce_date_dmy(value: &Value) -> Result<String, CoerceError> {
    let s = string_form(value);
    chrono::NaiveDate::parse_from_str(&s, CONTRACT_DATE_FMT).map_err(|_| CoerceError::NotADate)?;
    Ok(s)
}

/// Validates a drug code: 4 to 6 alphanumeric characters, case-insensitive.
pub fn coerce_drug_code(value: &Value) -> Result<String, CoerceError> {
    let s = string_form(value);
    let ok = (4..=6).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric());
    if !ok {
        return Err(CoerceError::DrugCode(s));
    }
    Ok(s)
}

/// Extracts a required string value.
///
/// Numbers are accepted and rendered, matching the contract's loose typing;
/// objects, arrays, and null are rejected.
pub fn coerce_string(value: &Value) -> Result<String, CoerceError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(CoerceError::NotAString(other.to_string())),
    }
}

/// Extracts an optional string value, treating JSON null as absent.
pub fn coerce_optional_string(value: Option<&Value>) -> Result<Option<String>, CoerceError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => coerce_string(v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_empty_text_trims_and_rejects_empty() {
        let t = NonEmptyText::new("  Community Pharmacy  ").expect("should accept text");
        assert_eq!(t.as_str(), "Community Pharmacy");

        let err = NonEmptyText::new("   ").expect_err("whitespace-only should fail");
        assert!(matches!(err, TextError::Empty));
    }

    #[test]
    fn coerce_bool_accepts_literals_strings_and_numbers() {
        assert!(coerce_bool(&json!(true)).unwrap());
        assert!(!coerce_bool(&json!(false)).unwrap());

        for truthy in ["true", "1", "yes", "y", "YES", " Y "] {
            assert!(coerce_bool(&json!(truthy)).unwrap(), "{truthy} should be true");
        }
        for falsy in ["false", "0", "no", "n", "No", " N "] {
            assert!(!coerce_bool(&json!(falsy)).unwrap(), "{falsy} should be false");
        }

        assert!(coerce_bool(&json!(1)).unwrap());
        assert!(coerce_bool(&json!(2.5)).unwrap());
        assert!(!coerce_bool(&json!(0)).unwrap());
    }

    #[test]
    fn coerce_bool_rejects_everything_else() {
        assert!(coerce_bool(&json!("maybe")).is_err());
        assert!(coerce_bool(&json!(null)).is_err());
        assert!(coerce_bool(&json!([true])).is_err());
    }

    #[test]
    fn digits_only_strips_separators() {
        assert_eq!(digits_only(&json!("4950-28640-11")).unwrap(), 49502864011);
        assert_eq!(digits_only(&json!(401234567)).unwrap(), 401234567);
        // Leading zeros do not survive the integer conversion
        assert_eq!(digits_only(&json!("03 9284 3300")).unwrap(), 392843300);
    }

    #[test]
    fn digits_only_rejects_digitless_input() {
        let err = digits_only(&json!("no digits here")).expect_err("should fail");
        assert_eq!(err, CoerceError::NotNumeric);
    }

    #[test]
    fn digits_exact_enforces_width() {
        assert_eq!(digits_exact(&json!("4950-28640-11"), 11).unwrap(), 49502864011);

        // 10 digits after stripping
        let err = digits_exact(&json!("495-028-640-1"), 11).expect_err("should fail");
        assert_eq!(err, CoerceError::DigitCount { expected: 11 });

        assert_eq!(
            digits_exact(&json!("8003 6199 0002 6805"), 16).unwrap(),
            8003619900026805
        );
    }

    #[test]
    fn coerce_date_keeps_original_string() {
        assert_eq!(coerce_date_dmy(&json!("26/01/1998")).unwrap(), "26/01/1998");
        assert!(coerce_date_dmy(&json!("1998-01-26")).is_err());
        assert!(coerce_date_dmy(&json!("31/02/2020")).is_err());
        assert!(coerce_date_dmy(&json!("not a date")).is_err());
    }

    #[test]
    fn drug_code_is_four_to_six_alphanumerics() {
        assert!(coerce_drug_code(&json!("AB1")).is_err());
        assert_eq!(coerce_drug_code(&json!("AB12")).unwrap(), "AB12");
        assert_eq!(coerce_drug_code(&json!("ABCDEF")).unwrap(), "ABCDEF");
        assert_eq!(coerce_drug_code(&json!("ab12cd")).unwrap(), "ab12cd");
        assert!(coerce_drug_code(&json!("AB12!")).is_err());
        assert!(coerce_drug_code(&json!("ABCDEFG")).is_err());
    }

    #[test]
    fn coerce_string_accepts_numbers_rejects_structures() {
        assert_eq!(coerce_string(&json!("text")).unwrap(), "text");
        assert_eq!(coerce_string(&json!(42)).unwrap(), "42");
        assert!(coerce_string(&json!({})).is_err());
        assert!(coerce_string(&json!(null)).is_err());
    }

    #[test]
    fn optional_string_treats_null_as_absent() {
        assert_eq!(coerce_optional_string(None).unwrap(), None);
        assert_eq!(coerce_optional_string(Some(&json!(null))).unwrap(), None);
        assert_eq!(
            coerce_optional_string(Some(&json!("DSP-1"))).unwrap(),
            Some("DSP-1".to_string())
        );
    }
}
