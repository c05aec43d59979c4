//! Validated, typed field values.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;

/// A field value after validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum TypedValue {
    /// Blank optional value.
    Null,
    Text(String),
    Email(String),
    Date(NaiveDate),
    /// Signed digits exactly as entered, of any length.
    Integer(String),
    Currency(BigDecimal),
    /// Arbitrary-precision number coerced for a numeric column.
    Decimal(BigDecimal),
    Boolean(bool),
    /// Selected radio option value.
    Choice(String),
}

impl TypedValue {
    /// Canonical text inserted into templates.
    pub fn render(&self) -> String {
        match self {
            TypedValue::Null => String::new(),
            TypedValue::Text(s)
            | TypedValue::Email(s)
            | TypedValue::Choice(s)
            | TypedValue::Integer(s) => s.clone(),
            TypedValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            TypedValue::Currency(n) | TypedValue::Decimal(n) => n.to_string(),
            TypedValue::Boolean(b) => b.to_string(),
        }
    }

    /// The integer as `i64`, when it is one and fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(digits) => digits.parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TypedValue::Null => "null",
            TypedValue::Text(_) => "text",
            TypedValue::Email(_) => "email",
            TypedValue::Date(_) => "date",
            TypedValue::Integer(_) => "integer",
            TypedValue::Currency(_) => "currency",
            TypedValue::Decimal(_) => "decimal",
            TypedValue::Boolean(_) => "boolean",
            TypedValue::Choice(_) => "choice",
        }
    }
}

impl std::fmt::Display for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_render() {
        assert_eq!(TypedValue::Null.render(), "");
        assert_eq!(TypedValue::Integer("-7".to_string()).render(), "-7");
        assert_eq!(TypedValue::Integer("007".to_string()).render(), "007");
        assert_eq!(TypedValue::Boolean(false).render(), "false");
        assert_eq!(
            TypedValue::Currency(BigDecimal::from_str("10.50").unwrap()).render(),
            "10.50"
        );
        assert_eq!(
            TypedValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).render(),
            "2024-02-29"
        );
    }

    #[test]
    fn test_as_i64() {
        assert_eq!(TypedValue::Integer("-12".to_string()).as_i64(), Some(-12));
        assert_eq!(TypedValue::Integer("007".to_string()).as_i64(), Some(7));
        assert_eq!(
            TypedValue::Integer("12345678901234567890".to_string()).as_i64(),
            None
        );
        assert_eq!(TypedValue::Text("1".to_string()).as_i64(), None);
    }

    #[test]
    fn test_serialize_tagged() {
        let v = serde_json::to_value(TypedValue::Integer("42".to_string())).unwrap();
        assert_eq!(v, serde_json::json!({ "type": "integer", "value": "42" }));
        let v = serde_json::to_value(TypedValue::Null).unwrap();
        assert_eq!(v, serde_json::json!({ "type": "null" }));
    }
}
