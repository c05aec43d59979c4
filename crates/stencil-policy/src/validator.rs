//! Field type validation.
//!
//! `validate` turns one raw string into a [`TypedValue`] according to the
//! field's type. Rules run in a fixed order and the first failure wins:
//!
//! 1. **Required** - non-boolean required fields must not be blank
//! 2. **Format** - email, integer, currency and date patterns
//! 3. **Coercion** - booleans accept anything (`"true"` is true)
//! 4. **Options** - radio values must match an option
//! 5. **Length** - text respects its maximum length
//!
//! Field lists are validated as a whole: every field is checked and the
//! failures are collected into [`FieldErrors`] keyed by field id.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use stencil_core::{FieldType, InputField};

use crate::error::{FieldErrors, ValidationError};
use crate::value::TypedValue;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("valid email pattern")
});

static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("valid integer pattern"));

static CURRENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0|[1-9]\d*)(\.\d{1,2})?$").expect("valid currency pattern")
});

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date pattern"));

/// Validate one raw value against a field definition.
///
/// Total and deterministic: every input yields either a value or an error.
pub fn validate(field: &InputField, raw: &str) -> Result<TypedValue, ValidationError> {
    let blank = raw.trim().is_empty();

    if let FieldType::Boolean = field.field_type {
        return Ok(TypedValue::Boolean(raw == "true"));
    }

    if blank {
        if field.required {
            return Err(ValidationError::required());
        }
        return Ok(TypedValue::Null);
    }

    match &field.field_type {
        FieldType::Email => {
            if EMAIL.is_match(raw) {
                Ok(TypedValue::Email(raw.to_string()))
            } else {
                Err(ValidationError::invalid_email())
            }
        }
        FieldType::Integer => {
            if INTEGER.is_match(raw) {
                Ok(TypedValue::Integer(raw.to_string()))
            } else {
                Err(ValidationError::invalid_integer())
            }
        }
        FieldType::Currency => {
            if !CURRENCY.is_match(raw) {
                return Err(ValidationError::invalid_currency());
            }
            BigDecimal::from_str(raw)
                .map(TypedValue::Currency)
                .map_err(|_| ValidationError::invalid_currency())
        }
        FieldType::Radio { options } => {
            if options.iter().any(|o| o.value == raw) {
                Ok(TypedValue::Choice(raw.to_string()))
            } else {
                Err(ValidationError::invalid_option())
            }
        }
        FieldType::Date => {
            if !ISO_DATE.is_match(raw) {
                return Err(ValidationError::invalid_date());
            }
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(TypedValue::Date)
                .map_err(|_| ValidationError::invalid_date())
        }
        FieldType::Text { max_length } => match max_length {
            Some(max) if raw.chars().count() > *max => Err(ValidationError::too_long(*max)),
            _ => Ok(TypedValue::Text(raw.to_string())),
        },
        FieldType::Boolean => Ok(TypedValue::Boolean(raw == "true")),
    }
}

/// A validated field with its identity.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedField {
    pub id: String,
    pub label: String,
    pub value: TypedValue,
}

/// Result of validating a whole field list, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidatedFields {
    fields: Vec<ValidatedField>,
}

impl ValidatedFields {
    pub fn get_by_label(&self, label: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| &f.value)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&TypedValue> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidatedField> {
        self.fields.iter()
    }

    /// Rendered values keyed by label, ready for placeholder substitution.
    pub fn rendered_by_label(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|f| (f.label.clone(), f.value.render()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Validates field lists, collecting every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldValidator;

impl FieldValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a field list against values keyed by field label.
    ///
    /// A field with no supplied value falls back to its default.
    pub fn validate_by_label(
        &self,
        fields: &[InputField],
        values: &BTreeMap<String, String>,
    ) -> Result<ValidatedFields, FieldErrors> {
        self.validate_with(fields, |field| values.get(&field.label).map(String::as_str))
    }

    /// Validate a field list against values keyed by field id.
    pub fn validate_by_id(
        &self,
        fields: &[InputField],
        values: &BTreeMap<String, String>,
    ) -> Result<ValidatedFields, FieldErrors> {
        self.validate_with(fields, |field| values.get(&field.id).map(String::as_str))
    }

    fn validate_with<'v>(
        &self,
        fields: &[InputField],
        lookup: impl Fn(&InputField) -> Option<&'v str>,
    ) -> Result<ValidatedFields, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut validated = Vec::with_capacity(fields.len());

        for field in fields {
            let raw = lookup(field)
                .map(str::to_string)
                .unwrap_or_else(|| field.initial_value());

            match validate(field, &raw) {
                Ok(value) => validated.push(ValidatedField {
                    id: field.id.clone(),
                    label: field.label.clone(),
                    value,
                }),
                Err(e) => {
                    tracing::debug!(field = %field.id, error = %e, "Field validation failed");
                    errors.insert(field.id.clone(), e);
                }
            }
        }

        if errors.is_empty() {
            Ok(ValidatedFields { fields: validated })
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationErrorKind;
    use stencil_core::RadioOption;

    fn field(field_type: FieldType) -> InputField {
        InputField::new("f", "f", field_type)
    }

    fn kind(result: Result<TypedValue, ValidationError>) -> ValidationErrorKind {
        result.unwrap_err().kind
    }

    #[test]
    fn test_required_blank_fails_first() {
        let f = field(FieldType::Integer).required();
        assert_eq!(validate(&f, "").unwrap_err().message, "required");
        assert_eq!(kind(validate(&f, "   ")), ValidationErrorKind::Required);
    }

    #[test]
    fn test_optional_blank_is_null() {
        for t in [FieldType::Email, FieldType::Integer, FieldType::Currency, FieldType::Date] {
            assert_eq!(validate(&field(t), "").unwrap(), TypedValue::Null);
        }
    }

    #[test]
    fn test_boolean_is_always_satisfied() {
        let f = field(FieldType::Boolean).required();
        assert_eq!(validate(&f, "").unwrap(), TypedValue::Boolean(false));
        assert_eq!(validate(&f, "true").unwrap(), TypedValue::Boolean(true));
        assert_eq!(validate(&f, "TRUE").unwrap(), TypedValue::Boolean(false));
        assert_eq!(validate(&f, "yes").unwrap(), TypedValue::Boolean(false));
    }

    #[test]
    fn test_email() {
        let f = field(FieldType::Email);
        assert!(validate(&f, "a@b.com").is_ok());
        assert_eq!(kind(validate(&f, "a@b")), ValidationErrorKind::InvalidEmail);
        assert_eq!(kind(validate(&f, "a b@c.com")), ValidationErrorKind::InvalidEmail);
        assert_eq!(kind(validate(&f, "@c.com")), ValidationErrorKind::InvalidEmail);
        assert!(validate(&f, "first.last@mail.example.co.uk").is_ok());
        for bad in ["a@b..com", "a@b.com.", "a@.b.com", "a@b.", "a@b@c.com"] {
            assert_eq!(
                kind(validate(&f, bad)),
                ValidationErrorKind::InvalidEmail,
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_integer() {
        let f = field(FieldType::Integer);
        assert_eq!(validate(&f, "42").unwrap(), TypedValue::Integer("42".to_string()));
        assert_eq!(validate(&f, "-3").unwrap(), TypedValue::Integer("-3".to_string()));
        assert_eq!(kind(validate(&f, "4.2")), ValidationErrorKind::InvalidInteger);
        assert_eq!(kind(validate(&f, " 42")), ValidationErrorKind::InvalidInteger);
        assert_eq!(kind(validate(&f, "1e3")), ValidationErrorKind::InvalidInteger);
    }

    #[test]
    fn test_integer_keeps_entered_digits() {
        let f = field(FieldType::Integer);
        let big = validate(&f, "99999999999999999999").unwrap();
        assert_eq!(big.render(), "99999999999999999999");
        assert_eq!(big.as_i64(), None);
        assert_eq!(
            validate(&f, "12345678901234567890").unwrap().render(),
            "12345678901234567890"
        );
        assert_eq!(validate(&f, "007").unwrap().render(), "007");
        assert_eq!(validate(&f, "-0").unwrap().render(), "-0");
    }

    #[test]
    fn test_currency() {
        let f = field(FieldType::Currency);
        assert!(validate(&f, "0").is_ok());
        assert!(validate(&f, "10.5").is_ok());
        assert!(validate(&f, "1999.99").is_ok());
        for bad in ["-1", "01", "1.999", "1.", "abc"] {
            assert_eq!(
                kind(validate(&f, bad)),
                ValidationErrorKind::InvalidCurrency,
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_radio() {
        let f = field(FieldType::Radio {
            options: vec![RadioOption::new("basic"), RadioOption::new("pro")],
        });
        assert_eq!(
            validate(&f, "pro").unwrap(),
            TypedValue::Choice("pro".to_string())
        );
        assert_eq!(kind(validate(&f, "Pro")), ValidationErrorKind::InvalidOption);
    }

    #[test]
    fn test_date_and_text() {
        let d = field(FieldType::Date);
        assert!(validate(&d, "2024-02-29").is_ok());
        assert_eq!(kind(validate(&d, "2023-02-29")), ValidationErrorKind::InvalidDate);
        assert_eq!(kind(validate(&d, "02/03/2024")), ValidationErrorKind::InvalidDate);

        let t = field(FieldType::Text {
            max_length: Some(3),
        });
        assert!(validate(&t, "abc").is_ok());
        assert_eq!(kind(validate(&t, "abcd")), ValidationErrorKind::TooLong);
    }

    #[test]
    fn test_field_list_errors_are_aggregated() {
        let fields = vec![
            InputField::new("f1", "userId", FieldType::Integer).required(),
            InputField::new("f2", "email", FieldType::Email),
            InputField::new("f3", "note", FieldType::text()),
        ];
        let values = BTreeMap::from([
            ("email".to_string(), "nope".to_string()),
            ("note".to_string(), "ok".to_string()),
        ]);

        let errors = FieldValidator::new()
            .validate_by_label(&fields, &values)
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get("f1").unwrap().message, "required");
        assert_eq!(errors.get("f2").unwrap().message, "invalid email");
        assert_eq!(
            errors.messages().get("f2").map(String::as_str),
            Some("invalid email")
        );
    }

    #[test]
    fn test_defaults_fill_missing_values() {
        let fields = vec![InputField::new("f1", "plan", FieldType::text()).with_default("basic")];
        let validated = FieldValidator::new()
            .validate_by_id(&fields, &BTreeMap::new())
            .unwrap();
        assert_eq!(
            validated.get_by_id("f1"),
            Some(&TypedValue::Text("basic".to_string()))
        );
        assert_eq!(
            validated.rendered_by_label().get("plan").map(String::as_str),
            Some("basic")
        );
    }
}
