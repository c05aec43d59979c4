//! Validation error types.
//!
//! Field errors are user-fixable and always aggregated across a whole field
//! list before they are reported.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Error type for a single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The kind of validation error.
    pub kind: ValidationErrorKind,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn required() -> Self {
        Self::new(ValidationErrorKind::Required, "required")
    }

    pub fn invalid_email() -> Self {
        Self::new(ValidationErrorKind::InvalidEmail, "invalid email")
    }

    pub fn invalid_integer() -> Self {
        Self::new(ValidationErrorKind::InvalidInteger, "invalid integer")
    }

    pub fn invalid_currency() -> Self {
        Self::new(ValidationErrorKind::InvalidCurrency, "invalid currency")
    }

    pub fn invalid_option() -> Self {
        Self::new(ValidationErrorKind::InvalidOption, "invalid option")
    }

    pub fn invalid_date() -> Self {
        Self::new(ValidationErrorKind::InvalidDate, "invalid date")
    }

    pub fn too_long(max: usize) -> Self {
        Self::new(
            ValidationErrorKind::TooLong,
            format!("too long (max {} characters)", max),
        )
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.message)
    }
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// A required field was blank.
    Required,
    InvalidEmail,
    InvalidInteger,
    /// Not a non-negative amount with at most two decimals.
    InvalidCurrency,
    /// Value is not one of the radio options.
    InvalidOption,
    /// Not an ISO `YYYY-MM-DD` calendar date.
    InvalidDate,
    /// Text exceeds its maximum length.
    TooLong,
}

/// Per-field errors of one field list, keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors {
    errors: BTreeMap<String, ValidationError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field_id: impl Into<String>, error: ValidationError) {
        self.errors.insert(field_id.into(), error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field_id: &str) -> Option<&ValidationError> {
        self.errors.get(field_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ValidationError)> {
        self.errors.iter()
    }

    /// `fieldId -> message` map for callers.
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|(id, e)| (id.clone(), e.message.clone()))
            .collect()
    }

    /// Merge another set of errors into this one.
    pub fn extend(&mut self, other: FieldErrors) {
        self.errors.extend(other.errors);
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(id, e)| format!("{}: {}", id, e))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FieldErrors {}
