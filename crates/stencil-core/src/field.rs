//! Input field definitions.
//!
//! Apps and dashboards declare named, typed input fields. The engine only
//! reads these definitions; authoring them happens elsewhere.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::check::{CheckFinding, Severity};

/// A named, typed input declared by an App or a Dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputField {
    /// Opaque identifier, referenced by dashboard bindings.
    pub id: String,

    /// Display name. Unique within its field list and used as the
    /// placeholder name in templates.
    pub label: String,

    /// Kind of value accepted by the field.
    #[serde(flatten)]
    pub field_type: FieldType,

    /// Whether a non-blank value must be supplied.
    #[serde(default)]
    pub required: bool,

    /// Value used when the caller supplies nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl InputField {
    /// Create an optional field.
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            field_type,
            required: false,
            default_value: None,
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The raw value to seed a form with: the default, or empty.
    pub fn initial_value(&self) -> String {
        self.default_value.clone().unwrap_or_default()
    }
}

/// Closed set of input kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text {
        #[serde(default, rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<usize>,
    },
    Email,
    Date,
    Integer,
    Currency,
    Boolean,
    Radio {
        #[serde(default)]
        options: Vec<RadioOption>,
    },
}

impl FieldType {
    /// Unbounded text.
    pub fn text() -> Self {
        FieldType::Text { max_length: None }
    }

    /// Short name used in messages and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Text { .. } => "text",
            FieldType::Email => "email",
            FieldType::Date => "date",
            FieldType::Integer => "integer",
            FieldType::Currency => "currency",
            FieldType::Boolean => "boolean",
            FieldType::Radio { .. } => "radio",
        }
    }
}

/// One choice of a radio field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioOption {
    /// Stored and substituted value.
    pub value: String,
    /// Cosmetic label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl RadioOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }
}

/// Find a field by id.
pub fn find_by_id<'a>(fields: &'a [InputField], id: &str) -> Option<&'a InputField> {
    fields.iter().find(|f| f.id == id)
}

/// Check a field list for authoring mistakes: blank or duplicate labels,
/// duplicate ids and radio fields with fewer than two options.
pub fn check_fields(location: &str, fields: &[InputField]) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    let mut labels = HashSet::new();
    let mut ids = HashSet::new();

    for field in fields {
        let at = format!("{}.{}", location, field.id);

        if field.label.trim().is_empty() {
            findings.push(CheckFinding::new(
                Severity::Error,
                "fields",
                format!("Field '{}' has an empty label", field.id),
                at.clone(),
            ));
        } else if !labels.insert(field.label.as_str()) {
            findings.push(CheckFinding::new(
                Severity::Error,
                "fields",
                format!("Duplicate field label '{}'", field.label),
                at.clone(),
            ));
        }

        if !ids.insert(field.id.as_str()) {
            findings.push(CheckFinding::new(
                Severity::Error,
                "fields",
                format!("Duplicate field id '{}'", field.id),
                at.clone(),
            ));
        }

        if let FieldType::Radio { options } = &field.field_type
            && options.len() < 2
        {
            findings.push(CheckFinding::new(
                Severity::Error,
                "fields",
                format!(
                    "Radio field '{}' needs at least two options (has {})",
                    field.label,
                    options.len()
                ),
                at,
            ));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_yaml_shapes() {
        let yaml = r#"
- id: f1
  label: userId
  type: integer
  required: true
- id: f2
  label: plan
  type: radio
  options:
    - value: basic
    - value: pro
      label: Pro
- id: f3
  label: note
  type: text
  maxLength: 20
  defaultValue: hi
"#;
        let fields: Vec<InputField> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(fields[0].field_type, FieldType::Integer);
        assert!(fields[0].required);
        assert!(matches!(&fields[1].field_type, FieldType::Radio { options } if options.len() == 2));
        assert_eq!(
            fields[2].field_type,
            FieldType::Text {
                max_length: Some(20)
            }
        );
        assert_eq!(fields[2].initial_value(), "hi");
    }

    #[test]
    fn test_check_fields_reports_duplicates_and_short_radio() {
        let fields = vec![
            InputField::new("a", "name", FieldType::text()),
            InputField::new("b", "name", FieldType::Email),
            InputField::new(
                "c",
                "choice",
                FieldType::Radio {
                    options: vec![RadioOption::new("only")],
                },
            ),
        ];

        let findings = check_fields("loadInputs", &fields);
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("Duplicate field label"));
        assert!(findings[1].message.contains("at least two options"));
    }
}
