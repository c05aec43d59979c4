//! Wire shapes exchanged with callers and executors.
//!
//! Field names are part of the external contract and serialize in camelCase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::app::KeyValue;

/// Status literal that marks a successful run.
pub const STATUS_SUCCESS: &str = "success";

/// Status reported for failed runs.
pub const STATUS_ERROR: &str = "error";

/// Whether an executor status counts as success.
///
/// Compared case-insensitively with `"success"`; anything else, including an
/// absent status, is a failure.
pub fn is_success_status(status: Option<&str>) -> bool {
    status.is_some_and(|s| s.eq_ignore_ascii_case(STATUS_SUCCESS))
}

/// Wire form of a field value: `title` is the field label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInput {
    pub title: String,
    pub value: String,
}

impl RunInput {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
        }
    }

    /// Check length limits on title and value.
    pub fn validate(&self, limits: &RunInputLimits) -> Result<(), RunInputError> {
        let title_len = self.title.chars().count();
        if title_len == 0 || title_len > limits.max_title_len {
            return Err(RunInputError::InvalidTitle {
                title: self.title.clone(),
                max: limits.max_title_len,
            });
        }
        if self.value.chars().count() > limits.max_value_len {
            return Err(RunInputError::ValueTooLong {
                title: self.title.clone(),
                max: limits.max_value_len,
            });
        }
        Ok(())
    }

    /// Validate a batch of inputs and index them by title.
    pub fn collect(
        inputs: &[RunInput],
        limits: &RunInputLimits,
    ) -> Result<BTreeMap<String, String>, RunInputError> {
        let mut values = BTreeMap::new();
        for input in inputs {
            input.validate(limits)?;
            if values
                .insert(input.title.clone(), input.value.clone())
                .is_some()
            {
                return Err(RunInputError::DuplicateTitle(input.title.clone()));
            }
        }
        Ok(values)
    }
}

/// Size limits for [`RunInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunInputLimits {
    pub max_title_len: usize,
    pub max_value_len: usize,
}

impl Default for RunInputLimits {
    fn default() -> Self {
        Self {
            max_title_len: 255,
            max_value_len: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunInputError {
    #[error("input title '{title}' must be between 1 and {max} characters")]
    InvalidTitle { title: String, max: usize },

    #[error("value for '{title}' exceeds {max} characters")]
    ValueTooLong { title: String, max: usize },

    #[error("input '{0}' was supplied more than once")]
    DuplicateTitle(String),
}

/// Concrete HTTP request produced by the compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableHttpRequest {
    /// Resource base URL joined with the resolved path.
    pub base_url: String,
    pub url_parameters: Vec<KeyValue>,
    pub headers: Vec<KeyValue>,
    pub body: Vec<KeyValue>,
    pub http_method: String,
}

/// Result of executing a dashboard's prepare App.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPrepareResponse {
    pub prepare_run_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DashboardPrepareResponse {
    pub fn is_success(&self) -> bool {
        is_success_status(Some(&self.status))
    }
}

/// Result of executing a dashboard action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardActionResponse {
    pub action_run_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DashboardActionResponse {
    pub fn is_success(&self) -> bool {
        is_success_status(Some(&self.status))
    }
}

/// Result of running an App directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRunResponse {
    pub run_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// The caller on whose behalf templates are resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl CurrentUser {
    /// Placeholder names and values of the `current_user.*` namespace.
    pub fn placeholders(&self) -> [(&'static str, &str); 3] {
        [
            ("current_user.id", self.id.as_str()),
            ("current_user.name", self.name.as_str()),
            ("current_user.email", self.email.as_str()),
        ]
    }
}
