//! Engine limits.

use serde::{Deserialize, Serialize};

use crate::wire::RunInputLimits;

/// Bounds applied while compiling and running Apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LimitsConfig {
    /// Maximum number of caller-supplied pairs in a dynamic body.
    #[serde(default = "default_max_dynamic_body_pairs")]
    pub max_dynamic_body_pairs: usize,

    /// Maximum length of a run input title.
    #[serde(default = "default_max_run_input_title_len")]
    pub max_run_input_title_len: usize,

    /// Maximum length of a run input value.
    #[serde(default = "default_max_run_input_value_len")]
    pub max_run_input_value_len: usize,

    /// How long a pending action confirmation stays valid.
    #[serde(default = "default_confirmation_ttl_secs")]
    pub confirmation_ttl_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_dynamic_body_pairs: default_max_dynamic_body_pairs(),
            max_run_input_title_len: default_max_run_input_title_len(),
            max_run_input_value_len: default_max_run_input_value_len(),
            confirmation_ttl_secs: default_confirmation_ttl_secs(),
        }
    }
}

impl LimitsConfig {
    pub fn run_input_limits(&self) -> RunInputLimits {
        RunInputLimits {
            max_title_len: self.max_run_input_title_len,
            max_value_len: self.max_run_input_value_len,
        }
    }
}

fn default_max_dynamic_body_pairs() -> usize {
    10
}

fn default_max_run_input_title_len() -> usize {
    255
}

fn default_max_run_input_value_len() -> usize {
    1000
}

fn default_confirmation_ttl_secs() -> u64 {
    600
}
