//! Dashboard configuration.
//!
//! A dashboard is a two-phase workflow: load inputs feed an optional
//! "prepare" App, then actions run bound Apps whose inputs are wired from
//! literals, load inputs, action inputs or the prepare output.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::check::{CheckFinding, Severity};
use crate::field::{InputField, check_fields, find_by_id};

/// Section name used for actions that do not declare one.
pub const DEFAULT_SECTION: &str = "default";

/// A stored dashboard with its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(flatten)]
    pub config: DashboardConfig,
}

/// The persisted dashboard document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    /// App executed on load; its response becomes the prepare output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepare_app_id: Option<String>,

    #[serde(default)]
    pub load_inputs: Vec<InputField>,

    #[serde(default)]
    pub action_inputs: Vec<InputField>,

    #[serde(default)]
    pub actions: Vec<DashboardAction>,

    #[serde(default)]
    pub bindings: Vec<DashboardBinding>,

    /// Derived grouping of action ids by section. Recomputed by
    /// [`DashboardConfig::normalize`]; never trusted from storage.
    #[serde(default)]
    pub layout: DashboardLayout,
}

/// One runnable step of a dashboard.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardAction {
    pub id: String,

    /// Target App.
    pub app_id: String,

    #[serde(default)]
    pub label: String,

    /// Display section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default)]
    pub confirm_enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_message: Option<String>,

    /// Shown instead of the executor's message when the run fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl DashboardAction {
    pub fn section_name(&self) -> &str {
        self.section.as_deref().unwrap_or(DEFAULT_SECTION)
    }
}

/// Maps a dashboard value source to a target App's named input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardBinding {
    pub action_id: String,

    /// Label of the target App's input.
    pub input_name: String,

    #[serde(flatten)]
    pub source: BindingSource,
}

/// Where a binding takes its value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "sourceType",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum BindingSource {
    /// Template text resolved against load and action values.
    Literal {
        #[serde(default)]
        literal_value: String,
    },
    /// Validated value of a load input, by field id.
    LoadInput { source_key: String },
    /// Validated value of an action input, by field id.
    ActionInput { source_key: String },
    /// Path into the captured prepare output.
    PrepareOutput { source_key: String },
}

impl BindingSource {
    pub fn kind(&self) -> &'static str {
        match self {
            BindingSource::Literal { .. } => "literal",
            BindingSource::LoadInput { .. } => "load_input",
            BindingSource::ActionInput { .. } => "action_input",
            BindingSource::PrepareOutput { .. } => "prepare_output",
        }
    }
}

/// Action ids grouped by display section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLayout {
    #[serde(default)]
    pub sections: Vec<LayoutSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSection {
    pub name: String,
    #[serde(default)]
    pub action_ids: Vec<String>,
}

impl DashboardLayout {
    /// Group actions by section in order of first appearance.
    pub fn from_actions(actions: &[DashboardAction]) -> Self {
        let mut sections: Vec<LayoutSection> = Vec::new();
        for action in actions {
            let name = action.section_name();
            match sections.iter_mut().find(|s| s.name == name) {
                Some(section) => section.action_ids.push(action.id.clone()),
                None => sections.push(LayoutSection {
                    name: name.to_string(),
                    action_ids: vec![action.id.clone()],
                }),
            }
        }
        Self { sections }
    }
}

impl DashboardConfig {
    /// Parse a persisted document and recompute its layout.
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(content)?;
        config.normalize();
        Ok(config)
    }

    /// Serialize for storage, keeping the layout consistent with the actions.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut config = self.clone();
        config.normalize();
        serde_json::to_string(&config)
    }

    /// Recompute the derived layout from `actions[].section`.
    pub fn normalize(&mut self) {
        self.layout = DashboardLayout::from_actions(&self.actions);
    }

    pub fn action(&self, id: &str) -> Option<&DashboardAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Bindings that target the given action, in declaration order.
    pub fn bindings_for<'a>(
        &'a self,
        action_id: &'a str,
    ) -> impl Iterator<Item = &'a DashboardBinding> + 'a {
        self.bindings.iter().filter(move |b| b.action_id == action_id)
    }

    /// Check referential integrity of fields, actions and bindings.
    ///
    /// App references are checked by the project-level checker, which knows
    /// the App catalog.
    pub fn check(&self, location: &str) -> Vec<CheckFinding> {
        let mut findings = check_fields(&format!("{}.loadInputs", location), &self.load_inputs);
        findings.extend(check_fields(
            &format!("{}.actionInputs", location),
            &self.action_inputs,
        ));

        let mut action_ids = HashSet::new();
        for action in &self.actions {
            if !action_ids.insert(action.id.as_str()) {
                findings.push(CheckFinding::new(
                    Severity::Error,
                    "actions",
                    format!("Duplicate action id '{}'", action.id),
                    format!("{}.actions.{}", location, action.id),
                ));
            }
        }

        for (idx, binding) in self.bindings.iter().enumerate() {
            let at = format!("{}.bindings[{}]", location, idx);

            if !action_ids.contains(binding.action_id.as_str()) {
                findings.push(CheckFinding::new(
                    Severity::Error,
                    "bindings",
                    format!(
                        "Binding for input '{}' references unknown action '{}'",
                        binding.input_name, binding.action_id
                    ),
                    at.clone(),
                ));
            }

            match &binding.source {
                BindingSource::Literal { .. } => {}
                BindingSource::LoadInput { source_key } => {
                    if find_by_id(&self.load_inputs, source_key).is_none() {
                        findings.push(CheckFinding::new(
                            Severity::Error,
                            "bindings",
                            format!("Binding references unknown load input '{}'", source_key),
                            at.clone(),
                        ));
                    }
                }
                BindingSource::ActionInput { source_key } => {
                    if find_by_id(&self.action_inputs, source_key).is_none() {
                        findings.push(CheckFinding::new(
                            Severity::Error,
                            "bindings",
                            format!("Binding references unknown action input '{}'", source_key),
                            at.clone(),
                        ));
                    }
                }
                BindingSource::PrepareOutput { source_key } => {
                    if self.prepare_app_id.is_none() {
                        findings.push(CheckFinding::new(
                            Severity::Error,
                            "bindings",
                            format!(
                                "Binding reads prepare output '{}' but no prepare app is configured",
                                source_key
                            ),
                            at.clone(),
                        ));
                    }
                    if source_key.trim().is_empty() {
                        findings.push(CheckFinding::new(
                            Severity::Error,
                            "bindings",
                            "Prepare output binding has an empty path",
                            at.clone(),
                        ));
                    }
                }
            }
        }

        for action in &self.actions {
            if self.bindings_for(&action.id).next().is_none() {
                findings.push(CheckFinding::new(
                    Severity::Warning,
                    "bindings",
                    format!("Action '{}' has no input bindings", action.id),
                    format!("{}.actions.{}", location, action.id),
                ));
            }
        }

        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use serde_json::json;

    fn action(id: &str, section: Option<&str>) -> DashboardAction {
        DashboardAction {
            id: id.to_string(),
            app_id: "app".to_string(),
            label: id.to_string(),
            section: section.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_binding_wire_shape() {
        let bindings: Vec<DashboardBinding> = serde_json::from_value(json!([
            { "actionId": "a1", "inputName": "email", "sourceType": "load_input", "sourceKey": "f1" },
            { "actionId": "a1", "inputName": "note", "sourceType": "literal", "literalValue": "hi {name}" },
            { "actionId": "a1", "inputName": "id", "sourceType": "prepare_output", "sourceKey": "data.id" }
        ]))
        .unwrap();

        assert_eq!(
            bindings[0].source,
            BindingSource::LoadInput {
                source_key: "f1".to_string()
            }
        );
        assert_eq!(
            bindings[1].source,
            BindingSource::Literal {
                literal_value: "hi {name}".to_string()
            }
        );
        assert_eq!(bindings[2].source.kind(), "prepare_output");

        let back = serde_json::to_value(&bindings[0]).unwrap();
        assert_eq!(back["sourceType"], "load_input");
        assert_eq!(back["sourceKey"], "f1");
    }

    #[test]
    fn test_layout_recomputed_on_load() {
        let stale = json!({
            "actions": [
                { "id": "a1", "appId": "x", "section": "Billing" },
                { "id": "a2", "appId": "x" },
                { "id": "a3", "appId": "x", "section": "Billing" }
            ],
            "layout": { "sections": [{ "name": "Gone", "actionIds": ["zzz"] }] }
        });

        let config = DashboardConfig::from_json(&stale.to_string()).unwrap();
        assert_eq!(config.layout.sections.len(), 2);
        assert_eq!(config.layout.sections[0].name, "Billing");
        assert_eq!(config.layout.sections[0].action_ids, vec!["a1", "a3"]);
        assert_eq!(config.layout.sections[1].name, DEFAULT_SECTION);
    }

    #[test]
    fn test_to_json_keeps_layout_consistent() {
        let config = DashboardConfig {
            actions: vec![action("a1", Some("Ops"))],
            ..Default::default()
        };
        let saved: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(saved["layout"]["sections"][0]["actionIds"][0], "a1");
    }

    #[test]
    fn test_check_flags_dangling_references() {
        let config = DashboardConfig {
            load_inputs: vec![InputField::new("f1", "email", FieldType::Email)],
            actions: vec![action("a1", None)],
            bindings: vec![
                DashboardBinding {
                    action_id: "missing".to_string(),
                    input_name: "x".to_string(),
                    source: BindingSource::Literal {
                        literal_value: String::new(),
                    },
                },
                DashboardBinding {
                    action_id: "a1".to_string(),
                    input_name: "email".to_string(),
                    source: BindingSource::ActionInput {
                        source_key: "nope".to_string(),
                    },
                },
                DashboardBinding {
                    action_id: "a1".to_string(),
                    input_name: "id".to_string(),
                    source: BindingSource::PrepareOutput {
                        source_key: "id".to_string(),
                    },
                },
            ],
            ..Default::default()
        };

        let errors: Vec<_> = config
            .check("dashboards.d1")
            .into_iter()
            .filter(|f| f.is_error())
            .collect();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].message.contains("unknown action 'missing'"));
        assert!(errors[1].message.contains("unknown action input 'nope'"));
        assert!(errors[2].message.contains("no prepare app"));
    }
}
