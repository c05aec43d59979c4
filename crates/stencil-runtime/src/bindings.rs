//! Binding resolution.
//!
//! Bindings map dashboard values onto the inputs of an action's App. The
//! result is a map keyed by the App's input names, which are input labels.

use serde_json::Value;
use std::collections::BTreeMap;

use stencil_core::{BindingSource, CurrentUser, DashboardConfig};
use stencil_policy::ValidatedFields;
use stencil_template::{PlaceholderValues, resolve};

use crate::error::BindingError;

/// Values a binding can draw from.
#[derive(Debug, Clone, Copy)]
pub struct BindingContext<'a> {
    pub load: &'a ValidatedFields,
    pub action: &'a ValidatedFields,
    pub prepare_output: Option<&'a Value>,
    pub current_user: &'a CurrentUser,
}

impl BindingContext<'_> {
    /// Placeholder values for literal bindings: load and action values by
    /// label plus the `current_user.*` namespace.
    fn placeholder_values(&self) -> PlaceholderValues {
        let mut values = PlaceholderValues::new().with_current_user(self.current_user);
        values.extend(self.load.rendered_by_label());
        values.extend(self.action.rendered_by_label());
        values
    }
}

/// Resolve every binding of one action into its App's input map.
pub fn resolve_bindings(
    config: &DashboardConfig,
    action_id: &str,
    ctx: &BindingContext<'_>,
) -> Result<BTreeMap<String, String>, BindingError> {
    let mut inputs = BTreeMap::new();
    let mut placeholders: Option<PlaceholderValues> = None;

    for binding in config.bindings_for(action_id) {
        let value = match &binding.source {
            BindingSource::Literal { literal_value } => {
                let values = placeholders.get_or_insert_with(|| ctx.placeholder_values());
                resolve(literal_value, values).map_err(|source| BindingError::Unresolved {
                    input_name: binding.input_name.clone(),
                    source,
                })?
            }
            BindingSource::LoadInput { source_key } => ctx
                .load
                .get_by_id(source_key)
                .map(|v| v.render())
                .ok_or_else(|| BindingError::UnknownField {
                    input_name: binding.input_name.clone(),
                    field_id: source_key.clone(),
                })?,
            BindingSource::ActionInput { source_key } => ctx
                .action
                .get_by_id(source_key)
                .map(|v| v.render())
                .ok_or_else(|| BindingError::UnknownField {
                    input_name: binding.input_name.clone(),
                    field_id: source_key.clone(),
                })?,
            BindingSource::PrepareOutput { source_key } => ctx
                .prepare_output
                .and_then(|output| lookup_path(output, source_key))
                .and_then(render_json)
                .ok_or_else(|| BindingError::MissingPath {
                    input_name: binding.input_name.clone(),
                    path: source_key.clone(),
                })?,
        };

        if inputs.insert(binding.input_name.clone(), value).is_some() {
            tracing::warn!(
                action_id = %action_id,
                input = %binding.input_name,
                "Input bound more than once; the last binding wins"
            );
        }
    }

    Ok(inputs)
}

/// Look up a dotted path such as `data.items.0.id` or `data.items[0].id`.
///
/// An empty path selects the whole value.
pub fn lookup_path<'v>(value: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in path_segments(path)? {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn path_segments(path: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    if path.is_empty() {
        return Some(segments);
    }
    for part in path.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(open) => (&part[..open], &part[open..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            segments.push(name);
        } else if rest.is_empty() {
            return None;
        }
        while !rest.is_empty() {
            let close = rest.find(']')?;
            if !rest.starts_with('[') || close < 2 {
                return None;
            }
            segments.push(&rest[1..close]);
            rest = &rest[close + 1..];
        }
    }
    Some(segments)
}

/// Scalars render as text, structures as compact JSON. Null is absent.
pub fn render_json(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
