//! Batch resolution over many templates.

use stencil_core::KeyValue;

use crate::error::UnresolvedToken;
use crate::template::{PlaceholderValues, Template};

/// Resolves many templates against one value map, remembering every missing
/// identifier so a single aggregated error can be reported at the end.
///
/// Output produced while identifiers are missing must be discarded; call
/// [`BatchResolver::finish`] before using any of it.
#[derive(Debug)]
pub struct BatchResolver<'v> {
    values: &'v PlaceholderValues,
    missing: Option<UnresolvedToken>,
}

impl<'v> BatchResolver<'v> {
    pub fn new(values: &'v PlaceholderValues) -> Self {
        Self {
            values,
            missing: None,
        }
    }

    pub fn values(&self) -> &'v PlaceholderValues {
        self.values
    }

    /// Resolve one template. Returns an empty string if it failed.
    pub fn resolve(&mut self, template: &str) -> String {
        self.render(&Template::parse(template))
    }

    pub fn render(&mut self, template: &Template) -> String {
        match template.render(self.values) {
            Ok(text) => text,
            Err(err) => {
                match &mut self.missing {
                    Some(missing) => missing.merge(err),
                    None => self.missing = Some(err),
                }
                String::new()
            }
        }
    }

    /// Resolve the values of ordered pairs; keys are copied as-is.
    pub fn resolve_pairs<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = &'a KeyValue>,
    ) -> Vec<KeyValue> {
        pairs
            .into_iter()
            .map(|kv| KeyValue::new(kv.key.clone(), self.resolve(&kv.value)))
            .collect()
    }

    pub fn has_missing(&self) -> bool {
        self.missing.is_some()
    }

    pub fn finish(self) -> Result<(), UnresolvedToken> {
        match self.missing {
            Some(missing) => Err(missing),
            None => Ok(()),
        }
    }
}
