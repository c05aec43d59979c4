//! Error types for template resolution.

use thiserror::Error;

/// One or more placeholders had no value.
///
/// Resolution fails closed: a template with a missing identifier never
/// produces output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unresolved placeholder(s): {}", .identifiers.join(", "))]
pub struct UnresolvedToken {
    /// Missing identifiers, in order of first appearance.
    pub identifiers: Vec<String>,
}

impl UnresolvedToken {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifiers: vec![identifier.into()],
        }
    }

    /// Merge identifiers from another error, skipping duplicates.
    pub fn merge(&mut self, other: UnresolvedToken) {
        for id in other.identifiers {
            if !self.identifiers.contains(&id) {
                self.identifiers.push(id);
            }
        }
    }
}
