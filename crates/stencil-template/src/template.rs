//! Placeholder parsing and substitution.
//!
//! A placeholder is `{identifier}` where the identifier is one or more
//! characters other than `{` and `}`. Substitution is a single left-to-right
//! pass: inserted values are never rescanned, so user data cannot smuggle in
//! further placeholders.

use std::collections::BTreeMap;

use stencil_core::CurrentUser;

use crate::error::UnresolvedToken;

/// Values available to placeholders, keyed case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderValues {
    values: BTreeMap<String, String>,
}

impl PlaceholderValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the `current_user.*` namespace.
    pub fn with_current_user(mut self, user: &CurrentUser) -> Self {
        for (name, value) in user.placeholders() {
            self.values.insert(name.to_string(), value.to_string());
        }
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = (String, String)>) {
        self.values.extend(values);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<BTreeMap<String, String>> for PlaceholderValues {
    fn from(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PlaceholderValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Split a template into literal text and placeholders.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];

            match after.find(['{', '}']) {
                Some(end) if after.as_bytes()[end] == b'}' && end > 0 => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(after[..end].to_string()));
                    rest = &after[end + 1..];
                }
                Some(end) if after.as_bytes()[end] == b'}' => {
                    // "{}" carries no identifier.
                    literal.push_str("{}");
                    rest = &after[end + 1..];
                }
                Some(end) => {
                    // Another '{' opens before this one closes.
                    literal.push('{');
                    literal.push_str(&after[..end]);
                    rest = &after[end..];
                }
                None => {
                    literal.push('{');
                    literal.push_str(after);
                    rest = "";
                }
            }
        }
        literal.push_str(rest);

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder identifiers in order of appearance (may repeat).
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    /// The identifier if the template is exactly one placeholder.
    pub fn single_placeholder(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [Segment::Placeholder(name)] => Some(name.as_str()),
            _ => None,
        }
    }

    /// Substitute every placeholder, or report all missing identifiers.
    pub fn render(&self, values: &PlaceholderValues) -> Result<String, UnresolvedToken> {
        let mut out = String::new();
        let mut missing: Vec<String> = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        if !missing.contains(name) {
                            missing.push(name.clone());
                        }
                    }
                },
            }
        }

        if missing.is_empty() {
            Ok(out)
        } else {
            tracing::debug!(missing = ?missing, "Template has unresolved placeholders");
            Err(UnresolvedToken {
                identifiers: missing,
            })
        }
    }
}

/// Parse and render in one step.
pub fn resolve(template: &str, values: &PlaceholderValues) -> Result<String, UnresolvedToken> {
    Template::parse(template).render(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(pairs: &[(&str, &str)]) -> PlaceholderValues {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_resolves_multiple_tokens() {
        let v = values(&[("userId", "42"), ("org", "acme")]);
        assert_eq!(
            resolve("/orgs/{org}/users/{userId}", &v).unwrap(),
            "/orgs/acme/users/42"
        );
    }

    #[test]
    fn test_missing_identifier_fails_closed() {
        let err = resolve("{missing}", &PlaceholderValues::new()).unwrap_err();
        assert_eq!(err.identifiers, vec!["missing".to_string()]);
        assert_eq!(err.to_string(), "unresolved placeholder(s): missing");
    }

    #[test]
    fn test_all_missing_identifiers_reported_once() {
        let err = resolve("{a}-{b}-{a}", &values(&[])).unwrap_err();
        assert_eq!(err.identifiers, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(resolve("{UserId}", &values(&[("userId", "1")])).is_err());
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let v = values(&[("name", "{secret}"), ("secret", "leaked")]);
        assert_eq!(resolve("hello {name}", &v).unwrap(), "hello {secret}");
    }

    #[test]
    fn test_idempotent_on_plain_text() {
        let v = values(&[("x", "1")]);
        let once = resolve("no tokens here", &v).unwrap();
        assert_eq!(resolve(&once, &v).unwrap(), "no tokens here");
    }

    #[test]
    fn test_non_tokens_stay_literal() {
        let v = values(&[("b", "B")]);
        assert_eq!(resolve("{}", &v).unwrap(), "{}");
        assert_eq!(resolve("x{a{b}", &v).unwrap(), "x{aB");
        assert_eq!(resolve("open {only", &v).unwrap(), "open {only");
        assert_eq!(resolve("close} only", &v).unwrap(), "close} only");
    }

    #[test]
    fn test_current_user_namespace() {
        let user = CurrentUser {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        };
        let v = PlaceholderValues::new().with_current_user(&user);
        assert_eq!(
            resolve("{current_user.name} <{current_user.email}>", &v).unwrap(),
            "Ada <ada@example.com>"
        );
    }

    #[test]
    fn test_single_placeholder() {
        assert_eq!(Template::parse("{id}").single_placeholder(), Some("id"));
        assert_eq!(Template::parse(" {id}").single_placeholder(), None);
        assert_eq!(Template::parse("{a}{b}").single_placeholder(), None);
    }

    #[test]
    fn test_multibyte_text() {
        let v = values(&[("név", "Ádám")]);
        assert_eq!(resolve("szia {név}! ✓", &v).unwrap(), "szia Ádám! ✓");
    }
}
