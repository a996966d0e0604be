//! Strategies for deriving a partition key from a sync slice.

use serde_json::Value;

/// Derives the partition key for a slice.
///
/// Returning `None` means the slice has no partition; records under it leave
/// the state unchanged. Keys are lower-cased by the state manager, so
/// implementations need not normalize case.
pub trait KeyGenerator: Send + Sync {
    fn key(&self, slice: &Value) -> Option<String>;
}

impl<F> KeyGenerator for F
where
    F: Fn(&Value) -> Option<String> + Send + Sync,
{
    fn key(&self, slice: &Value) -> Option<String> {
        self(slice)
    }
}

/// Uses one named slice field, e.g. `{"board": "OPS"}` becomes `OPS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldKey {
    field: String,
}

impl FieldKey {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl KeyGenerator for FieldKey {
    fn key(&self, slice: &Value) -> Option<String> {
        scalar(slice.get(&self.field)?)
    }
}

/// Joins two named slice fields, e.g. `{"org": "acme", "repo": "widgets"}`
/// becomes `acme/widgets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPairKey {
    first: String,
    second: String,
    separator: String,
}

impl FieldPairKey {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
            separator: "/".to_string(),
        }
    }

    /// Use a separator other than `/`.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// `org/repo`, as used by GitHub-style sources.
    pub fn org_repo() -> Self {
        Self::new("org", "repo")
    }

    /// `group/project`, as used by GitLab-style sources.
    pub fn group_project() -> Self {
        Self::new("group", "project")
    }
}

impl KeyGenerator for FieldPairKey {
    fn key(&self, slice: &Value) -> Option<String> {
        let first = scalar(slice.get(&self.first)?)?;
        let second = scalar(slice.get(&self.second)?)?;
        Some(format!("{first}{}{second}", self.separator))
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
