//! Strategies for pulling a cursor timestamp out of a record.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Extracts the timestamp-bearing value from a record.
///
/// Implemented for [`FlatField`], [`NestedField`], and any
/// `Fn(&Value) -> Option<Value>` closure.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, record: &Value) -> Option<Value>;
}

impl<F> FieldExtractor for F
where
    F: Fn(&Value) -> Option<Value> + Send + Sync,
{
    fn extract(&self, record: &Value) -> Option<Value> {
        self(record)
    }
}

/// A top-level field, e.g. `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatField(pub String);

impl FlatField {
    pub fn new(field: impl Into<String>) -> Self {
        Self(field.into())
    }
}

impl FieldExtractor for FlatField {
    fn extract(&self, record: &Value) -> Option<Value> {
        record.get(&self.0).cloned()
    }
}

/// A field reached through nested objects, e.g. `commit.author.date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedField(pub Vec<String>);

impl NestedField {
    pub fn new<I, S>(path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(path.into_iter().map(Into::into).collect())
    }

    /// Parse a dotted path.
    pub fn from_dotted(path: &str) -> Self {
        Self::new(path.split('.').filter(|segment| !segment.is_empty()))
    }
}

impl FieldExtractor for NestedField {
    fn extract(&self, record: &Value) -> Option<Value> {
        self.0
            .iter()
            .try_fold(record, |value, segment| value.get(segment))
            .cloned()
    }
}

/// Build a flat or nested extractor from a field spec, splitting on `.`.
pub fn extractor_for(field: &str) -> Box<dyn FieldExtractor> {
    if field.contains('.') {
        Box::new(NestedField::from_dotted(field))
    } else {
        Box::new(FlatField::new(field))
    }
}

/// Coerce an extracted value to a UTC timestamp.
///
/// Numbers are epoch milliseconds; strings are RFC 3339 or `YYYY-MM-DD`.
/// Null and anything unparsable yield `None`.
pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_flat_field() {
        let record = json!({"updated_at": "2024-01-10T00:00:00Z"});

        assert_eq!(
            FlatField::new("updated_at").extract(&record),
            Some(json!("2024-01-10T00:00:00Z"))
        );
        assert_eq!(FlatField::new("created_at").extract(&record), None);
    }

    #[test]
    fn test_nested_field() {
        let record = json!({"commit": {"author": {"date": 1700000000000i64}}});

        assert_eq!(
            NestedField::from_dotted("commit.author.date").extract(&record),
            Some(json!(1700000000000i64))
        );
        assert_eq!(NestedField::from_dotted("commit.committer.date").extract(&record), None);
    }

    #[test]
    fn test_closure_extractor() {
        let latest = |record: &Value| -> Option<Value> {
            let a = record.get("a").and_then(Value::as_i64)?;
            let b = record.get("b").and_then(Value::as_i64)?;
            Some(json!(a.max(b)))
        };

        assert_eq!(latest.extract(&json!({"a": 3, "b": 7})), Some(json!(7)));
    }

    #[test]
    fn test_extractor_for_picks_strategy() {
        let record = json!({"a": {"b": 1}, "a.b": 2});

        assert_eq!(extractor_for("a.b").extract(&record), Some(json!(1)));
        assert_eq!(extractor_for("a").extract(&record), Some(json!({"b": 1})));
    }

    #[test]
    fn test_coerce_timestamp_formats() {
        let expected = DateTime::parse_from_rfc3339("2024-01-10T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(coerce_timestamp(&json!("2024-01-10T00:00:00Z")), Some(expected));
        assert_eq!(coerce_timestamp(&json!("2024-01-10T02:00:00+02:00")), Some(expected));
        assert_eq!(coerce_timestamp(&json!("2024-01-10")), Some(expected));
        assert_eq!(coerce_timestamp(&json!(1_704_844_800_000i64)), Some(expected));
    }

    #[test]
    fn test_coerce_timestamp_rejects_garbage() {
        assert_eq!(coerce_timestamp(&Value::Null), None);
        assert_eq!(coerce_timestamp(&json!("yesterday")), None);
        assert_eq!(coerce_timestamp(&json!(true)), None);
        assert_eq!(coerce_timestamp(&json!({"at": 1})), None);
    }
}
