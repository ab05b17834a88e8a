//! Storage backend port
//!
//! Defines the key-value document interface every store is built on.
//! Documents are JSON objects addressed by `(collection, key)`; queries filter
//! on top-level fields only.
//!
//! The [`Query`] type also carries a reference evaluator ([`Query::apply`])
//! that backends without a query engine of their own can use directly.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use thiserror::Error;

/// Longest accepted collection name or document key, in bytes.
pub const MAX_KEY_BYTES: usize = 1500;

/// Errors that can occur during storage backend operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Malformed key: {0:?}")]
    MalformedKey(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt document {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

impl StorageError {
    /// Whether the failure is a connectivity fault rather than bad input.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_))
    }
}

/// A stored document together with its key.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub key: String,
    pub value: Value,
}

impl Document {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Ascending,
    #[default]
    Descending,
}

impl Direction {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

/// Ordering of query results. Ties are broken by document key in the same
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl Default for OrderBy {
    fn default() -> Self {
        Self {
            field: "updated_at".to_string(),
            direction: Direction::Descending,
        }
    }
}

/// Inclusive range on one field. Documents without the field never match.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub field: String,
    pub from: Option<Value>,
    pub to: Option<Value>,
}

/// Position after which results resume: the sort value and key of the last
/// document already seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub value: Value,
    pub key: String,
}

/// A filtered, ordered and optionally bounded scan of one collection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    /// Exact-match filters, all of which must hold.
    pub filters: Vec<(String, Value)>,
    pub range: Option<RangeFilter>,
    pub order_by: OrderBy,
    pub start_after: Option<Cursor>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Builder Methods ====================

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn where_range(
        mut self,
        field: impl Into<String>,
        from: Option<Value>,
        to: Option<Value>,
    ) -> Self {
        self.range = Some(RangeFilter {
            field: field.into(),
            from,
            to,
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = OrderBy {
            field: field.into(),
            direction,
        };
        self
    }

    pub fn start_after(mut self, value: impl Into<Value>, key: impl Into<String>) -> Self {
        self.start_after = Some(Cursor {
            value: value.into(),
            key: key.into(),
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    // ==================== Validation ====================

    /// Check field names and filter values.
    pub fn validate(&self) -> Result<(), StorageError> {
        for (field, value) in &self.filters {
            validate_field(field)?;
            if !is_scalar(value) {
                return Err(StorageError::InvalidQuery(format!(
                    "filter on '{field}' must be a scalar value"
                )));
            }
        }
        if let Some(range) = &self.range {
            validate_field(&range.field)?;
            for bound in [&range.from, &range.to].into_iter().flatten() {
                if !is_scalar(bound) || bound.is_null() {
                    return Err(StorageError::InvalidQuery(format!(
                        "range bound on '{}' must be a non-null scalar",
                        range.field
                    )));
                }
            }
        }
        validate_field(&self.order_by.field)?;
        if let Some(cursor) = &self.start_after {
            if !is_scalar(&cursor.value) {
                return Err(StorageError::InvalidQuery(
                    "cursor value must be a scalar".to_string(),
                ));
            }
        }
        Ok(())
    }

    // ==================== Evaluation ====================

    /// Whether a document satisfies the filters and range.
    pub fn matches(&self, value: &Value) -> bool {
        let eq_ok = self.filters.iter().all(|(field, expected)| {
            let actual = field_value(value, field);
            rank(actual) == rank(expected) && compare_values(actual, expected) == Ordering::Equal
        });
        if !eq_ok {
            return false;
        }
        match &self.range {
            None => true,
            Some(range) => {
                let actual = field_value(value, &range.field);
                if actual.is_null() {
                    return false;
                }
                let above = range
                    .from
                    .as_ref()
                    .is_none_or(|from| compare_values(actual, from) != Ordering::Less);
                let below = range
                    .to
                    .as_ref()
                    .is_none_or(|to| compare_values(actual, to) != Ordering::Greater);
                above && below
            }
        }
    }

    /// Ordering of two documents under this query's sort.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let field = &self.order_by.field;
        let ordering = compare_values(field_value(&a.value, field), field_value(&b.value, field))
            .then_with(|| a.key.cmp(&b.key));
        self.order_by.direction.apply(ordering)
    }

    fn is_after_cursor(&self, doc: &Document) -> bool {
        match &self.start_after {
            None => true,
            Some(cursor) => {
                let field = &self.order_by.field;
                let ordering = compare_values(field_value(&doc.value, field), &cursor.value)
                    .then_with(|| doc.key.as_str().cmp(cursor.key.as_str()));
                self.order_by.direction.apply(ordering) == Ordering::Greater
            }
        }
    }

    /// Run the query over an unordered set of documents.
    pub fn apply<I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = Document>,
    {
        let mut selected: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(&doc.value) && self.is_after_cursor(doc))
            .collect();
        selected.sort_by(|a, b| self.compare(a, b));
        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Validate a collection name or document key.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() || key.len() > MAX_KEY_BYTES || key.contains('/') || key == "." || key == ".."
    {
        return Err(StorageError::MalformedKey(key.to_string()));
    }
    Ok(())
}

/// Validate a queryable field name (`[A-Za-z0-9_]+`).
pub fn validate_field(field: &str) -> Result<(), StorageError> {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StorageError::InvalidQuery(format!(
            "invalid field name '{field}'"
        )));
    }
    Ok(())
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn field_value<'a>(document: &'a Value, field: &str) -> &'a Value {
    document.get(field).unwrap_or(&Value::Null)
}

/// Type rank used when values of different JSON types are compared:
/// null < bool < number < string < composite.
fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    }
}

/// Total order over JSON values.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => match rank(a).cmp(&rank(b)) {
            Ordering::Equal if rank(a) == 4 => a.to_string().cmp(&b.to_string()),
            ordering => ordering,
        },
    }
}

/// Key-value document storage
///
/// This port defines how stores persist documents. Implementations
/// (adapters) live in the infrastructure layer. Every operation is atomic at
/// single-document granularity.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Label used in logs and health output.
    fn name(&self) -> &str;

    /// Insert or overwrite a document.
    async fn put(&self, collection: &str, key: &str, value: Value) -> Result<(), StorageError>;

    /// Fetch a document. Absence is `Ok(None)`.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StorageError>;

    /// Remove a document. Removing an absent document succeeds.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), StorageError>;

    /// Return the documents of `collection` selected by `query`, in order.
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StorageError>;

    /// Reachability probe.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    /// Flush and release resources at shutdown.
    async fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        vec![
            Document::new("a", json!({"kind": "x", "n": 3, "at": "2024-01-01"})),
            Document::new("b", json!({"kind": "y", "n": 1, "at": "2024-01-03"})),
            Document::new("c", json!({"kind": "x", "n": 2, "at": "2024-01-02"})),
            Document::new("d", json!({"kind": "x", "n": 2})),
        ]
    }

    fn keys(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.key.as_str()).collect()
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("sessions").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key(".").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_BYTES)).is_ok());
        assert!(validate_key(&"k".repeat(MAX_KEY_BYTES + 1)).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_fields_and_values() {
        assert!(Query::new().where_eq("user_type", "eco").validate().is_ok());
        assert!(matches!(
            Query::new().where_eq("user.type", "eco").validate(),
            Err(StorageError::InvalidQuery(_))
        ));
        assert!(
            Query::new()
                .where_eq("tags", json!(["a"]))
                .validate()
                .is_err()
        );
        assert!(Query::new().order_by("", Direction::Ascending).validate().is_err());
    }

    #[test]
    fn test_filter_and_order() {
        let query = Query::new()
            .where_eq("kind", "x")
            .order_by("n", Direction::Ascending);
        assert_eq!(keys(&query.apply(docs())), vec!["c", "d", "a"]);

        let query = Query::new()
            .where_eq("kind", "x")
            .order_by("n", Direction::Descending);
        assert_eq!(keys(&query.apply(docs())), vec!["a", "d", "c"]);
    }

    #[test]
    fn test_range_is_inclusive_and_skips_missing_field() {
        let query = Query::new()
            .where_range("at", Some(json!("2024-01-02")), Some(json!("2024-01-03")))
            .order_by("at", Direction::Ascending);
        assert_eq!(keys(&query.apply(docs())), vec!["c", "b"]);
    }

    #[test]
    fn test_cursor_and_limit_page_through() {
        let base = Query::new().order_by("n", Direction::Descending).limit(2);
        let first = base.clone().apply(docs());
        assert_eq!(keys(&first), vec!["a", "d"]);

        let last = first.last().unwrap();
        let second = base
            .clone()
            .start_after(last.value["n"].clone(), last.key.clone())
            .apply(docs());
        assert_eq!(keys(&second), vec!["c", "b"]);
    }

    #[test]
    fn test_compare_values_across_types() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!(1.0)), Ordering::Equal);
        assert_eq!(compare_values(&json!(10), &json!("1")), Ordering::Less);
    }
}
