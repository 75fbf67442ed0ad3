use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::Record;

/// One test applied to a record field.
///
/// Paths are dot-separated and walk nested objects (`"address.city"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    Eq { path: String, value: Value },
    NotEq { path: String, value: Value },
    OneOf { path: String, values: Vec<Value> },
    IsNull { path: String },
}

impl Condition {
    pub fn path(&self) -> &str {
        match self {
            Self::Eq { path, .. }
            | Self::NotEq { path, .. }
            | Self::OneOf { path, .. }
            | Self::IsNull { path } => path,
        }
    }

    /// Evaluates the condition against a record.
    ///
    /// A missing field is null: it fails `Eq` and `OneOf` and passes
    /// `NotEq` and `IsNull`.
    pub fn matches(&self, record: &Record) -> bool {
        let found = lookup(record, self.path());
        match self {
            Self::Eq { value, .. } => found == Some(value),
            Self::NotEq { value, .. } => found != Some(value),
            Self::OneOf { values, .. } => found.is_some_and(|v| values.contains(v)),
            Self::IsNull { .. } => found.is_none_or(Value::is_null),
        }
    }
}

/// Builder for store-agnostic record predicates.
///
/// Conditions are ANDed in the order they were added.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryPredicate {
    /// Conditions every matching record satisfies.
    pub conditions: Vec<Condition>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Number of records to skip.
    pub offset: Option<usize>,
}

impl QueryPredicate {
    /// Creates a predicate matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an equality predicate from serializable query params.
    ///
    /// Null members are skipped and nested objects become dotted paths, so
    /// `{"address": {"city": "Oslo"}}` only constrains `address.city`.
    pub fn from_params<Q: Serialize + ?Sized>(params: &Q) -> Result<Self, serde_json::Error> {
        let mut predicate = Self::new();
        match serde_json::to_value(params)? {
            Value::Null => {}
            Value::Object(map) => flatten_into(&mut predicate, None, map),
            other => {
                return Err(serde::ser::Error::custom(format!(
                    "query params must serialize to an object, got {other}"
                )));
            }
        }
        Ok(predicate)
    }

    pub fn eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn not_eq(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::NotEq {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    pub fn one_of<V: Into<Value>>(
        mut self,
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::OneOf {
            path: path.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_null(mut self, path: impl Into<String>) -> Self {
        self.conditions.push(Condition::IsNull { path: path.into() });
        self
    }

    /// Limits the number of records returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many records before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the record satisfies every condition.
    pub fn matches(&self, record: &Record) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    /// Applies offset and limit to already-filtered results.
    pub fn paginate<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let items = items.into_iter().skip(self.offset.unwrap_or(0));
        match self.limit {
            Some(limit) => items.take(limit).collect(),
            None => items.collect(),
        }
    }
}

fn flatten_into(predicate: &mut QueryPredicate, prefix: Option<&str>, map: Record) {
    for (key, value) in map {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{key}"),
            None => key,
        };
        match value {
            Value::Null => {}
            Value::Object(nested) => flatten_into(predicate, Some(&path), nested),
            value => predicate.conditions.push(Condition::Eq { path, value }),
        }
    }
}

/// Resolves a dotted path inside a record.
pub fn lookup<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
