//! Parsers and combinators that turn untrusted JSON into validated values.
//!
//! Every parser is a total function from `&Value` to [`ParseResult`]. Struct
//! parsing runs every field parser and reports all failures together, while
//! primitive traits stop at the first (and only) predicate failure.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationErrors};

/// Outcome of a parse: the validated value or every violation found.
pub type ParseResult<T> = Result<T, ValidationErrors>;

/// Error codes emitted by the core parsers.
pub mod codes {
    pub const INVALID_STRUCT: &str = "INVALID_STRUCT";
    pub const MISSING_FIELD: &str = "MISSING_FIELD";
    pub const INVALID_STRING: &str = "INVALID_STRING";
    pub const INVALID_INTEGER: &str = "INVALID_INTEGER";
    pub const INVALID_NUMBER: &str = "INVALID_NUMBER";
    pub const INVALID_BOOLEAN: &str = "INVALID_BOOLEAN";
    pub const INVALID_TIMESTAMP: &str = "INVALID_TIMESTAMP";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
}

/// A function from raw input to a validated value.
pub trait Parser<T>: Send + Sync {
    /// Parses `raw` into a `T`.
    fn parse(&self, raw: &Value) -> ParseResult<T>;
}

impl<T, F> Parser<T> for F
where
    F: Fn(&Value) -> ParseResult<T> + Send + Sync,
{
    fn parse(&self, raw: &Value) -> ParseResult<T> {
        self(raw)
    }
}

/// Field accessor handed to [`parse_struct`] closures.
///
/// Each declared field is parsed immediately; failures are collected and
/// the field reads as `None` so the closure can keep declaring the rest.
pub struct Fields<'a> {
    raw: &'a Map<String, Value>,
    errors: Vec<ValidationError>,
}

impl<'a> Fields<'a> {
    /// Parses a field that must be present and non-null.
    pub fn required<T>(&mut self, name: &str, parser: impl Parser<T>) -> Option<T> {
        match self.raw.get(name) {
            None | Some(Value::Null) => {
                self.errors.push(
                    ValidationError::new(codes::MISSING_FIELD, format!("{name} is required"))
                        .at(name),
                );
                None
            }
            Some(value) => self.record(name, parser.parse(value)),
        }
    }

    /// Parses a field that may be absent or null.
    ///
    /// Returns `Some(None)` when absent and `None` when present but invalid.
    pub fn optional<T>(&mut self, name: &str, parser: impl Parser<T>) -> Option<Option<T>> {
        match self.raw.get(name) {
            None | Some(Value::Null) => Some(None),
            Some(value) => self.record(name, parser.parse(value)).map(Some),
        }
    }

    /// Records a cross-field error.
    pub fn reject(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// The raw object being parsed.
    pub fn raw(&self) -> &'a Map<String, Value> {
        self.raw
    }

    fn record<T>(&mut self, name: &str, result: ParseResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(errors) => {
                self.errors.extend(errors.at(name));
                None
            }
        }
    }
}

/// Parses a JSON object field by field.
///
/// The closure declares every field through [`Fields`]; the result is `Ok`
/// only if every declaration succeeded. A non-object input yields a single
/// `INVALID_STRUCT` error.
pub fn parse_struct<T>(
    raw: &Value,
    build: impl FnOnce(&mut Fields<'_>) -> Option<T>,
) -> ParseResult<T> {
    let Some(object) = raw.as_object() else {
        return Err(ValidationErrors::single(
            codes::INVALID_STRUCT,
            format!("expected an object, got {}", kind_of(raw)),
        ));
    };

    let mut fields = Fields {
        raw: object,
        errors: Vec::new(),
    };
    let built = build(&mut fields);

    match (ValidationErrors::from_vec(fields.errors), built) {
        (Some(errors), _) => Err(errors),
        (None, Some(value)) => Ok(value),
        (None, None) => Err(ValidationErrors::single(
            codes::INVALID_STRUCT,
            "object did not produce a value",
        )),
    }
}

type StructBuilder<T> = dyn Fn(&mut Fields<'_>) -> Option<T> + Send + Sync;

/// A reusable struct parser.
pub struct StructParser<T> {
    build: Arc<StructBuilder<T>>,
}

impl<T> StructParser<T> {
    pub fn new(build: impl Fn(&mut Fields<'_>) -> Option<T> + Send + Sync + 'static) -> Self {
        Self {
            build: Arc::new(build),
        }
    }
}

impl<T> Clone for StructParser<T> {
    fn clone(&self) -> Self {
        Self {
            build: Arc::clone(&self.build),
        }
    }
}

impl<T> Parser<T> for StructParser<T> {
    fn parse(&self, raw: &Value) -> ParseResult<T> {
        parse_struct(raw, |fields| (self.build)(fields))
    }
}

type Predicate<R> = dyn Fn(&R) -> bool + Send + Sync;

/// Parser for a single-valued domain primitive.
///
/// The raw input is first read as an `R`; the predicate then decides whether
/// it is acceptable. Any failure produces exactly one error carrying the
/// configured code and message.
pub struct PrimitiveTrait<R, T> {
    predicate: Arc<Predicate<R>>,
    code: Cow<'static, str>,
    message: Cow<'static, str>,
    construct: fn(R) -> T,
}

impl<R, T> PrimitiveTrait<R, T>
where
    R: DeserializeOwned,
{
    /// Builds a primitive trait from a predicate and a fixed error.
    pub fn new(
        predicate: impl Fn(&R) -> bool + Send + Sync + 'static,
        code: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
        construct: fn(R) -> T,
    ) -> Self {
        Self {
            predicate: Arc::new(predicate),
            code: code.into(),
            message: message.into(),
            construct,
        }
    }

    /// Builds a primitive trait using the default `INVALID_VALUE` error.
    pub fn with_default_error(
        predicate: impl Fn(&R) -> bool + Send + Sync + 'static,
        construct: fn(R) -> T,
    ) -> Self {
        Self::new(predicate, codes::INVALID_VALUE, "invalid value", construct)
    }

    /// Parses raw JSON.
    pub fn parse(&self, raw: &Value) -> ParseResult<T> {
        let candidate = R::deserialize(raw).map_err(|_| self.error())?;
        self.parse_raw(candidate)
    }

    /// Validates an already-typed candidate.
    pub fn parse_raw(&self, candidate: R) -> ParseResult<T> {
        if (self.predicate)(&candidate) {
            Ok((self.construct)(candidate))
        } else {
            Err(self.error())
        }
    }

    /// The error code reported on failure.
    pub fn code(&self) -> &str {
        &self.code
    }

    fn error(&self) -> ValidationErrors {
        ValidationErrors::single(self.code.clone(), self.message.clone())
    }
}

impl<R, T> Clone for PrimitiveTrait<R, T> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
            code: self.code.clone(),
            message: self.message.clone(),
            construct: self.construct,
        }
    }
}

impl<R, T> Parser<T> for PrimitiveTrait<R, T>
where
    R: DeserializeOwned + Send + Sync,
    T: Send + Sync,
{
    fn parse(&self, raw: &Value) -> ParseResult<T> {
        PrimitiveTrait::parse(self, raw)
    }
}

/// Parses a JSON string.
pub fn string(raw: &Value) -> ParseResult<String> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationErrors::single(
            codes::INVALID_STRING,
            format!("expected a string, got {}", kind_of(other)),
        )),
    }
}

/// Parses a JSON integer.
pub fn integer(raw: &Value) -> ParseResult<i64> {
    raw.as_i64().ok_or_else(|| {
        ValidationErrors::single(
            codes::INVALID_INTEGER,
            format!("expected an integer, got {}", kind_of(raw)),
        )
    })
}

/// Parses any JSON number.
pub fn number(raw: &Value) -> ParseResult<f64> {
    raw.as_f64().ok_or_else(|| {
        ValidationErrors::single(
            codes::INVALID_NUMBER,
            format!("expected a number, got {}", kind_of(raw)),
        )
    })
}

/// Parses a JSON boolean.
pub fn boolean(raw: &Value) -> ParseResult<bool> {
    raw.as_bool().ok_or_else(|| {
        ValidationErrors::single(
            codes::INVALID_BOOLEAN,
            format!("expected a boolean, got {}", kind_of(raw)),
        )
    })
}

/// Parses an RFC 3339 timestamp string into UTC.
pub fn timestamp(raw: &Value) -> ParseResult<DateTime<Utc>> {
    raw.as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            ValidationErrors::single(codes::INVALID_TIMESTAMP, "expected an RFC 3339 timestamp")
        })
}

/// Parses a list, validating every element and reporting failures by index.
pub fn list<T>(raw: &Value, element: impl Parser<T>) -> ParseResult<Vec<T>> {
    let Some(items) = raw.as_array() else {
        return Err(ValidationErrors::single(
            codes::INVALID_STRUCT,
            format!("expected an array, got {}", kind_of(raw)),
        ));
    };

    let mut values = Vec::with_capacity(items.len());
    let mut errors: Option<ValidationErrors> = None;
    for (index, item) in items.iter().enumerate() {
        match element.parse(item) {
            Ok(value) => values.push(value),
            Err(e) => {
                let e = e.at(&index.to_string());
                errors = Some(match errors {
                    Some(existing) => existing.merge(e),
                    None => e,
                });
            }
        }
    }

    match errors {
        Some(errors) => Err(errors),
        None => Ok(values),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Person {
        name: String,
        age: i64,
        nickname: Option<String>,
    }

    fn person(raw: &Value) -> ParseResult<Person> {
        parse_struct(raw, |f| {
            let name = f.required("name", string);
            let age = f.required("age", integer);
            let nickname = f.optional("nickname", string);
            Some(Person {
                name: name?,
                age: age?,
                nickname: nickname?,
            })
        })
    }

    #[test]
    fn struct_parses_valid_input() {
        let parsed = person(&json!({"name": "Ada", "age": 36})).unwrap();
        assert_eq!(
            parsed,
            Person {
                name: "Ada".into(),
                age: 36,
                nickname: None
            }
        );
    }

    #[test]
    fn struct_reports_every_invalid_field() {
        let errors = person(&json!({"name": 7, "age": "old", "nickname": false})).unwrap_err();
        assert_eq!(errors.len(), 3);
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field.as_deref()).collect();
        assert_eq!(fields, vec!["name", "age", "nickname"]);
    }

    #[test]
    fn missing_required_field() {
        let errors = person(&json!({"age": 3})).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, codes::MISSING_FIELD);
        assert_eq!(errors.first().field.as_deref(), Some("name"));
    }

    #[test]
    fn null_required_field_is_missing() {
        let errors = person(&json!({"name": null, "age": 3})).unwrap_err();
        assert_eq!(errors.first().code, codes::MISSING_FIELD);
    }

    #[test]
    fn non_object_is_invalid_struct() {
        let errors = person(&json!("Ada")).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, codes::INVALID_STRUCT);
    }

    #[test]
    fn nested_struct_errors_carry_paths() {
        let inner = StructParser::new(|f| f.required("street", string));
        let errors = parse_struct(&json!({"address": {"street": 1}}), |f| {
            f.required("address", inner.clone())
        })
        .unwrap_err();
        assert_eq!(errors.first().field.as_deref(), Some("address.street"));
    }

    #[test]
    fn reject_adds_cross_field_error() {
        let errors = parse_struct(&json!({"from": 5, "to": 1}), |f| {
            let from = f.required("from", integer)?;
            let to = f.required("to", integer)?;
            if from > to {
                f.reject(ValidationError::new("INVALID_RANGE", "from must not exceed to"));
                return None;
            }
            Some((from, to))
        })
        .unwrap_err();
        assert_eq!(errors.first().code, "INVALID_RANGE");
    }

    #[test]
    fn primitive_trait_short_circuits_to_one_error() {
        let positive = PrimitiveTrait::new(|n: &i64| *n > 0, "NOT_POSITIVE", "must be positive", |n| n);
        assert_eq!(positive.parse(&json!(4)).unwrap(), 4);

        let errors = positive.parse(&json!(-1)).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, "NOT_POSITIVE");

        let errors = positive.parse(&json!("x")).unwrap_err();
        assert_eq!(errors.first().code, "NOT_POSITIVE");
    }

    #[test]
    fn primitive_trait_default_error() {
        let even = PrimitiveTrait::with_default_error(|n: &i64| n % 2 == 0, |n| n);
        let errors = even.parse_raw(3).unwrap_err();
        assert_eq!(errors.first().code, codes::INVALID_VALUE);
        assert_eq!(errors.first().message, "invalid value");
    }

    #[test]
    fn timestamp_normalizes_to_utc() {
        let parsed = timestamp(&json!("2024-01-01T02:00:00+02:00")).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert!(timestamp(&json!("yesterday")).is_err());
    }

    #[test]
    fn list_reports_indexed_errors() {
        let errors = list(&json!([1, "two", 3, false]), integer).unwrap_err();
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field.as_deref()).collect();
        assert_eq!(fields, vec!["1", "3"]);
    }

    #[test]
    fn leaf_parsers_reject_wrong_kinds() {
        assert!(boolean(&json!(true)).unwrap());
        assert_eq!(
            boolean(&json!(1)).unwrap_err().first().code,
            codes::INVALID_BOOLEAN
        );
        assert_eq!(number(&json!(1.5)).unwrap(), 1.5);
        assert_eq!(
            string(&json!(null)).unwrap_err().first().code,
            codes::INVALID_STRING
        );
    }
}
