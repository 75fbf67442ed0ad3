//! Non-empty string primitives with optional length caps.

use std::borrow::Cow;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationErrors;
use crate::validation::{ParseResult, PrimitiveTrait};

pub const INVALID_NON_EMPTY_STRING: &str = "INVALID_NON_EMPTY_STRING";
pub const INVALID_NON_EMPTY_STRING_MAX_10: &str = "INVALID_NON_EMPTY_STRING_MAX_10";
pub const INVALID_NON_EMPTY_STRING_MAX_100: &str = "INVALID_NON_EMPTY_STRING_MAX_100";

/// Builds a primitive trait accepting strings of `1..=max` characters.
pub fn non_empty_string_max<T>(
    max: usize,
    code: impl Into<Cow<'static, str>>,
    message: impl Into<Cow<'static, str>>,
    construct: fn(String) -> T,
) -> PrimitiveTrait<String, T> {
    PrimitiveTrait::new(
        move |s: &String| {
            let len = s.chars().count();
            len > 0 && len <= max
        },
        code,
        message,
        construct,
    )
}

macro_rules! non_empty_string_type {
    ($(#[$meta:meta])* $name:ident, $primitive:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// The primitive trait backing this type.
            pub fn primitive_trait() -> &'static PrimitiveTrait<String, $name> {
                static TRAIT: LazyLock<PrimitiveTrait<String, $name>> = LazyLock::new(|| $primitive);
                &TRAIT
            }

            /// Validates a typed candidate.
            pub fn new(value: impl Into<String>) -> ParseResult<Self> {
                Self::primitive_trait().parse_raw(value.into())
            }

            /// Validates raw JSON.
            pub fn parse(raw: &Value) -> ParseResult<Self> {
                Self::primitive_trait().parse(raw)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationErrors;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

non_empty_string_type!(
    /// A string with at least one character.
    NonEmptyString,
    PrimitiveTrait::new(
        |s: &String| !s.is_empty(),
        INVALID_NON_EMPTY_STRING,
        "should not be empty",
        NonEmptyString,
    )
);

non_empty_string_type!(
    /// A string of one to ten characters.
    NonEmptyStringMax10,
    non_empty_string_max(
        10,
        INVALID_NON_EMPTY_STRING_MAX_10,
        "should not be empty and larger than 10",
        NonEmptyStringMax10,
    )
);

non_empty_string_type!(
    /// A string of one to one hundred characters.
    NonEmptyStringMax100,
    non_empty_string_max(
        100,
        INVALID_NON_EMPTY_STRING_MAX_100,
        "should not be empty and larger than 100",
        NonEmptyStringMax100,
    )
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_non_empty() {
        assert_eq!(NonEmptyString::new("a").unwrap().as_str(), "a");
        let errors = NonEmptyString::new("").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first().code, INVALID_NON_EMPTY_STRING);
    }

    #[test]
    fn max_10_boundary() {
        assert!(NonEmptyStringMax10::new("abcdefghij").is_ok());
        let errors = NonEmptyStringMax10::new("abcdefghijk").unwrap_err();
        assert_eq!(errors.first().code, INVALID_NON_EMPTY_STRING_MAX_10);
    }

    #[test]
    fn length_counts_characters() {
        // ten characters, twenty bytes
        assert!(NonEmptyStringMax10::new("éééééééééé").is_ok());
    }

    #[test]
    fn max_100_rejects_empty() {
        let errors = NonEmptyStringMax100::parse(&json!("")).unwrap_err();
        assert_eq!(errors.first().code, INVALID_NON_EMPTY_STRING_MAX_100);
    }

    #[test]
    fn non_string_input_is_rejected() {
        let errors = NonEmptyStringMax10::parse(&json!(42)).unwrap_err();
        assert_eq!(errors.first().code, INVALID_NON_EMPTY_STRING_MAX_10);
    }

    #[test]
    fn deserialization_validates() {
        let ok: NonEmptyStringMax10 = serde_json::from_value(json!("short")).unwrap();
        assert_eq!(ok.to_string(), "short");
        assert!(serde_json::from_value::<NonEmptyStringMax10>(json!("way too long text")).is_err());
        assert_eq!(serde_json::to_value(&ok).unwrap(), json!("short"));
    }

    #[test]
    fn custom_max() {
        let code = non_empty_string_max(3, "TOO_LONG", "max 3", |s| s);
        assert!(code.parse_raw("abc".to_string()).is_ok());
        assert_eq!(code.parse_raw("abcd".to_string()).unwrap_err().first().code, "TOO_LONG");
    }
}
