//! Bundled primitive value objects.

mod non_empty_string;

pub use non_empty_string::{
    INVALID_NON_EMPTY_STRING, INVALID_NON_EMPTY_STRING_MAX_10, INVALID_NON_EMPTY_STRING_MAX_100,
    NonEmptyString, NonEmptyStringMax10, NonEmptyStringMax100, non_empty_string_max,
};
