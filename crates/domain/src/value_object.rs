//! Identity-less models compared by value.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::entity::INVALID_INPUT;
use crate::error::ValidationErrors;
use crate::model::{DomainModel, ModelKind};
use crate::validation::{ParseResult, Parser};

/// An immutable model whose equality is its tag plus its properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValueObject<P> {
    #[serde(rename = "_tag")]
    tag: &'static str,
    props: P,
}

impl<P> ValueObject<P> {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn unpack(&self) -> &P {
        &self.props
    }

    pub fn into_props(self) -> P {
        self.props
    }
}

impl<P: PartialEq> DomainModel for ValueObject<P> {
    type Props = P;

    fn tag(&self) -> &'static str {
        self.tag
    }

    fn kind(&self) -> ModelKind {
        ModelKind::ValueObject
    }

    fn unpack(&self) -> &P {
        &self.props
    }

    fn is_equal(&self, other: &Self) -> bool {
        self == other
    }
}

/// Constructs value objects of one tag.
pub struct ValueObjectTrait<P> {
    tag: &'static str,
    parser: Arc<dyn Parser<P>>,
}

impl<P> Clone for ValueObjectTrait<P> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag,
            parser: Arc::clone(&self.parser),
        }
    }
}

/// Creates the trait for a value object.
pub fn create_value_object_trait<P>(
    props_parser: impl Parser<P> + 'static,
    tag: &'static str,
) -> ValueObjectTrait<P> {
    ValueObjectTrait {
        tag,
        parser: Arc::new(props_parser),
    }
}

impl<P> ValueObjectTrait<P> {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    pub fn parse(&self, input: &Value) -> ParseResult<ValueObject<P>> {
        let props = self.parser.parse(input)?;
        Ok(ValueObject {
            tag: self.tag,
            props,
        })
    }

    pub fn new<N>(&self, params: &N) -> ParseResult<ValueObject<P>>
    where
        N: Serialize + ?Sized,
    {
        let input = serde_json::to_value(params)
            .map_err(|e| ValidationErrors::single(INVALID_INPUT, e.to_string()))?;
        self.parse(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{integer, parse_struct, string};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
    struct Money {
        amount: i64,
        currency: String,
    }

    fn money_trait() -> ValueObjectTrait<Money> {
        create_value_object_trait(
            |raw: &Value| {
                parse_struct(raw, |f| {
                    let amount = f.required("amount", integer);
                    let currency = f.required("currency", string);
                    Some(Money {
                        amount: amount?,
                        currency: currency?,
                    })
                })
            },
            "Money",
        )
    }

    #[test]
    fn equal_props_are_equal() {
        let t = money_trait();
        let a = t.parse(&json!({"amount": 5, "currency": "EUR"})).unwrap();
        let b = t.new(&json!({"amount": 5, "currency": "EUR"})).unwrap();
        let c = t.parse(&json!({"amount": 6, "currency": "EUR"})).unwrap();
        assert!(a.is_equal(&b));
        assert!(!a.is_equal(&c));
        assert_eq!(a.kind(), ModelKind::ValueObject);
    }

    #[test]
    fn tag_participates_in_equality() {
        let other = create_value_object_trait(
            |raw: &Value| {
                parse_struct(raw, |f| {
                    let amount = f.required("amount", integer);
                    let currency = f.required("currency", string);
                    Some(Money {
                        amount: amount?,
                        currency: currency?,
                    })
                })
            },
            "Price",
        );
        let a = money_trait().parse(&json!({"amount": 1, "currency": "USD"})).unwrap();
        let b = other.parse(&json!({"amount": 1, "currency": "USD"})).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_props_fail() {
        let errors = money_trait().parse(&json!({"amount": "x"})).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
