//! Dynamically typed values for declaration tables built at runtime.

use crate::declaration::{defined, maybe, production, variable, Declaration, Rule};
use crate::error::CastError;
use crate::parsers;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A parsed variable value of one of the built-in types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// From [`parsers::string`].
    String(String),
    /// From [`parsers::boolean`].
    Bool(bool),
    /// From [`parsers::number`].
    Number(f64),
    /// From [`parsers::url`].
    Url(Url),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Url(u) => write!(f, "{}", u),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Url(u) => serializer.serialize_str(u.as_str()),
        }
    }
}

/// Built-in value type selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Kind {
    /// Any string.
    #[default]
    String,
    /// `true` or `false`.
    Bool,
    /// Finite number.
    Number,
    /// Absolute URL.
    Url,
}

impl Kind {
    /// Parse a raw value as this kind.
    pub fn parse(self, value: &str) -> Result<Value, CastError> {
        match self {
            Kind::String => parsers::string(value).map(Value::String),
            Kind::Bool => parsers::boolean(value).map(Value::Bool),
            Kind::Number => parsers::number(value).map(Value::Number),
            Kind::Url => parsers::url(value).map(Value::Url),
        }
    }

    /// Declaration of this kind. With `required` unset the variable is
    /// optional in every context; otherwise a `Rule::Production` variable is
    /// required in production only, see [`production`].
    pub fn declare(self, rule: Rule, required: bool) -> Declaration<Option<Value>> {
        let parse = move |value: &str| self.parse(value);
        match (rule, required) {
            (_, false) => variable(rule, maybe(parse)),
            (Rule::Production, true) => production(parse),
            (Rule::Default, true) => {
                let parser = defined(parse);
                variable(rule, move |raw: Option<&str>| parser(raw).map(Some))
            }
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::String => write!(f, "string"),
            Kind::Bool => write!(f, "bool"),
            Kind::Number => write!(f, "number"),
            Kind::Url => write!(f, "url"),
        }
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" => Ok(Kind::String),
            "bool" | "boolean" => Ok(Kind::Bool),
            "number" | "num" => Ok(Kind::Number),
            "url" => Ok(Kind::Url),
            other => Err(format!(
                "Unknown type '{}', expected one of: string, bool, number, url",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NOT_SET_MESSAGE;
    use crate::source::Context;

    #[test]
    fn test_kind_parse() {
        assert_eq!(Kind::String.parse("x").unwrap(), Value::String("x".to_string()));
        assert_eq!(Kind::Bool.parse("true").unwrap(), Value::Bool(true));
        assert_eq!(Kind::Number.parse("42").unwrap(), Value::Number(42.0));
        assert!(matches!(Kind::Url.parse("https://example.com").unwrap(), Value::Url(_)));
        assert!(Kind::Bool.parse("1").is_err());
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("boolean".parse::<Kind>().unwrap(), Kind::Bool);
        assert_eq!("URL".parse::<Kind>().unwrap(), Kind::Url);
        assert!("float".parse::<Kind>().is_err());
    }

    #[test]
    fn test_declare_optional_and_required() {
        let optional = Kind::Number.declare(Rule::Default, false);
        assert_eq!(optional.parse(None).unwrap(), None);

        let required = Kind::Number.declare(Rule::Default, true);
        assert_eq!(required.parse(None).unwrap_err().to_string(), NOT_SET_MESSAGE);
        assert_eq!(required.parse(Some("1")).unwrap(), Some(Value::Number(1.0)));

        let production = Kind::String.declare(Rule::Production, true);
        assert_eq!(production.rule(), Rule::Production);
        assert!(production.parse_in(None, Context::Production).is_err());
        assert_eq!(production.parse_in(None, Context::Development).unwrap(), None);

        let optional = Kind::String.declare(Rule::Production, false);
        assert_eq!(optional.parse_in(None, Context::Production).unwrap(), None);
    }

    #[test]
    fn test_value_serializes_plainly() {
        let values = vec![
            Value::String("a".to_string()),
            Value::Bool(false),
            Value::Number(1.5),
            Value::Url(Url::parse("https://example.com").unwrap()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"["a",false,1.5,"https://example.com/"]"#);
    }
}
