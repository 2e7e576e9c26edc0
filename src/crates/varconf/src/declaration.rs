//! Variable declarations: a requirement rule paired with a value parser.
//!
//! A declaration is built once, typically in a static table or through the
//! [`variables!`](crate::variables) macro, and reused for every resolution run.
//!
//! ```rust
//! use varconf::prelude::*;
//!
//! let port = optional(number);
//! let api_key = production(string);
//! let database_url = required(url_string);
//!
//! assert_eq!(port.rule(), Rule::Default);
//! assert_eq!(api_key.rule(), Rule::Production);
//! assert_eq!(database_url.parse(Some("postgres://db/app")).unwrap(), "postgres://db/app");
//! ```

use crate::error::CastError;
use crate::source::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Requirement rule of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rule {
    /// Required only in the production context. In production the value
    /// must come from the environment; file sources are not consulted.
    Production,
    /// Sources are always consulted environment first, then files.
    #[default]
    Default,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Production => write!(f, "production"),
            Rule::Default => write!(f, "default"),
        }
    }
}

type ParserFn<T> = dyn Fn(Option<&str>) -> Result<T, CastError> + Send + Sync;

/// A declared variable: its [`Rule`] and the parser producing its typed value.
pub struct Declaration<T> {
    rule: Rule,
    parser: Arc<ParserFn<T>>,
    relaxed: Option<Arc<ParserFn<T>>>,
}

impl<T: 'static> Declaration<T> {
    /// Create a declaration from a rule and a parser over the optional raw value.
    pub fn new<F>(rule: Rule, parser: F) -> Self
    where
        F: Fn(Option<&str>) -> Result<T, CastError> + Send + Sync + 'static,
    {
        Self {
            rule,
            parser: Arc::new(parser),
            relaxed: None,
        }
    }

    /// Use `parser` instead when the context is not production. Only
    /// consulted for [`Rule::Production`] declarations.
    fn otherwise<F>(mut self, parser: F) -> Self
    where
        F: Fn(Option<&str>) -> Result<T, CastError> + Send + Sync + 'static,
    {
        self.relaxed = Some(Arc::new(parser));
        self
    }

    /// The requirement rule.
    pub fn rule(&self) -> Rule {
        self.rule
    }

    /// Run the parser on a raw value (`None` when no consulted source had the key).
    pub fn parse(&self, raw: Option<&str>) -> Result<T, CastError> {
        (self.parser)(raw)
    }

    /// Run the parser that applies in `context`.
    ///
    /// A default-rule declaration behaves the same in every context.
    pub fn parse_in(&self, raw: Option<&str>, context: Context) -> Result<T, CastError> {
        match &self.relaxed {
            Some(relaxed) if self.rule == Rule::Production && !context.is_production() => {
                relaxed(raw)
            }
            _ => self.parse(raw),
        }
    }

    /// Transform the parsed value, keeping the rule.
    pub fn map<U, G>(self, f: G) -> Declaration<U>
    where
        U: 'static,
        G: Fn(T) -> U + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        let parser = self.parser;
        let mapped = Arc::clone(&f);
        Declaration {
            rule: self.rule,
            parser: Arc::new(move |raw: Option<&str>| parser(raw).map(&*mapped)),
            relaxed: self.relaxed.map(|relaxed| -> Arc<ParserFn<U>> {
                Arc::new(move |raw: Option<&str>| relaxed(raw).map(&*f))
            }),
        }
    }
}

impl<T> Clone for Declaration<T> {
    fn clone(&self) -> Self {
        Self {
            rule: self.rule,
            parser: Arc::clone(&self.parser),
            relaxed: self.relaxed.clone(),
        }
    }
}

impl<T> fmt::Debug for Declaration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("rule", &self.rule)
            .field("relaxed", &self.relaxed.is_some())
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Declare a variable from a rule and a parser.
pub fn variable<T, F>(rule: Rule, parser: F) -> Declaration<T>
where
    T: 'static,
    F: Fn(Option<&str>) -> Result<T, CastError> + Send + Sync + 'static,
{
    Declaration::new(rule, parser)
}

/// Lift a value parser so that an absent value yields `None`.
pub fn maybe<T, F>(f: F) -> impl Fn(Option<&str>) -> Result<Option<T>, CastError> + Send + Sync + 'static
where
    F: Fn(&str) -> Result<T, CastError> + Send + Sync + 'static,
{
    move |raw: Option<&str>| raw.map(&f).transpose()
}

/// Lift a value parser so that an absent value is an error.
pub fn defined<T, F>(f: F) -> impl Fn(Option<&str>) -> Result<T, CastError> + Send + Sync + 'static
where
    F: Fn(&str) -> Result<T, CastError> + Send + Sync + 'static,
{
    move |raw: Option<&str>| match raw {
        Some(value) => f(value),
        None => Err(CastError::not_set()),
    }
}

/// Optional in all contexts.
pub fn optional<T, F>(f: F) -> Declaration<Option<T>>
where
    T: 'static,
    F: Fn(&str) -> Result<T, CastError> + Send + Sync + 'static,
{
    variable(Rule::Default, maybe(f))
}

/// Required in all contexts.
pub fn required<T, F>(f: F) -> Declaration<T>
where
    T: 'static,
    F: Fn(&str) -> Result<T, CastError> + Send + Sync + 'static,
{
    variable(Rule::Default, defined(f))
}

/// Required in production, where only the environment is consulted.
///
/// Outside production the variable is optional and falls back to file
/// sources like any other.
pub fn production<T, F>(f: F) -> Declaration<Option<T>>
where
    T: 'static,
    F: Fn(&str) -> Result<T, CastError> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let relaxed = Arc::clone(&f);
    let strict = defined(move |value: &str| f(value).map(Some));
    variable(Rule::Production, strict).otherwise(maybe(move |value: &str| relaxed(value)))
}
