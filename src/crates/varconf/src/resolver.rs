//! Resolution engine.
//!
//! Resolves declared variables against an environment source and a file
//! source. For each key the candidate sources depend only on the key's
//! [`Rule`] and the [`Context`]:
//!
//! | Rule         | Context       | Candidates             |
//! |--------------|---------------|------------------------|
//! | `Default`    | any           | environment, then file |
//! | `Production` | `Production`  | environment only       |
//! | `Production` | `Development` | environment, then file |
//!
//! The first candidate containing the key supplies the raw value. Invalid and
//! missing values are collected so that one run reports every failing key.

use crate::declaration::{Declaration, Rule};
use crate::error::{CastError, CombinedResolutionError, ParseError, ResolveError};
use crate::source::{Context, Source};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use tracing::{debug, trace};

/// Where a resolved raw value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The environment source.
    Environment,
    /// The file source.
    File,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Environment => write!(f, "environment"),
            Origin::File => write!(f, "file"),
        }
    }
}

/// The inputs of one resolution run.
#[derive(Debug, Clone, Copy)]
pub struct Sources<'a> {
    /// Highest-authority source, always consulted.
    pub environment: &'a Source,
    /// Fallback source, skipped for production variables in production.
    pub file: &'a Source,
    /// Active runtime context.
    pub context: Context,
}

impl<'a> Sources<'a> {
    /// Bundle the sources for a run.
    pub fn new(environment: &'a Source, file: &'a Source, context: Context) -> Self {
        Self {
            environment,
            file,
            context,
        }
    }

    /// Candidate sources for a variable with `rule`, most authoritative first.
    pub fn candidates(&self, rule: Rule) -> impl Iterator<Item = (Origin, &'a Source)> {
        let file = match rule {
            Rule::Production if self.context.is_production() => None,
            _ => Some((Origin::File, self.file)),
        };
        std::iter::once((Origin::Environment, self.environment)).chain(file)
    }

    /// Raw value for `key` from the first candidate that contains it.
    pub fn lookup(&self, key: &str, rule: Rule) -> Option<(Origin, &'a str)> {
        self.candidates(rule)
            .find_map(|(origin, source)| source.get(key).map(|value| (origin, value)))
    }
}

/// Resolves variables one at a time, collecting per-key failures.
///
/// Used by [`resolve`] and by types generated with
/// [`variables!`](crate::variables).
#[derive(Debug)]
pub struct Resolver<'a> {
    sources: Sources<'a>,
    errors: Vec<ParseError>,
}

impl<'a> Resolver<'a> {
    /// Start a resolution run.
    pub fn new(sources: Sources<'a>) -> Self {
        Self {
            sources,
            errors: Vec::new(),
        }
    }

    /// Resolve one variable.
    ///
    /// Returns `Ok(None)` when the value was missing or invalid; the failure is
    /// recorded and reported by [`Resolver::finish`]. A parser fault aborts
    /// with [`ResolveError::Parser`].
    pub fn resolve<T: 'static>(
        &mut self,
        key: &str,
        declaration: &Declaration<T>,
    ) -> Result<Option<T>, ResolveError> {
        Ok(self
            .resolve_with_origin(key, declaration)?
            .map(|(value, _)| value))
    }

    /// Like [`Resolver::resolve`], also reporting which source supplied the raw value.
    pub fn resolve_with_origin<T: 'static>(
        &mut self,
        key: &str,
        declaration: &Declaration<T>,
    ) -> Result<Option<(T, Option<Origin>)>, ResolveError> {
        let found = self.sources.lookup(key, declaration.rule());
        let origin = found.map(|(origin, _)| origin);

        match declaration.parse_in(found.map(|(_, raw)| raw), self.sources.context) {
            Ok(value) => {
                trace!(key, rule = %declaration.rule(), origin = ?origin, "Resolved variable");
                Ok(Some((value, origin)))
            }
            Err(CastError::Invalid(message)) => {
                debug!(key, rule = %declaration.rule(), origin = ?origin, "Variable is invalid");
                self.errors.push(ParseError::new(key, message));
                Ok(None)
            }
            Err(CastError::Fault(source)) => Err(ResolveError::Parser {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Failures recorded so far.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// End the run: `Ok` if every variable resolved.
    pub fn finish(self) -> Result<(), ResolveError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }

    /// The recorded failures as a combined error.
    pub fn into_error(self) -> ResolveError {
        debug!(errors = self.errors.len(), "Variable resolution failed");
        ResolveError::Combined(CombinedResolutionError::new(self.errors))
    }
}

/// An ordered table of declarations sharing one value type.
///
/// Mixed value types can share a table by mapping into a common type, see
/// [`Value`](crate::Value).
pub struct DeclarationTable<T> {
    entries: Vec<(String, Declaration<T>)>,
}

impl<T> Clone for DeclarationTable<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> fmt::Debug for DeclarationTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, d)| (k, d)))
            .finish()
    }
}

impl<T> Default for DeclarationTable<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: 'static> DeclarationTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration, builder style.
    pub fn with(mut self, key: impl Into<String>, declaration: Declaration<T>) -> Self {
        self.insert(key, declaration);
        self
    }

    /// Add a declaration. Redeclaring a key replaces it in place.
    pub fn insert(&mut self, key: impl Into<String>, declaration: Declaration<T>) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = declaration,
            None => self.entries.push((key, declaration)),
        }
    }

    /// Declaration for `key`.
    pub fn get(&self, key: &str) -> Option<&Declaration<T>> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, declaration)| declaration)
    }

    /// Declared keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, declaration)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Declaration<T>)> {
        self.entries.iter().map(|(k, d)| (k.as_str(), d))
    }

    /// Number of declared keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, T: 'static> FromIterator<(K, Declaration<T>)> for DeclarationTable<T> {
    fn from_iter<I: IntoIterator<Item = (K, Declaration<T>)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (key, declaration) in iter {
            table.insert(key, declaration);
        }
        table
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry<T> {
    key: String,
    value: T,
    origin: Option<Origin>,
}

/// Immutable result of resolving a [`DeclarationTable`].
///
/// Holds exactly one value per declared key, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfiguration<T> {
    entries: Vec<Entry<T>>,
}

impl<T> ResolvedConfiguration<T> {
    /// Value resolved for `key`.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.entry(key).map(|e| &e.value)
    }

    /// Source that supplied the raw value for `key`; `None` if the key is
    /// unknown or no source held it.
    pub fn origin(&self, key: &str) -> Option<Origin> {
        self.entry(key).and_then(|e| e.origin)
    }

    /// `(key, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.value))
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Number of resolved keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no keys were declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &str) -> Option<&Entry<T>> {
        self.entries.iter().find(|e| e.key == key)
    }
}

impl<T: Serialize> Serialize for ResolvedConfiguration<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.key, &entry.value)?;
        }
        map.end()
    }
}

/// Resolve every declaration in `declarations`.
///
/// Fails with [`ResolveError::Combined`] listing every missing or invalid
/// key, or with [`ResolveError::Parser`] as soon as a parser faults.
pub fn resolve<T: 'static>(
    declarations: &DeclarationTable<T>,
    environment: &Source,
    file: &Source,
    context: Context,
) -> Result<ResolvedConfiguration<T>, ResolveError> {
    let mut resolver = Resolver::new(Sources::new(environment, file, context));
    let mut entries = Vec::with_capacity(declarations.len());

    for (key, declaration) in declarations.iter() {
        if let Some((value, origin)) = resolver.resolve_with_origin(key, declaration)? {
            entries.push(Entry {
                key: key.to_string(),
                value,
                origin,
            });
        }
    }

    resolver.finish()?;
    Ok(ResolvedConfiguration { entries })
}

/// A configuration type with a fixed set of declared variables.
///
/// Implemented by types generated with [`variables!`](crate::variables).
pub trait Variables: Sized {
    /// Declared variable names in declaration order.
    fn keys() -> &'static [&'static str];

    /// Resolve every declared variable against `sources`.
    fn from_sources(sources: Sources<'_>) -> Result<Self, ResolveError>;

    /// Resolve against explicit sources and context.
    fn resolve(environment: &Source, file: &Source, context: Context) -> Result<Self, ResolveError> {
        Self::from_sources(Sources::new(environment, file, context))
    }
}
