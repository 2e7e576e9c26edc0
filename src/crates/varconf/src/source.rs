//! Variable sources and the resolution context.
//!
//! A [`Source`] is a flat name to raw-value map. The process environment is
//! snapshotted once per process by [`environment_snapshot`]; later changes to
//! the environment are not seen by that snapshot.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Variable that selects the runtime context unless configured otherwise.
pub const DEFAULT_CONTEXT_VARIABLE: &str = "APP_ENV";

/// Value of the context variable that selects [`Context::Production`].
pub const PRODUCTION_MARKER: &str = "production";

/// A flat mapping from variable name to raw string value.
///
/// A key mapped to an empty string is present; only a missing key is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    vars: HashMap<String, String>,
}

impl Source {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the current process environment. Variables that are not valid
    /// unicode are skipped.
    pub fn from_env() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Whether `key` is present, including with an empty value.
    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(key.into(), value.into())
    }

    /// Copy entries from `other` whose keys are not yet present.
    ///
    /// Returns the number of keys added.
    pub fn fill_from(&mut self, other: &Source) -> usize {
        let mut added = 0;
        for (key, value) in &other.vars {
            if let hash_map::Entry::Vacant(slot) = self.vars.entry(key.clone()) {
                slot.insert(value.clone());
                added += 1;
            }
        }
        added
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the source holds no variables.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over `(name, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Variable names, sorted.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.vars.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Source {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Source {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.vars
            .extend(iter.into_iter().map(|(k, v)| (k.into(), v.into())));
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Source {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl From<HashMap<String, String>> for Source {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

/// Runtime mode deciding whether file sources may supply production variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    /// Production variables must come from the environment.
    Production,
    /// Any non-production mode.
    #[default]
    Development,
}

impl Context {
    /// Context for an indicator value: `Production` only when it equals
    /// `marker` exactly, otherwise `Development` (including unset).
    pub fn from_indicator(value: Option<&str>, marker: &str) -> Self {
        match value {
            Some(v) if v == marker => Context::Production,
            _ => Context::Development,
        }
    }

    /// Whether this is the production context.
    pub fn is_production(&self) -> bool {
        matches!(self, Context::Production)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Production => write!(f, "production"),
            Context::Development => write!(f, "development"),
        }
    }
}

impl FromStr for Context {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "production" => Ok(Context::Production),
            "development" => Ok(Context::Development),
            other => Err(format!(
                "Unknown context '{}', expected 'production' or 'development'",
                other
            )),
        }
    }
}

static ENVIRONMENT: RwLock<Option<Arc<Source>>> = parking_lot::const_rwlock(None);

/// Snapshot of the process environment, taken on first call and shared afterwards.
pub fn environment_snapshot() -> Arc<Source> {
    if let Some(snapshot) = ENVIRONMENT.read().as_ref() {
        return Arc::clone(snapshot);
    }

    let mut slot = ENVIRONMENT.write();
    let snapshot = slot.get_or_insert_with(|| {
        let source = Source::from_env();
        debug!(variables = source.len(), "Captured process environment snapshot");
        Arc::new(source)
    });
    Arc::clone(snapshot)
}

/// Drop the cached environment snapshot so the next call re-reads it.
///
/// Only meant for test isolation.
#[doc(hidden)]
pub fn reset_environment_snapshot() {
    *ENVIRONMENT.write() = None;
}
