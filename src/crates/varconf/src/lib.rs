//! Typed configuration from environment variables and dotenv files.
//!
//! `varconf` resolves a fixed set of declared variables into an immutable,
//! strongly typed configuration. Each variable is declared with a rule and a
//! parser:
//!
//! - [`required`] variables must be set in every context
//! - [`optional`] variables resolve to `None` when unset
//! - [`production`] variables must be set in production, and there they are
//!   only read from the environment, never from files. Elsewhere they are
//!   optional
//!
//! The environment always takes precedence over files. All missing or invalid
//! variables of one run are reported together in a
//! [`CombinedResolutionError`].
//!
//! # Modules
//!
//! ## Declarations (`declaration`, `parsers`)
//!
//! ```rust
//! use varconf::prelude::*;
//!
//! varconf::variables! {
//!     #[derive(Debug)]
//!     pub struct AppConfig {
//!         api_key: Option<String> = "API_KEY" => production(string),
//!         debug: Option<bool> = "DEBUG" => optional(boolean),
//!         workers: u16 = "WORKERS" => required(parsed::<u16>),
//!     }
//! }
//!
//! let env = Source::from([("WORKERS", "4")]);
//! let file = Source::from([("API_KEY", "dev-key"), ("DEBUG", "true")]);
//!
//! let config = AppConfig::resolve(&env, &file, Context::Development).unwrap();
//! assert_eq!(config.api_key().as_deref(), Some("dev-key"));
//! assert_eq!(*config.workers(), 4);
//!
//! // In production the file value for API_KEY is not accepted.
//! let err = AppConfig::resolve(&env, &file, Context::Production).unwrap_err();
//! assert!(err.to_string().contains("API_KEY is invalid: environment variable is not set properly"));
//! ```
//!
//! ## Resolution (`resolver`)
//!
//! [`resolve`] works on runtime-built [`DeclarationTable`]s, and
//! [`Resolver`] drives per-key resolution for generated types.
//!
//! ## Loading (`loader`)
//!
//! [`ConfigLoader`] snapshots the process environment, merges dotenv files
//! with a defaults file, detects the [`Context`] and resolves.
//!
//! # Features
//!
//! - `loader` - dotenv file loading (enabled by default)

pub mod declaration;
pub mod error;
pub mod parsers;
pub mod resolver;
pub mod source;
pub mod value;

mod macros;

#[cfg(feature = "loader")]
pub mod loader;

// Re-export commonly used types
pub use declaration::{
    defined, maybe, optional, production, required, variable, Declaration, Rule,
};
pub use error::{
    CastError, CombinedResolutionError, ConfigError, ParseError, ResolveError, Result,
    NOT_SET_MESSAGE,
};
pub use resolver::{
    resolve, DeclarationTable, Origin, ResolvedConfiguration, Resolver, Sources, Variables,
};
pub use source::{
    environment_snapshot, reset_environment_snapshot, Context, Source,
    DEFAULT_CONTEXT_VARIABLE, PRODUCTION_MARKER,
};
pub use value::{Kind, Value};

#[cfg(feature = "loader")]
pub use loader::{read_dotenv, ConfigLoader, LoadedSources, LoaderOptions};

/// Everything needed to declare and resolve variables.
pub mod prelude {
    pub use crate::declaration::{optional, production, required, variable, Rule};
    pub use crate::parsers::{boolean, number, one_of, parsed, string, url, url_string};
    pub use crate::resolver::Variables;
    pub use crate::source::{Context, Source};
}
