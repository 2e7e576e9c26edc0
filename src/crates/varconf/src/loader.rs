//! Configuration assembly from the process environment and dotenv files.
//!
//! The file source is built from a list of dotenv files plus an optional
//! defaults file:
//! - files are read in order and the first file defining a key wins
//! - missing files are skipped
//! - the defaults file only fills keys no listed file defines
//! - when no listed file exists, defaults are read only if
//!   `include_defaults_on_missing_file` is set
//!
//! Relative paths resolve against `base_dir`, or the working directory.
//! Values are read literally. A `$NAME` in a file is never expanded, so a
//! file cannot pull in process environment values through a reference.
//!
//! # Example
//!
//! ```rust,no_run
//! use varconf::prelude::*;
//! use varconf::ConfigLoader;
//!
//! varconf::variables! {
//!     pub struct AppConfig {
//!         database_url: String = "DATABASE_URL" => required(url_string),
//!         api_key: Option<String> = "API_KEY" => production(string),
//!         port: Option<f64> = "PORT" => optional(number),
//!     }
//! }
//!
//! let config: AppConfig = ConfigLoader::new()
//!     .file(".env.local")
//!     .file(".env")
//!     .defaults_file(".env.defaults")
//!     .load()?;
//! println!("database at {}", config.database_url());
//! # Ok::<(), varconf::ConfigError>(())
//! ```

use crate::error::{ConfigError, ResolveError, Result};
use crate::resolver::{self, DeclarationTable, ResolvedConfiguration, Sources, Variables};
use crate::source::{
    environment_snapshot, Context, Source, DEFAULT_CONTEXT_VARIABLE, PRODUCTION_MARKER,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default dotenv file read after any context-specific file.
pub const DEFAULT_FILE: &str = ".env";

/// Default defaults file.
pub const DEFAULT_DEFAULTS_FILE: &str = ".env.defaults";

/// Options controlling where variables are loaded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Dotenv files, most authoritative first. `None` selects
    /// `.env.<context value>` (when the context variable is set) and `.env`.
    pub files: Option<Vec<PathBuf>>,

    /// File filling keys absent from all `files`. `None` disables defaults.
    pub defaults_file: Option<PathBuf>,

    /// Read the defaults file even when none of `files` exists.
    pub include_defaults_on_missing_file: bool,

    /// Directory relative paths resolve against.
    pub base_dir: Option<PathBuf>,

    /// Environment variable selecting the runtime context.
    pub context_variable: String,

    /// Value of `context_variable` meaning production.
    pub production_marker: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            files: None,
            defaults_file: Some(PathBuf::from(DEFAULT_DEFAULTS_FILE)),
            include_defaults_on_missing_file: true,
            base_dir: None,
            context_variable: DEFAULT_CONTEXT_VARIABLE.to_string(),
            production_marker: PRODUCTION_MARKER.to_string(),
        }
    }
}

/// Sources gathered for one resolution run.
#[derive(Debug, Clone)]
pub struct LoadedSources {
    /// Process environment (or the injected replacement).
    pub environment: Arc<Source>,
    /// Merged dotenv files and defaults.
    pub file: Source,
    /// Detected or forced context.
    pub context: Context,
    /// Files that existed and were read, in precedence order.
    pub files_read: Vec<PathBuf>,
}

impl LoadedSources {
    /// Borrow as resolver input.
    pub fn as_sources(&self) -> Sources<'_> {
        Sources::new(&self.environment, &self.file, self.context)
    }
}

/// Builder that gathers sources and resolves a configuration from them.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
    environment: Option<Arc<Source>>,
    context: Option<Context>,
}

impl ConfigLoader {
    /// Loader with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader with explicit options.
    pub fn with_options(options: LoaderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Current options.
    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Append a dotenv file. The first call replaces the default file list.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options
            .files
            .get_or_insert_with(Vec::new)
            .push(path.into());
        self
    }

    /// Replace the dotenv file list.
    pub fn files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.options.files = Some(paths.into_iter().map(Into::into).collect());
        self
    }

    /// Set the defaults file.
    pub fn defaults_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.defaults_file = Some(path.into());
        self
    }

    /// Do not read any defaults file.
    pub fn no_defaults_file(mut self) -> Self {
        self.options.defaults_file = None;
        self
    }

    /// Whether defaults are read when none of the listed files exists.
    pub fn include_defaults_on_missing_file(mut self, include: bool) -> Self {
        self.options.include_defaults_on_missing_file = include;
        self
    }

    /// Directory relative paths resolve against.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.options.base_dir = Some(dir.into());
        self
    }

    /// Environment variable selecting the context.
    pub fn context_variable(mut self, name: impl Into<String>) -> Self {
        self.options.context_variable = name.into();
        self
    }

    /// Value of the context variable meaning production.
    pub fn production_marker(mut self, marker: impl Into<String>) -> Self {
        self.options.production_marker = marker.into();
        self
    }

    /// Use `environment` instead of the process environment snapshot.
    pub fn environment(mut self, environment: Source) -> Self {
        self.environment = Some(Arc::new(environment));
        self
    }

    /// Force the context instead of detecting it.
    pub fn context(mut self, context: Context) -> Self {
        self.context = Some(context);
        self
    }

    /// The environment source used by this loader.
    pub fn environment_source(&self) -> Arc<Source> {
        match &self.environment {
            Some(environment) => Arc::clone(environment),
            None => environment_snapshot(),
        }
    }

    /// The context used for `environment`: forced, or read from the context variable.
    pub fn detect_context(&self, environment: &Source) -> Context {
        self.context.unwrap_or_else(|| {
            Context::from_indicator(
                environment.get(&self.options.context_variable),
                &self.options.production_marker,
            )
        })
    }

    /// Dotenv files to consult, most authoritative first, as absolute paths.
    pub fn config_files(&self, environment: &Source) -> Result<Vec<PathBuf>> {
        let files = match &self.options.files {
            Some(files) => files.clone(),
            None => {
                let mut files = Vec::with_capacity(2);
                if let Some(mode) = environment.get(&self.options.context_variable) {
                    files.push(PathBuf::from(format!("{}.{}", DEFAULT_FILE, mode)));
                }
                files.push(PathBuf::from(DEFAULT_FILE));
                files
            }
        };

        files.iter().map(|path| self.absolute(path)).collect()
    }

    /// Build the merged file source.
    pub fn load_file_source(&self, environment: &Source) -> Result<(Source, Vec<PathBuf>)> {
        let mut merged = Source::new();
        let mut files_read = Vec::new();

        for path in self.config_files(environment)? {
            if !path.is_file() {
                debug!(path = %path.display(), "Variable file not found, skipping");
                continue;
            }
            let vars = read_dotenv(&path)?;
            let added = merged.fill_from(&vars);
            debug!(path = %path.display(), variables = vars.len(), added, "Loaded variable file");
            files_read.push(path);
        }

        if let Some(defaults) = &self.options.defaults_file {
            let defaults = self.absolute(defaults)?;
            if files_read.is_empty() && !self.options.include_defaults_on_missing_file {
                debug!(path = %defaults.display(), "No variable file found, not reading defaults");
            } else if defaults.is_file() {
                let vars = read_dotenv(&defaults)?;
                let added = merged.fill_from(&vars);
                debug!(path = %defaults.display(), added, "Applied defaults file");
            } else {
                debug!(path = %defaults.display(), "Defaults file not found");
            }
        }

        Ok((merged, files_read))
    }

    /// Gather the environment, file source and context.
    pub fn sources(&self) -> Result<LoadedSources> {
        let environment = self.environment_source();
        let context = self.detect_context(&environment);
        let (file, files_read) = self.load_file_source(&environment)?;

        Ok(LoadedSources {
            environment,
            file,
            context,
            files_read,
        })
    }

    /// Load a configuration type declared with [`variables!`](crate::variables).
    pub fn load<V: Variables>(&self) -> Result<V> {
        let sources = self.sources()?;
        let result = V::from_sources(sources.as_sources());
        self.report(&sources, V::keys().len(), result.as_ref().err());
        result.map_err(ConfigError::from)
    }

    /// Load a runtime-built declaration table.
    pub fn load_table<T: 'static>(
        &self,
        declarations: &DeclarationTable<T>,
    ) -> Result<ResolvedConfiguration<T>> {
        let sources = self.sources()?;
        let result = resolver::resolve(
            declarations,
            &sources.environment,
            &sources.file,
            sources.context,
        );
        self.report(&sources, declarations.len(), result.as_ref().err());
        result.map_err(ConfigError::from)
    }

    fn report(
        &self,
        sources: &LoadedSources,
        declared: usize,
        error: Option<&ResolveError>,
    ) {
        match error {
            None => info!(
                context = %sources.context,
                variables = declared,
                files = sources.files_read.len(),
                "Configuration loaded"
            ),
            Some(err) => warn!(
                context = %sources.context,
                errors = err.combined().map(|c| c.len()).unwrap_or(1),
                "Configuration failed to load"
            ),
        }
    }

    fn absolute(&self, path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }
        let base = match &self.options.base_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => std::env::current_dir()?.join(dir),
            None => std::env::current_dir()?,
        };
        Ok(base.join(path))
    }
}

/// Read one dotenv file into a source.
///
/// Values are taken as written: `$NAME` and `${NAME}` are not expanded
/// against earlier keys or the process environment.
pub fn read_dotenv(path: &Path) -> Result<Source> {
    let to_error = |source: dotenvy::Error| ConfigError::File {
        path: path.to_path_buf(),
        source,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| to_error(dotenvy::Error::Io(e)))?;
    let literal = escape_substitutions(&contents);

    let mut vars = Source::new();
    for item in dotenvy::from_read_iter(literal.as_bytes()) {
        let (key, value) = item.map_err(to_error)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

/// Escape every `$` that dotenvy would treat as the start of a substitution.
///
/// Single-quoted text, already escaped characters and comments are copied
/// unchanged.
fn escape_substitutions(contents: &str) -> String {
    let mut out = String::with_capacity(contents.len());
    let mut strong = false;
    let mut weak = false;
    let mut escaped = false;
    let mut comment = false;
    let mut after_space = true;

    for c in contents.strip_prefix('\u{feff}').unwrap_or(contents).chars() {
        if comment {
            comment = c != '\n';
            after_space = true;
        } else if escaped {
            escaped = false;
            after_space = false;
        } else if strong {
            strong = c != '\'';
        } else if weak {
            match c {
                '\\' => escaped = true,
                '"' => weak = false,
                '$' => out.push('\\'),
                _ => {}
            }
        } else {
            match c {
                '#' if after_space => comment = true,
                '\\' => escaped = true,
                '\'' => strong = true,
                '"' => weak = true,
                '$' => out.push('\\'),
                _ => {}
            }
            after_space = c.is_whitespace();
        }
        out.push(c);
    }
    out
}
