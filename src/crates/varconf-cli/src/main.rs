//! varconf CLI
//!
//! Check ad hoc variable declarations against the environment and dotenv
//! files, or inspect what the files contribute.

mod commands;

use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::VariableSpec;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use varconf::{ConfigLoader, Context, DEFAULT_CONTEXT_VARIABLE, PRODUCTION_MARKER};

#[derive(Parser)]
#[command(name = "varconf")]
#[command(about = "Resolve and check configuration variables", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the given variables and report every failure
    Check {
        #[command(flatten)]
        sources: SourceArgs,

        /// Force the context instead of reading it from the environment
        #[arg(long)]
        context: Option<Context>,

        /// Variable required in every context, as KEY[:type]
        #[arg(short, long = "require", value_name = "KEY[:TYPE]")]
        require: Vec<VariableSpec>,

        /// Variable that may be unset, as KEY[:type]
        #[arg(short, long = "optional", value_name = "KEY[:TYPE]")]
        optional: Vec<VariableSpec>,

        /// Variable that must come from the environment in production, as KEY[:type]
        #[arg(short, long = "production", value_name = "KEY[:TYPE]")]
        production: Vec<VariableSpec>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Show the merged file variables and the detected context
    Sources {
        #[command(flatten)]
        sources: SourceArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

/// Where variables are read from.
#[derive(Args, Debug, Clone)]
struct SourceArgs {
    /// Dotenv file, most authoritative first (repeatable)
    #[arg(short, long = "file", value_name = "PATH")]
    files: Vec<PathBuf>,

    /// File filling keys no other file defines
    #[arg(long, value_name = "PATH")]
    defaults: Option<PathBuf>,

    /// Skip the defaults file when none of the files exists
    #[arg(long)]
    no_defaults_on_missing: bool,

    /// Directory relative paths resolve against
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Variable selecting the context
    #[arg(long, env = "VARCONF_CONTEXT_VARIABLE", default_value = DEFAULT_CONTEXT_VARIABLE)]
    context_variable: String,

    /// Value of the context variable meaning production
    #[arg(long, default_value = PRODUCTION_MARKER)]
    production_marker: String,
}

impl SourceArgs {
    fn loader(&self) -> ConfigLoader {
        let mut loader = ConfigLoader::new()
            .include_defaults_on_missing_file(!self.no_defaults_on_missing)
            .context_variable(&self.context_variable)
            .production_marker(&self.production_marker);
        if !self.files.is_empty() {
            loader = loader.files(self.files.iter().cloned());
        }
        if let Some(defaults) = &self.defaults {
            loader = loader.defaults_file(defaults);
        }
        if let Some(dir) = &self.base_dir {
            loader = loader.base_dir(dir);
        }
        loader
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Check {
            sources,
            context,
            require,
            optional,
            production,
            format,
        } => {
            let mut loader = sources.loader();
            if let Some(context) = context {
                loader = loader.context(context);
            }
            let table = commands::declaration_table(&require, &optional, &production);
            if !commands::check(&loader, &table, format, &mut stdout)? {
                stdout.flush()?;
                std::process::exit(1);
            }
        }
        Commands::Sources { sources, format } => {
            commands::sources(&sources.loader(), format, &mut stdout)?;
        }
    }

    Ok(())
}
