//! Integration tests for assembling configurations from dotenv files

mod common;

use common::{project_dir, source, write_env_file};
use varconf::prelude::*;
use varconf::{ConfigError, ConfigLoader, DeclarationTable, Kind, Value};

varconf::variables! {
    #[derive(Debug)]
    struct TestConfig {
        a_string_value: Option<String> = "A_STRING_VALUE" => optional(string),
        a_boolean_value: Option<bool> = "A_BOOLEAN_VALUE" => optional(boolean),
        a_number_value: Option<f64> = "A_NUMBER_VALUE" => optional(number),
        an_empty_value: Option<String> = "AN_EMPTY_VALUE" => optional(string),
        port: Option<f64> = "PORT" => optional(number),
    }
}

varconf::variables! {
    #[derive(Debug)]
    struct RequiredConfig {
        a_required_string_value: String = "A_REQUIRED_STRING_VALUE" => required(string),
    }
}

varconf::variables! {
    #[derive(Debug)]
    struct ProductionConfig {
        a_string_value: Option<String> = "A_STRING_VALUE" => production(string),
    }
}

const CONFIG_FILE: &str = "\
A_STRING_VALUE=A_CONFIG_VALUE
A_BOOLEAN_VALUE=true
A_NUMBER_VALUE=123
AN_EMPTY_VALUE=
";

const DEFAULTS_FILE: &str = "\
A_STRING_VALUE=OVERRIDE_OF_THE_ACTUAL_VALUES_IN_ENV_DEFAULTS
PORT=3000
";

/// Loader rooted in `dir` with an empty environment.
fn loader(dir: &std::path::Path) -> ConfigLoader {
    ConfigLoader::new()
        .base_dir(dir)
        .environment(source(&[]))
}

// ------------------------------------------------------------------------
// File loading
// ------------------------------------------------------------------------

#[test]
fn test_loads_values_from_file() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.appconfig", CONFIG_FILE);

    let config: TestConfig = loader(dir.path()).file(".env.appconfig").load().unwrap();

    assert_eq!(config.a_string_value().as_deref(), Some("A_CONFIG_VALUE"));
    assert_eq!(*config.a_boolean_value(), Some(true));
    assert_eq!(*config.a_number_value(), Some(123.0));
}

#[test]
fn test_allows_empty_value() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.appconfig", CONFIG_FILE);

    let config: TestConfig = loader(dir.path()).file(".env.appconfig").load().unwrap();

    assert_eq!(config.an_empty_value().as_deref(), Some(""));
}

#[test]
fn test_missing_required_variable_fails() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.appconfig", CONFIG_FILE);
    write_env_file(dir.path(), ".env.defaults", DEFAULTS_FILE);

    let err = loader(dir.path())
        .file(".env.appconfig")
        .load::<RequiredConfig>()
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("A_REQUIRED_STRING_VALUE is invalid: environment variable is not set properly"));
    assert_eq!(err.combined().map(|c| c.len()), Some(1));
}

#[test]
fn test_earlier_file_wins() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.local", "A_STRING_VALUE=local\n");
    write_env_file(dir.path(), ".env", "A_STRING_VALUE=shared\nPORT=80\n");

    let config: TestConfig = loader(dir.path())
        .file(".env.local")
        .file(".env")
        .load()
        .unwrap();

    assert_eq!(config.a_string_value().as_deref(), Some("local"));
    assert_eq!(*config.port(), Some(80.0));
}

#[test]
fn test_environment_overrides_files() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env", CONFIG_FILE);

    let config: TestConfig = loader(dir.path())
        .environment(source(&[("A_STRING_VALUE", "from-env"), ("PORT", "9000")]))
        .load()
        .unwrap();

    assert_eq!(config.a_string_value().as_deref(), Some("from-env"));
    assert_eq!(*config.port(), Some(9000.0));
    assert_eq!(*config.a_number_value(), Some(123.0));
}

#[test]
fn test_default_files_follow_context_variable() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.staging", "A_STRING_VALUE=staging\n");
    write_env_file(dir.path(), ".env", "A_STRING_VALUE=base\nPORT=1\n");

    let config: TestConfig = ConfigLoader::new()
        .base_dir(dir.path())
        .environment(source(&[("APP_ENV", "staging")]))
        .load()
        .unwrap();

    assert_eq!(config.a_string_value().as_deref(), Some("staging"));
    assert_eq!(*config.port(), Some(1.0));
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env", "A_STRING_VALUE='unterminated\n");

    let err = loader(dir.path()).load::<TestConfig>().unwrap_err();

    assert!(matches!(err, ConfigError::File { .. }));
}

// ------------------------------------------------------------------------
// Defaults
// ------------------------------------------------------------------------

#[test]
fn test_defaults_do_not_override_file_values() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.appconfig", CONFIG_FILE);
    write_env_file(dir.path(), ".env.defaults", DEFAULTS_FILE);

    let config: TestConfig = loader(dir.path()).file(".env.appconfig").load().unwrap();

    assert_eq!(config.a_string_value().as_deref(), Some("A_CONFIG_VALUE"));
    assert_eq!(*config.port(), Some(3000.0));
}

#[test]
fn test_defaults_used_when_file_missing() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.defaults", DEFAULTS_FILE);

    let config: TestConfig = loader(dir.path()).file("does-not-exist").load().unwrap();

    assert_eq!(*config.port(), Some(3000.0));
    assert_eq!(
        config.a_string_value().as_deref(),
        Some("OVERRIDE_OF_THE_ACTUAL_VALUES_IN_ENV_DEFAULTS")
    );
}

#[test]
fn test_defaults_skipped_when_file_missing_and_disabled() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.defaults", DEFAULTS_FILE);

    let config: TestConfig = loader(dir.path())
        .file("does-not-exist")
        .include_defaults_on_missing_file(false)
        .load()
        .unwrap();

    assert_eq!(*config.port(), None);
}

#[test]
fn test_missing_defaults_file_leaves_keys_empty() {
    let dir = project_dir();

    let config: TestConfig = loader(dir.path())
        .file("does-not-exist")
        .defaults_file("also-missing")
        .load()
        .unwrap();

    assert_eq!(*config.port(), None);
    assert_eq!(*config.a_string_value(), None);
}

#[test]
fn test_no_defaults_file() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.defaults", DEFAULTS_FILE);

    let config: TestConfig = loader(dir.path()).no_defaults_file().load().unwrap();

    assert_eq!(*config.port(), None);
}

// ------------------------------------------------------------------------
// Production context
// ------------------------------------------------------------------------

#[test]
fn test_production_values_from_file_fail_in_production() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.appconfig", CONFIG_FILE);
    write_env_file(dir.path(), ".env.defaults", DEFAULTS_FILE);

    let err = loader(dir.path())
        .environment(source(&[("APP_ENV", "production")]))
        .file(".env.appconfig")
        .load::<ProductionConfig>()
        .unwrap_err();

    assert!(err
        .to_string()
        .contains("A_STRING_VALUE is invalid: environment variable is not set properly"));
}

#[test]
fn test_production_values_from_file_accepted_outside_production() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env.appconfig", CONFIG_FILE);

    let config: ProductionConfig = loader(dir.path())
        .file(".env.appconfig")
        .load()
        .unwrap();

    assert_eq!(config.a_string_value().as_deref(), Some("A_CONFIG_VALUE"));
}

#[test]
fn test_forced_context() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env", CONFIG_FILE);

    let result = loader(dir.path())
        .context(Context::Production)
        .load::<ProductionConfig>();

    assert!(result.is_err());
}

#[test]
fn test_custom_context_variable() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env", CONFIG_FILE);

    let loader = loader(dir.path())
        .context_variable("DEPLOYMENT")
        .production_marker("live")
        .environment(source(&[("DEPLOYMENT", "live")]));

    let sources = loader.sources().unwrap();
    assert_eq!(sources.context, Context::Production);
    assert!(loader.load::<ProductionConfig>().is_err());
}

// ------------------------------------------------------------------------
// Sources and dynamic tables
// ------------------------------------------------------------------------

#[test]
fn test_sources_report_files_read() {
    let dir = project_dir();
    let local = write_env_file(dir.path(), ".env.local", "A=1\n");
    write_env_file(dir.path(), ".env.defaults", "B=2\n");

    let sources = loader(dir.path())
        .file(".env.local")
        .file(".env.missing")
        .sources()
        .unwrap();

    assert_eq!(sources.files_read, vec![local]);
    assert_eq!(sources.file.get("A"), Some("1"));
    assert_eq!(sources.file.get("B"), Some("2"));
    assert_eq!(sources.context, Context::Development);
}

#[test]
fn test_load_table() {
    let dir = project_dir();
    write_env_file(dir.path(), ".env", "PORT=8080\nDEBUG=false\n");

    let table = DeclarationTable::new()
        .with("PORT", Kind::Number.declare(Rule::Default, true))
        .with("DEBUG", Kind::Bool.declare(Rule::Default, false));

    let resolved = loader(dir.path()).load_table(&table).unwrap();

    assert_eq!(resolved.get("PORT"), Some(&Some(Value::Number(8080.0))));
    assert_eq!(resolved.get("DEBUG"), Some(&Some(Value::Bool(false))));
}
