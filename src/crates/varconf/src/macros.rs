//! The [`variables!`](crate::variables) macro.

/// Declare a configuration type whose fields are resolved from variables.
///
/// Each field names the variable it reads and the declaration used to parse
/// it; the field type is the declaration's value type. The generated struct
/// has private fields and a read-only accessor per field, and implements
/// [`Variables`](crate::Variables). Declarations are built once per process
/// and reused by every resolution.
///
/// ```rust
/// use varconf::prelude::*;
///
/// varconf::variables! {
///     /// Server settings.
///     #[derive(Debug, Clone)]
///     pub struct ServerConfig {
///         /// Public base URL.
///         base_url: String = "BASE_URL" => required(url_string),
///         port: Option<f64> = "PORT" => optional(number),
///         api_key: Option<String> = "API_KEY" => production(string),
///     }
/// }
///
/// let env = Source::from([("BASE_URL", "https://example.com"), ("API_KEY", "secret")]);
/// let file = Source::from([("PORT", "8080")]);
///
/// let config = ServerConfig::resolve(&env, &file, Context::Development).unwrap();
/// assert_eq!(config.base_url(), "https://example.com/");
/// assert_eq!(*config.port(), Some(8080.0));
/// assert_eq!(ServerConfig::keys(), &["BASE_URL", "PORT", "API_KEY"]);
/// ```
#[macro_export]
macro_rules! variables {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field:ident : $ty:ty = $key:literal => $declaration:expr
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $field: $ty, )*
        }

        impl $name {
            $(
                $(#[$field_meta])*
                #[allow(dead_code)]
                pub fn $field(&self) -> &$ty {
                    &self.$field
                }
            )*
        }

        impl $crate::Variables for $name {
            fn keys() -> &'static [&'static str] {
                &[$($key),*]
            }

            #[allow(unused_mut, irrefutable_let_patterns)]
            fn from_sources(
                sources: $crate::Sources<'_>,
            ) -> ::std::result::Result<Self, $crate::ResolveError> {
                let mut resolver = $crate::Resolver::new(sources);
                // Fields are bound only after every declaration has been evaluated.
                let resolved = ($(
                    {
                        static DECLARATION: ::std::sync::OnceLock<$crate::Declaration<$ty>> =
                            ::std::sync::OnceLock::new();
                        resolver.resolve($key, DECLARATION.get_or_init(|| $declaration))?
                    },
                )*);
                let ($(::std::option::Option::Some($field),)*) = resolved else {
                    return ::std::result::Result::Err(resolver.into_error());
                };
                ::std::result::Result::Ok(Self { $($field),* })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    crate::variables! {
        #[derive(Debug, Clone, PartialEq)]
        struct TestConfig {
            name: String = "NAME" => required(string),
            enabled: Option<bool> = "ENABLED" => optional(boolean),
            port: Option<f64> = "PORT" => production(number),
        }
    }

    crate::variables! {
        struct Empty {}
    }

    crate::variables! {
        #[derive(Debug)]
        struct ParserNamedFields {
            url: url::Url = "URL" => required(url),
            backup: Option<url::Url> = "BACKUP_URL" => optional(url),
            string: String = "NAME" => required(string),
            label: Option<String> = "LABEL" => optional(string),
        }
    }

    #[test]
    fn test_resolves_all_fields() {
        let env = Source::from([("NAME", "svc"), ("PORT", "80")]);
        let config = TestConfig::resolve(&env, &Source::new(), Context::Production).unwrap();

        assert_eq!(config.name(), "svc");
        assert_eq!(*config.enabled(), None);
        assert_eq!(*config.port(), Some(80.0));
    }

    #[test]
    fn test_collects_every_failure() {
        let env = Source::from([("ENABLED", "yes")]);
        let file = Source::from([("PORT", "80")]);

        let err = TestConfig::resolve(&env, &file, Context::Production).unwrap_err();
        let combined = err.combined().unwrap();
        assert_eq!(combined.keys().collect::<Vec<_>>(), vec!["NAME", "ENABLED", "PORT"]);
    }

    #[test]
    fn test_keys_in_declaration_order() {
        assert_eq!(TestConfig::keys(), &["NAME", "ENABLED", "PORT"]);
        assert!(Empty::keys().is_empty());
    }

    #[test]
    fn test_empty_config_resolves() {
        assert!(Empty::resolve(&Source::new(), &Source::new(), Context::Production).is_ok());
    }

    #[test]
    fn test_fields_named_like_parsers() {
        let env = Source::from([
            ("URL", "https://primary.example.com"),
            ("BACKUP_URL", "https://backup.example.com"),
            ("NAME", "svc"),
        ]);
        let config =
            ParserNamedFields::resolve(&env, &Source::new(), Context::Development).unwrap();

        assert_eq!(config.url().host_str(), Some("primary.example.com"));
        assert_eq!(
            config.backup().as_ref().and_then(|u| u.host_str()),
            Some("backup.example.com")
        );
        assert_eq!(config.string(), "svc");
        assert_eq!(*config.label(), None);
    }
}
