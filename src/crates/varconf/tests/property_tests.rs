//! Property tests for parsing and resolution invariants

mod common;

use common::source;
use proptest::prelude::*;
use std::collections::BTreeSet;
use varconf::declaration::maybe;
use varconf::prelude::*;
use varconf::{resolve, DeclarationTable, Origin};

fn key() -> impl Strategy<Value = String> {
    "[A-Z][A-Z0-9_]{0,12}"
}

fn keys() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(key(), 1..8)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// The environment wins over files for every default-rule variable.
    #[test]
    fn environment_takes_precedence(key in key(), env_value in ".*", file_value in ".*") {
        let table = DeclarationTable::new().with(key.clone(), variable(Rule::Default, maybe(string)));
        let env = source(&[(key.as_str(), env_value.as_str())]);
        let file = source(&[(key.as_str(), file_value.as_str())]);

        for context in [Context::Development, Context::Production] {
            let resolved = resolve(&table, &env, &file, context).unwrap();
            prop_assert_eq!(resolved.get(&key), Some(&Some(env_value.clone())));
            prop_assert_eq!(resolved.origin(&key), Some(Origin::Environment));
        }
    }

    /// Production variables never read files in production.
    #[test]
    fn production_ignores_files(key in key(), file_value in ".*") {
        let table = DeclarationTable::new().with(key.clone(), variable(Rule::Production, maybe(string)));
        let file = source(&[(key.as_str(), file_value.as_str())]);

        let resolved = resolve(&table, &source(&[]), &file, Context::Production).unwrap();
        prop_assert_eq!(resolved.get(&key), Some(&None));

        let resolved = resolve(&table, &source(&[]), &file, Context::Development).unwrap();
        prop_assert_eq!(resolved.get(&key), Some(&Some(file_value)));
    }

    /// Every missing required variable is reported, in declaration order.
    #[test]
    fn missing_required_variables_are_all_reported(keys in keys()) {
        let table: DeclarationTable<String> =
            keys.iter().map(|key| (key.clone(), required(string))).collect();

        let err = resolve(&table, &source(&[]), &source(&[]), Context::Development).unwrap_err();
        let combined = err.combined().unwrap();

        prop_assert_eq!(combined.len(), keys.len());
        prop_assert_eq!(
            combined.keys().collect::<Vec<_>>(),
            keys.iter().map(String::as_str).collect::<Vec<_>>()
        );
        let expected = format!("There were {} errors while parsing.", keys.len());
        prop_assert!(err.to_string().starts_with(&expected));
    }

    /// Only the exact strings `true` and `false` are booleans.
    #[test]
    fn boolean_rejects_anything_else(value in ".*") {
        prop_assume!(value != "true" && value != "false");
        prop_assert!(boolean(&value).is_err());
    }

    /// Finite numbers survive formatting and parsing, surrounding whitespace included.
    #[test]
    fn number_accepts_finite_values(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
        prop_assert_eq!(number(&value.to_string()).unwrap(), value);
        prop_assert_eq!(number(&format!("  {}\t", value)).unwrap(), value);
    }

    /// Resolution leaves its inputs untouched and gives the same answer twice.
    #[test]
    fn resolution_is_repeatable(keys in keys(), value in "[a-z0-9]{0,8}") {
        let table: DeclarationTable<Option<String>> =
            keys.iter().map(|key| (key.clone(), optional(string))).collect();
        let env: Source = keys.iter().step_by(2).map(|key| (key.clone(), value.clone())).collect();
        let file: Source = keys.iter().map(|key| (key.clone(), "file".to_string())).collect();
        let (env_before, file_before) = (env.clone(), file.clone());

        let first = resolve(&table, &env, &file, Context::Production).unwrap();
        let second = resolve(&table, &env, &file, Context::Production).unwrap();

        prop_assert_eq!(
            first.iter().collect::<Vec<_>>(),
            second.iter().collect::<Vec<_>>()
        );
        prop_assert_eq!(env, env_before);
        prop_assert_eq!(file, file_before);
    }
}
