//! Common test utilities and setup

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use varconf::Source;

/// Build a source from `(name, value)` pairs.
pub fn source(pairs: &[(&str, &str)]) -> Source {
    pairs.iter().copied().collect()
}

/// Create a temporary project directory
pub fn project_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Write a dotenv file into `dir` and return its path
pub fn write_env_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("Failed to write env file");
    path
}
