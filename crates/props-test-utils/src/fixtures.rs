//! Paths to the shared `.properties` fixtures.

use std::path::PathBuf;

/// Directory holding the checked-in fixture files.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../test-fixtures/properties")
}

/// Path of a single fixture file.
///
/// # Panics
/// Panics if the fixture is missing.
pub fn fixture(name: &str) -> PathBuf {
    let path = fixtures_dir().join(name);
    assert!(path.exists(), "Missing fixture: {}", path.display());
    path
}
