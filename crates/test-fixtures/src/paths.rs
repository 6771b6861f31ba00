//! Path utilities for locating larger on-disk test fixtures.
//!
//! Most fixtures in this crate are generated in-memory (§4.16); this module
//! exists for the rare larger binary fixture a crate wants to keep on disk
//! under its own `testdata/` directory instead of inlined in source.

use std::path::PathBuf;

/// Returns the workspace root directory, walking up from this crate's
/// manifest directory.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir)
        .parent() // crates/
        .and_then(|p| p.parent()) // workspace root
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from(manifest_dir))
}

/// Returns the path to `crates/{crate_name}/testdata/`.
pub fn crate_testdata_dir(crate_name: &str) -> PathBuf {
    workspace_root()
        .join("crates")
        .join(crate_name)
        .join("testdata")
}

/// Searches for a test file across this workspace's crates' `testdata/`
/// directories, plus `TEST_DATA_DIR` if set.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(test_data_dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(test_data_dir).join(name));
    }

    let root = workspace_root();
    for crate_name in [
        "opensearch",
        "descriptor-docs",
        "opendap",
        "catalog",
        "granule-index",
        "zarr-store",
        "esa-cci",
    ] {
        candidates.push(crate_testdata_dir(crate_name).join(name));
    }
    candidates.push(root.join("testdata").join(name));

    candidates.into_iter().find(|path| path.exists())
}

pub fn find_crate_test_file(crate_name: &str, name: &str) -> Option<PathBuf> {
    let path = crate_testdata_dir(crate_name).join(name);
    path.exists().then_some(path)
}

/// Creates a temporary directory for test output, cleaned up on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("failed to create temporary test directory")
}

pub fn temp_test_dir_with_prefix(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("failed to create temporary test directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_root_contains_cargo_toml() {
        let root = workspace_root();
        assert!(root.join("Cargo.toml").exists(), "{:?}", root);
    }

    #[test]
    fn crate_testdata_dir_is_scoped_to_the_crate() {
        let dir = crate_testdata_dir("opendap");
        assert!(dir.to_string_lossy().contains("opendap"));
        assert!(dir.to_string_lossy().contains("testdata"));
    }

    #[test]
    fn temp_dir_exists_and_honors_prefix() {
        let dir = temp_test_dir_with_prefix("esacci_test_");
        assert!(dir.path().exists());
        assert!(dir.path().to_string_lossy().contains("esacci_test_"));
    }
}
