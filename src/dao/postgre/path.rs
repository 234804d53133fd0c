use std::path::PathBuf;

/// Location of a schema file shipped with the crate.
pub fn get_path(dir: &str, file: &str) -> PathBuf {
    [dir, "migration", "postgresql", file].iter().collect()
}
