// src/infra/paths.rs — Config and data path resolution
//
// All paths respect the VELLE_HOME environment variable for isolation.
// When VELLE_HOME is set, config and the audit stream live under that
// directory. When unset, config uses ~/.velle/ and data uses
// XDG_DATA_HOME/velle.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

/// Returns the VELLE_HOME override, if set.
fn velle_home() -> Option<PathBuf> {
    std::env::var_os("VELLE_HOME").map(PathBuf::from)
}

/// Configuration directory: $VELLE_HOME/ or ~/.velle/
pub fn config_dir() -> PathBuf {
    if let Some(home) = velle_home() {
        return home;
    }
    match BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(".velle"),
        None => PathBuf::from(".velle"),
    }
}

/// Data directory: $VELLE_HOME/data/ or ~/.local/share/velle/
pub fn data_dir() -> PathBuf {
    if let Some(home) = velle_home() {
        return home.join("data");
    }
    match ProjectDirs::from("", "", "velle") {
        Some(dirs) => dirs.data_local_dir().to_path_buf(),
        None => config_dir().join("data"),
    }
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("velle.toml")
}

/// Default location of the local append-only audit stream.
pub fn audit_file_path() -> PathBuf {
    data_dir().join("velle_audit.jsonl")
}
