// src/infra/paths.rs — Config path management
//
// All paths respect the GROUNDWORK_HOME environment variable for isolation.
// When GROUNDWORK_HOME is set, config lives directly under that directory.
// When unset, config uses ~/.groundwork/.

use std::path::PathBuf;

/// Returns the GROUNDWORK_HOME override, if set.
fn groundwork_home() -> Option<PathBuf> {
    std::env::var_os("GROUNDWORK_HOME").map(PathBuf::from)
}

/// Home directory, or the current directory when none can be determined.
pub fn dirs_home() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $GROUNDWORK_HOME/ or ~/.groundwork/
pub fn config_dir() -> PathBuf {
    if let Some(home) = groundwork_home() {
        return home;
    }
    dirs_home().join(".groundwork")
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}
