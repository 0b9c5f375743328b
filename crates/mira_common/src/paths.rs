//! Filesystem locations for daemon state.

use std::path::PathBuf;

/// State directory, `~/.mira`. Callers create it on demand.
pub fn state_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".mira")
}

/// The persisted memory document.
pub fn memory_file() -> PathBuf {
    state_dir().join("memory.json")
}

/// The daemon configuration file.
pub fn config_file() -> PathBuf {
    state_dir().join("config.toml")
}
