// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory and configuration file resolution.

use std::path::PathBuf;

/// Configuration file name inside the data directory.
pub const CONFIG_FILE: &str = "propslink.json";

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "PROPSLINK_CONFIG";

/// Return the agent data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("propslink");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Path of the configuration file: `$PROPSLINK_CONFIG` when set, otherwise
/// [`CONFIG_FILE`] in the data directory.
pub fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => data_dir().join(CONFIG_FILE),
    }
}

fn base_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}
