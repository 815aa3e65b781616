// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine where the settings file and the local scripts root live on the
//! user's file system.

use std::path::PathBuf;

/// Determine default absolute path to the settings file.
///
/// Uses `$XDG_CONFIG_HOME/wingo-contrib/config.toml`. Does not check if the
/// path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("wingo-contrib").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to the local scripts root.
///
/// Wingo looks for contributed scripts in `$XDG_CONFIG_HOME/wingo/scripts`,
/// so that is where they get installed. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_scripts_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("wingo").join("scripts"))
        .ok_or(NoWayHome)
}

/// No way to determine user's configuration directory.
///
/// # See Also
///
/// - [`dirs::config_dir`](https://docs.rs/dirs/latest/dirs/fn.config_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's configuration directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
