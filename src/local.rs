// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local script installation.
//!
//! Installed scripts live under a single __scripts root__. Each script is
//! given its own directory whose name is the script name:
//!
//! ```text
//! $XDG_CONFIG_HOME/wingo/scripts/
//! └── prompt-launch/
//!     ├── README.md
//!     ├── prompt-launch       <- executable
//!     └── prompt-launch.cfg   <- optional, user editable
//! ```
//!
//! Only the top-level of the scripts root is evaluated. Any directory found
//! there counts as an installed script, whether or not its contents are
//! actually valid.

use crate::bundle::config_name;

use std::{
    fs::{self, read_dir},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Script installed in the local file system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalScript {
    name: String,
    path: PathBuf,
}

impl LocalScript {
    /// Construct new local script entry.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Name of script.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path to script directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute path to script's configuration file.
    ///
    /// Does not check if the path returned actually exists.
    pub fn config_path(&self) -> PathBuf {
        self.path.join(config_name(&self.name))
    }

    /// Check if script has a configuration file.
    pub fn has_config(&self) -> bool {
        self.config_path().exists()
    }

    /// Read contents of script's configuration file.
    ///
    /// Yields `None` if script has no configuration file.
    ///
    /// # Errors
    ///
    /// - Return [`LocalError::ReadConfig`] if configuration file exists but
    ///   cannot be read.
    pub fn read_config(&self) -> Result<Option<Vec<u8>>> {
        let path = self.config_path();
        match fs::read(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(LocalError::ReadConfig { source: err, path }),
        }
    }
}

/// Snapshot of all scripts installed locally.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalInstallation {
    scripts: Vec<LocalScript>,
}

impl LocalInstallation {
    /// Scan scripts root for installed scripts.
    ///
    /// Entries are kept in file system enumeration order.
    ///
    /// # Errors
    ///
    /// - Return [`LocalError::OpenRoot`] if scripts root cannot be opened.
    /// - Return [`LocalError::ScanRoot`] if scripts root cannot be enumerated.
    #[instrument(skip(root), level = "debug")]
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        debug!("scan scripts root {:?}", root.display());
        let entries = read_dir(root).map_err(|err| LocalError::OpenRoot {
            source: err,
            path: root.to_path_buf(),
        })?;

        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| LocalError::ScanRoot {
                source: err,
                path: root.to_path_buf(),
            })?;
            let kind = entry.file_type().map_err(|err| LocalError::ScanRoot {
                source: err,
                path: entry.path(),
            })?;

            // INVARIANT: One installed script per directory, files are ignored.
            if !kind.is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            scripts.push(LocalScript::new(name, entry.path()));
        }

        Ok(Self { scripts })
    }

    /// Check if script is installed.
    pub fn exists(&self, script: &str) -> bool {
        self.get(script).is_some()
    }

    /// Get installed script by name.
    pub fn get(&self, script: &str) -> Option<&LocalScript> {
        self.scripts.iter().find(|local| local.name == script)
    }

    /// All installed scripts in file system enumeration order.
    pub fn scripts(&self) -> &[LocalScript] {
        &self.scripts
    }
}

/// Create directory for a new script under scripts root.
///
/// Does not create missing parent directories.
///
/// # Errors
///
/// - Return [`LocalError::CreateDir`] if directory cannot be created, e.g.,
///   something already exists at that path.
pub fn create_script_dir(root: impl AsRef<Path>, script: &str) -> Result<PathBuf> {
    let path = root.as_ref().join(script);
    fs::create_dir(&path).map_err(|err| LocalError::CreateDir {
        source: err,
        path: path.clone(),
    })?;

    Ok(path)
}

/// Make file executable for owner, group, and other.
///
/// Only adds the missing execute bits, every other permission bit stays as
/// it is.
///
/// # Errors
///
/// - Return [`LocalError::Permissions`] if permissions cannot be read or set.
#[cfg(unix)]
pub fn make_executable(path: impl AsRef<Path>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let path = path.as_ref();
    let to_error = |err| LocalError::Permissions {
        source: err,
        path: path.to_path_buf(),
    };

    let mut permissions = fs::metadata(path).map_err(to_error)?.permissions();
    let mode = permissions.mode();
    permissions.set_mode(mode | 0o111);
    fs::set_permissions(path, permissions).map_err(to_error)?;
    debug!("mode of {:?}: {:o} -> {:o}", path.display(), mode & 0o7777, (mode | 0o111) & 0o7777);

    Ok(())
}

/// Make file executable for owner, group, and other.
///
/// No such thing as an execute bit here, so there is nothing to do.
#[cfg(not(unix))]
pub fn make_executable(_path: impl AsRef<Path>) -> Result<()> {
    Ok(())
}

/// Local installation error types.
#[derive(Debug, thiserror::Error)]
pub enum LocalError {
    /// Scripts root cannot be opened.
    #[error("failed to open scripts directory {:?}", path.display())]
    OpenRoot {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Scripts root cannot be enumerated.
    #[error("failed to scan scripts directory {:?}", path.display())]
    ScanRoot {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Script directory cannot be created.
    #[error("could not create {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Configuration file exists but cannot be read.
    #[error("could not read config file {:?}", path.display())]
    ReadConfig {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Execute bits cannot be set.
    #[error("could not make {:?} executable", path.display())]
    Permissions {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LocalError> = std::result::Result<T, E>;
