// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the settings file that tells wingo-contrib where
//! scripts get installed, and which remote repository they come from. Every
//! field is optional, so an empty (or missing) settings file means "use the
//! defaults".
//!
//! # General Layout
//!
//! ```toml
//! [local]
//! scripts_dir = "$XDG_CONFIG_HOME/wingo/scripts"
//!
//! [remote]
//! repository = "wingowm/contrib"
//! branch = "master"
//! api_base = "https://api.github.com"
//! raw_base = "https://raw.githubusercontent.com"
//! fetch_jobs = 8
//! ```

use crate::{
    path::{default_scripts_dir, NoWayHome},
    store::DEFAULT_FETCH_JOBS,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Settings layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where scripts live on this machine.
    pub local: LocalSettings,

    /// Where scripts come from.
    pub remote: RemoteSettings,
}

impl Settings {
    /// Load settings from target file.
    ///
    /// A missing file is not an error, defaults are used instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Parse`] if file contents are malformed, or if
    ///   shell expansion of the scripts directory fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match read_to_string(path) {
            Ok(data) => data.parse().map_err(|err| ConfigError::Parse {
                source: Box::new(err),
                path: path.to_path_buf(),
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no settings file at {:?}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            }),
        }
    }

    /// Absolute path to the local scripts root.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if no scripts directory was
    ///   configured and the default one cannot be determined.
    pub fn scripts_dir(&self) -> Result<PathBuf> {
        match &self.local.scripts_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(default_scripts_dir()?),
        }
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on scripts directory field.
        if let Some(path) = settings.local.scripts_dir.take() {
            let expanded = shellexpand::full(path.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned();
            settings.local.scripts_dir = Some(PathBuf::from(expanded));
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Local installation settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Root directory holding one directory per installed script.
    pub scripts_dir: Option<PathBuf>,
}

/// Remote repository settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// GitHub repository in `owner/name` form.
    pub repository: String,

    /// Branch to install scripts from.
    pub branch: String,

    /// Base URL of the GitHub REST API.
    pub api_base: String,

    /// Base URL that serves raw file content.
    pub raw_base: String,

    /// Maximum number of README downloads in flight during a search.
    pub fetch_jobs: usize,
}

impl RemoteSettings {
    /// URL of the recursive tree listing of the repository.
    pub fn tree_url(&self) -> String {
        format!(
            "{}/repos/{}/git/trees/{}?recursive=1",
            self.api_base.trim_end_matches('/'),
            self.repository,
            self.branch
        )
    }

    /// URL prefix for raw files, `<prefix>/<script>/<file>`.
    pub fn raw_url(&self) -> String {
        format!(
            "{}/{}/{}",
            self.raw_base.trim_end_matches('/'),
            self.repository,
            self.branch
        )
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            repository: "wingowm/contrib".into(),
            branch: "master".into(),
            api_base: "https://api.github.com".into(),
            raw_base: "https://raw.githubusercontent.com".into(),
            fetch_jobs: DEFAULT_FETCH_JOBS,
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Settings file exists but cannot be read.
    #[error("failed to read settings file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Settings file contents are invalid.
    #[error("invalid settings file at {:?}", path.display())]
    Parse {
        #[source]
        source: Box<ConfigError>,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Default scripts directory cannot be determined.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah/blah")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = r#"
            [local]
            scripts_dir = "$BLAH/scripts"

            [remote]
            repository = "blah/contrib"
            branch = "main"
            fetch_jobs = 2
        "#
        .parse()?;

        let expect = Settings {
            local: LocalSettings {
                scripts_dir: Some(PathBuf::from("/home/blah/blah/scripts")),
            },
            remote: RemoteSettings {
                repository: "blah/contrib".into(),
                branch: "main".into(),
                fetch_jobs: 2,
                ..RemoteSettings::default()
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_empty_settings_uses_defaults() -> anyhow::Result<()> {
        let result: Settings = "".parse()?;
        assert_eq!(result, Settings::default());
        assert_eq!(
            result.remote.tree_url(),
            "https://api.github.com/repos/wingowm/contrib/git/trees/master?recursive=1"
        );
        assert_eq!(
            result.remote.raw_url(),
            "https://raw.githubusercontent.com/wingowm/contrib/master"
        );

        Ok(())
    }

    #[test]
    fn serialize_settings() {
        let result = Settings {
            local: LocalSettings {
                scripts_dir: Some(PathBuf::from("/home/blah/scripts")),
            },
            remote: RemoteSettings::default(),
        }
        .to_string();

        let expect = indoc! {r#"
            [local]
            scripts_dir = "/home/blah/scripts"

            [remote]
            repository = "wingowm/contrib"
            branch = "master"
            api_base = "https://api.github.com"
            raw_base = "https://raw.githubusercontent.com"
            fetch_jobs = 8
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn load_missing_file_uses_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let result = Settings::load(dir.path().join("config.toml"))?;
        assert_eq!(result, Settings::default());

        Ok(())
    }

    #[test]
    fn load_malformed_file_names_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[remote\nbranch = ")?;

        let result = Settings::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { path: p, .. }) if p == path));

        Ok(())
    }
}
