// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! In-memory script bundles and copy plans.
//!
//! A __script bundle__ is the entire file set of one remote script held in
//! memory: the executable source, the README, the optional configuration
//! file, and whatever else the script directory contains. Bundles are
//! materialized onto disk through a __copy plan__, which pairs file names of
//! the bundle with their destination paths.
//!
//! # Mandatory Files
//!
//! Every script must ship a `README.md`, and a file named exactly like the
//! script itself. A script missing either one means the remote repository
//! is corrupt.

use crate::remote::{Fetch, RemoteCatalog, RemoteError};

use indicatif::ProgressBar;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Name of README file every script must ship.
pub const README: &str = "README.md";

/// Name of configuration file for target script.
pub fn config_name(script: &str) -> String {
    format!("{script}.cfg")
}

/// Entire file set of one script held in memory.
///
/// # Invariant
///
/// - Contains README and source file.
/// - A file name is either present or absent, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBundle {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
    absent: BTreeSet<String>,
}

impl ScriptBundle {
    /// Construct new script bundle.
    ///
    /// Takes every file of the script, where `None` marks a file the remote
    /// listed but would not serve.
    ///
    /// # Errors
    ///
    /// - Return [`BundleError::Corrupt`] if README or source file is absent.
    pub fn new(
        repository: &str,
        name: impl Into<String>,
        files: impl IntoIterator<Item = (String, Option<Vec<u8>>)>,
    ) -> Result<Self> {
        let name = name.into();
        let mut present = BTreeMap::new();
        let mut absent = BTreeSet::new();
        for (file, contents) in files {
            match contents {
                Some(contents) => {
                    absent.remove(&file);
                    present.insert(file, contents);
                }
                None => {
                    present.remove(&file);
                    absent.insert(file);
                }
            }
        }

        for mandatory in [README, name.as_str()] {
            if !present.contains_key(mandatory) {
                return Err(BundleError::Corrupt {
                    repository: repository.to_owned(),
                    script: name.clone(),
                    file: mandatory.to_owned(),
                });
            }
        }

        Ok(Self {
            name,
            files: present,
            absent,
        })
    }

    /// Download every file of target script.
    ///
    /// Files are fetched one after another, advancing the progress bar per
    /// file.
    ///
    /// # Errors
    ///
    /// - Return [`BundleError::Remote`] if transport fails.
    /// - Return [`BundleError::Corrupt`] if README or source file is absent.
    #[instrument(skip(catalog, fetcher, bar), level = "debug")]
    pub async fn download(
        catalog: &RemoteCatalog,
        fetcher: &impl Fetch,
        name: &str,
        bar: &ProgressBar,
    ) -> Result<Self> {
        let names = catalog.files(name).collect::<Vec<_>>();
        bar.set_length(names.len() as u64);
        bar.set_position(0);

        let mut files = Vec::with_capacity(names.len());
        for file in names {
            bar.set_message(format!("{name}/{file}"));
            let contents = fetcher.fetch_file(name, file).await?;
            if contents.is_none() {
                warn!("could not download {name}/{file}, skipping it");
            }
            files.push((file.to_owned(), contents));
            bar.inc(1);
        }
        bar.finish_and_clear();

        Self::new(fetcher.repository(), name, files)
    }

    /// Name of script.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Contents of file in bundle.
    pub fn file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    /// Names of every present file in ascending order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Names of files listed remotely but not served.
    pub fn absent(&self) -> impl Iterator<Item = &str> {
        self.absent.iter().map(String::as_str)
    }

    /// Executable source of script.
    pub fn source(&self) -> &[u8] {
        self.file(&self.name).unwrap_or_default()
    }

    /// README of script.
    pub fn readme(&self) -> &[u8] {
        self.file(README).unwrap_or_default()
    }

    /// Configuration file of script, if it has one.
    pub fn config(&self) -> Option<&[u8]> {
        self.file(&config_name(&self.name))
    }
}

/// Files of a bundle to materialize, and where to put them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CopyPlan {
    entries: Vec<(String, PathBuf)>,
}

impl CopyPlan {
    /// Plan to copy every present file of bundle into target directory.
    pub fn all(bundle: &ScriptBundle, dir: impl AsRef<Path>) -> Self {
        Self::all_except(bundle, dir, [])
    }

    /// Plan to copy every present file of bundle into target directory,
    /// except for the excluded file names.
    pub fn all_except<'a>(
        bundle: &ScriptBundle,
        dir: impl AsRef<Path>,
        excluded: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let excluded = excluded.into_iter().collect::<BTreeSet<_>>();
        let entries = bundle
            .file_names()
            .filter(|file| !excluded.contains(file))
            .map(|file| (file.to_owned(), dir.as_ref().join(file)))
            .collect();

        Self { entries }
    }

    /// File name and destination path pairs.
    pub fn entries(&self) -> &[(String, PathBuf)] {
        &self.entries
    }

    /// Check if plan contains target file name.
    pub fn contains(&self, file: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == file)
    }

    /// Copy planned files of bundle onto disk.
    ///
    /// Files are written one after another. Existing files are overwritten.
    /// Stops at the first failure, files already written stay written.
    ///
    /// # Errors
    ///
    /// - Return [`BundleError::MissingFile`] if plan names a file the bundle
    ///   does not hold.
    /// - Return [`BundleError::CreateFile`] if destination cannot be created.
    /// - Return [`BundleError::WriteFile`] if destination cannot be written.
    #[instrument(skip(self, bundle), fields(script = bundle.name()), level = "debug")]
    pub fn execute(&self, bundle: &ScriptBundle) -> Result<usize> {
        for (file, dest) in &self.entries {
            let contents = bundle.file(file).ok_or_else(|| BundleError::MissingFile {
                script: bundle.name().to_owned(),
                file: file.clone(),
            })?;

            debug!("copy {file} to {:?}", dest.display());
            let mut handle = File::create(dest).map_err(|err| BundleError::CreateFile {
                source: err,
                path: dest.clone(),
            })?;
            handle
                .write_all(contents)
                .map_err(|err| BundleError::WriteFile {
                    source: err,
                    path: dest.clone(),
                })?;
        }

        info!("copied {} files of {}", self.entries.len(), bundle.name());
        Ok(self.entries.len())
    }
}

/// Script bundle error types.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Remote transport fails.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Mandatory file of script is absent.
    #[error("CORRUPT REPOSITORY {repository}: no {file} file found for {script}")]
    Corrupt {
        repository: String,
        script: String,
        file: String,
    },

    /// Copy plan references a file the bundle does not hold.
    #[error("file {file} of {script} is not held in memory")]
    MissingFile { script: String, file: String },

    /// Destination file cannot be created.
    #[error("could not create file {:?}", path.display())]
    CreateFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Destination file cannot be written to.
    #[error("could not write to file {:?}", path.display())]
    WriteFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = BundleError> = std::result::Result<T, E>;
