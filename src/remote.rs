// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote script catalog.
//!
//! Contributed scripts are kept in a remote repository where every script
//! owns one top-level directory. The directory name is the script name, and
//! the files directly inside of it make up the script itself:
//!
//! ```text
//! contrib/
//! ├── README.md               <- not a script, no directory separator
//! ├── prompt-launch/
//! │   ├── README.md           <- script file
//! │   ├── prompt-launch       <- script file (the executable source)
//! │   ├── prompt-launch.cfg   <- script file (optional configuration)
//! │   └── assets/
//! │       └── icon.png        <- ignored, nested too deep
//! ```
//!
//! The __remote catalog__ is an in-memory snapshot of that layout built from
//! one recursive tree listing. It is built fresh for every command, and never
//! changes afterwards.
//!
//! # Transport
//!
//! How the listing and the files actually get fetched is left to an
//! implementation of [`Fetch`]. The default one, [`GithubFetcher`], talks to
//! the GitHub REST API and raw content host.

pub mod http;
pub mod readme;

pub use http::GithubFetcher;

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, instrument};

/// Single entry of a recursive remote tree listing.
///
/// An entry is not necessarily a script file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Path relative to repository root, separated by `/`.
    pub path: String,

    /// Whether entry is a file rather than a directory.
    pub is_blob: bool,
}

impl RemoteEntry {
    /// Construct new remote file entry.
    pub fn blob(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_blob: true,
        }
    }

    /// Construct new remote directory entry.
    pub fn tree(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_blob: false,
        }
    }

    /// Split entry into script name and file name.
    ///
    /// Only entries that are direct file children of a top-level directory
    /// are script files, i.e., their path contains exactly one separator.
    /// Anything else is repository metadata, and yields `None`.
    pub fn script_file(&self) -> Option<(&str, &str)> {
        if !self.is_blob || self.path.matches('/').count() != 1 {
            return None;
        }

        match self.path.split_once('/') {
            Some((script, file)) if !script.is_empty() && !file.is_empty() => Some((script, file)),
            _ => None,
        }
    }
}

/// Remote repository transport.
///
/// Layer of indirection between the catalog and whatever serves the
/// repository contents.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Human readable name of the remote repository, used in diagnostics.
    fn repository(&self) -> &str;

    /// Fetch flat recursive listing of every entry in the repository.
    async fn fetch_tree(&self) -> Result<Vec<RemoteEntry>>;

    /// Fetch contents of one file of a script.
    ///
    /// Yields `None` if the remote refuses to serve the file.
    async fn fetch_file(&self, script: &str, file: &str) -> Result<Option<Vec<u8>>>;
}

/// Snapshot of all scripts available remotely.
///
/// # Invariant
///
/// - Every script maps to at least one file name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RemoteCatalog {
    scripts: BTreeMap<String, BTreeSet<String>>,
}

impl RemoteCatalog {
    /// Build catalog from raw tree entries.
    ///
    /// Entries that do not classify as script files are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = RemoteEntry>) -> Self {
        let mut scripts: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for entry in entries {
            if let Some((script, file)) = entry.script_file() {
                scripts
                    .entry(script.to_owned())
                    .or_default()
                    .insert(file.to_owned());
            }
        }

        Self { scripts }
    }

    /// Fetch remote tree listing, and build catalog from it.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError`] if listing cannot be fetched or decoded.
    #[instrument(skip(fetcher), fields(repository = fetcher.repository()), level = "debug")]
    pub async fn fetch(fetcher: &impl Fetch) -> Result<Self> {
        let catalog = Self::from_entries(fetcher.fetch_tree().await?);
        debug!("remote catalog holds {} scripts", catalog.scripts.len());
        Ok(catalog)
    }

    /// Check if script exists remotely.
    pub fn exists(&self, script: &str) -> bool {
        self.scripts.contains_key(script)
    }

    /// All script names in ascending order.
    pub fn script_names(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }

    /// File names of target script in ascending order.
    ///
    /// Empty if script does not exist.
    pub fn files(&self, script: &str) -> impl Iterator<Item = &str> {
        self.scripts
            .get(script)
            .into_iter()
            .flat_map(|files| files.iter().map(String::as_str))
    }
}

/// Remote repository error types.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Request could not be sent, or response could not be read.
    #[error("failed to fetch {url}")]
    Request {
        #[source]
        source: reqwest::Error,
        url: String,
    },

    /// Remote answered tree listing request with an error status.
    #[error("failed to fetch {url}: remote answered with status {status}")]
    Status { status: u16, url: String },

    /// Tree listing is not valid JSON of the expected shape.
    #[error("failed to decode tree listing from {url}")]
    Decode {
        #[source]
        source: serde_json::Error,
        url: String,
    },

    /// HTTP client could not be constructed.
    #[error("failed to construct HTTP client")]
    Client(#[source] reqwest::Error),
}

/// Friendly result alias :3
pub type Result<T, E = RemoteError> = std::result::Result<T, E>;
