// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Script store management.
//!
//! The __store__ ties the remote catalog and the local installation together
//! into the operations exposed on the command line: install, upgrade, list,
//! search, and info. Both snapshots are built fresh for every operation.
//!
//! Operations never terminate the process. Every failure is handed back to
//! the caller as a [`StoreError`], and the one recoverable condition, a
//! configuration conflict during upgrade, is a regular
//! [`UpgradeOutcome::ManualIntervention`] result.

use crate::{
    bundle::{BundleError, CopyPlan, ScriptBundle, README},
    local::{create_script_dir, make_executable, LocalError, LocalInstallation},
    reconcile::{decide, Decision},
    remote::{readme::description, Fetch, RemoteCatalog, RemoteError},
};

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Number of README downloads in flight during a search, unless configured.
pub const DEFAULT_FETCH_JOBS: usize = 8;

/// Installed scripts plus the remote they come from.
pub struct Store<F>
where
    F: Fetch,
{
    scripts_dir: PathBuf,
    fetcher: F,
    fetch_jobs: usize,
    bar: ProgressBar,
}

impl<F> Store<F>
where
    F: Fetch,
{
    /// Construct new store over scripts root and remote.
    ///
    /// Progress is not shown unless a visible bar is supplied through
    /// [`Store::with_progress`].
    pub fn new(scripts_dir: impl Into<PathBuf>, fetcher: F) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            fetcher,
            fetch_jobs: DEFAULT_FETCH_JOBS,
            bar: ProgressBar::hidden(),
        }
    }

    /// Report remote transfer progress through target bar.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.bar = bar;
        self
    }

    /// Limit number of concurrent README downloads during a search.
    ///
    /// Zero is treated as one.
    pub fn with_fetch_jobs(mut self, jobs: usize) -> Self {
        self.fetch_jobs = jobs.max(1);
        self
    }

    /// Absolute path to scripts root.
    pub fn scripts_dir(&self) -> &Path {
        &self.scripts_dir
    }

    /// Install script for the first time.
    ///
    /// Downloads the script, creates its directory, copies every file into it,
    /// and marks the source file executable.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::UnknownScript`] if script does not exist
    ///   remotely.
    /// - Return [`StoreError::AlreadyInstalled`] if script is installed.
    /// - Return [`StoreError::Bundle`] if download or copying fails.
    /// - Return [`StoreError::Local`] if directory creation or permission
    ///   changes fail.
    #[instrument(skip(self), level = "debug")]
    pub async fn install(&self, name: &str) -> Result<PathBuf> {
        let (catalog, local) = self.snapshots().await?;
        self.ensure_remote(&catalog, name)?;
        if local.exists(name) {
            return Err(StoreError::AlreadyInstalled { name: name.into() });
        }

        // INVARIANT: Download before touching the file system, so a corrupt
        // remote script leaves no empty directory behind.
        info!("install {name}");
        let bundle = ScriptBundle::download(&catalog, &self.fetcher, name, &self.bar).await?;
        let dir = create_script_dir(&self.scripts_dir, name)?;
        CopyPlan::all(&bundle, &dir).execute(&bundle)?;
        make_executable(dir.join(name))?;

        Ok(dir)
    }

    /// Upgrade installed script without losing local configuration edits.
    ///
    /// See [`decide`] for the rules on what may be overwritten.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::UnknownScript`] if script does not exist
    ///   remotely.
    /// - Return [`StoreError::NotInstalled`] if script is not installed.
    /// - Return [`StoreError::Bundle`] if download or copying fails.
    /// - Return [`StoreError::Local`] if local configuration cannot be read.
    #[instrument(skip(self), level = "debug")]
    pub async fn upgrade(&self, name: &str, skip_config: bool) -> Result<UpgradeOutcome> {
        let (catalog, local) = self.snapshots().await?;
        self.ensure_remote(&catalog, name)?;
        let installed = local
            .get(name)
            .ok_or_else(|| StoreError::NotInstalled { name: name.into() })?;

        info!("upgrade {name}");
        let bundle = ScriptBundle::download(&catalog, &self.fetcher, name, &self.bar).await?;

        // INVARIANT: Only read local configuration when it could matter.
        let local_config = match (skip_config, bundle.config()) {
            (false, Some(_)) if installed.has_config() => installed.read_config()?,
            _ => None,
        };

        let decision = decide(local_config.as_deref(), bundle.config(), skip_config);
        debug!("reconciliation decision for {name}: {decision:?}");

        match decision.plan(&bundle, installed.path()) {
            Some(plan) => {
                let copied = plan.execute(&bundle)?;
                Ok(UpgradeOutcome::Upgraded {
                    copied,
                    config_skipped: decision == Decision::SkipConfig,
                })
            }
            None => Ok(UpgradeOutcome::ManualIntervention {
                config_path: installed.config_path(),
            }),
        }
    }

    /// Installed scripts that still exist remotely.
    ///
    /// Names are kept in local file system enumeration order.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Remote`] if remote catalog cannot be fetched.
    /// - Return [`StoreError::Local`] if scripts root cannot be scanned.
    #[instrument(skip(self), level = "debug")]
    pub async fn list(&self) -> Result<Vec<String>> {
        let (catalog, local) = self.snapshots().await?;
        Ok(local
            .scripts()
            .iter()
            .filter(|script| catalog.exists(script.name()))
            .map(|script| script.name().to_owned())
            .collect())
    }

    /// Search remote scripts by description.
    ///
    /// Matches query against each script's README description, ignoring case.
    /// An empty query matches every script. READMEs are downloaded
    /// concurrently, results are always ordered by script name.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::Remote`] if remote catalog or any README
    ///   cannot be fetched.
    #[instrument(skip(self), level = "debug")]
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let catalog = RemoteCatalog::fetch(&self.fetcher).await?;
        let names = catalog.script_names();
        self.bar.set_length(names.len() as u64);
        self.bar.set_position(0);
        self.bar.set_message("fetch descriptions");

        let fetcher = &self.fetcher;
        let bar = &self.bar;
        let results = stream::iter(names)
            .map(|name| async move {
                let readme = fetcher.fetch_file(&name, README).await;
                bar.inc(1);
                readme.map(|readme| SearchHit {
                    description: readme.as_deref().and_then(description),
                    name,
                })
            })
            .buffer_unordered(self.fetch_jobs)
            .collect::<Vec<_>>()
            .await;
        self.bar.finish_and_clear();

        // INVARIANT: Output order never depends on fetch completion order.
        let mut hits = results.into_iter().collect::<Result<Vec<_>, RemoteError>>()?;
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        hits.retain(|hit| hit.matches(query));

        Ok(hits)
    }

    /// README of remote script, verbatim.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::UnknownScript`] if script does not exist
    ///   remotely.
    /// - Return [`StoreError::Bundle`] if README is missing.
    #[instrument(skip(self), level = "debug")]
    pub async fn info(&self, name: &str) -> Result<Vec<u8>> {
        let catalog = RemoteCatalog::fetch(&self.fetcher).await?;
        self.ensure_remote(&catalog, name)?;

        self.fetcher
            .fetch_file(name, README)
            .await?
            .ok_or_else(|| {
                StoreError::Bundle(BundleError::Corrupt {
                    repository: self.fetcher.repository().to_owned(),
                    script: name.to_owned(),
                    file: README.to_owned(),
                })
            })
    }

    async fn snapshots(&self) -> Result<(RemoteCatalog, LocalInstallation)> {
        let catalog = RemoteCatalog::fetch(&self.fetcher).await?;
        let local = LocalInstallation::open(&self.scripts_dir)?;
        Ok((catalog, local))
    }

    fn ensure_remote(&self, catalog: &RemoteCatalog, name: &str) -> Result<()> {
        if !catalog.exists(name) {
            return Err(StoreError::UnknownScript {
                name: name.into(),
                repository: self.fetcher.repository().into(),
            });
        }

        Ok(())
    }
}

/// Result of an upgrade that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeOutcome {
    /// Files were copied over the installed script.
    Upgraded {
        /// Number of files written.
        copied: usize,

        /// Whether the configuration file was deliberately left alone.
        config_skipped: bool,
    },

    /// Local and remote configuration differ, nothing was copied.
    ManualIntervention {
        /// Path of the local configuration file that differs.
        config_path: PathBuf,
    },
}

impl UpgradeOutcome {
    /// Instructions for the user on how to resolve a configuration conflict.
    ///
    /// Yields `None` if the upgrade went through.
    pub fn guidance(&self) -> Option<String> {
        match self {
            Self::Upgraded { .. } => None,
            Self::ManualIntervention { config_path } => Some(format!(
                "MANUAL INTERVENTION REQUIRED!\n\n\
                 The configuration file\n\n    {}\n\n\
                 differs from the remote copy.\n\n\
                 Please move the local configuration to a different location\n\
                 and run the upgrade command again. Then merge your old\n\
                 configuration file with the new one.\n\n\
                 Alternatively, upgrade with '--skip-config' set.",
                config_path.display()
            )),
        }
    }
}

/// Remote script matched by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Name of script.
    pub name: String,

    /// Description extracted from README, if it has one.
    pub description: Option<String>,
}

impl SearchHit {
    /// Check if description contains query, ignoring case.
    ///
    /// Empty query matches everything. A script without description matches
    /// nothing else.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }

        self.description
            .as_ref()
            .is_some_and(|description| description.to_lowercase().contains(&query))
    }
}

impl Display for SearchHit {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let description = self
            .description
            .as_deref()
            .unwrap_or("(no description)")
            .replace('\n', "\n    ");
        writeln!(fmt, "{}", self.name)?;
        writeln!(fmt, "    {description}")
    }
}

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Script is not available remotely.
    #[error("script '{name}' does not exist in {repository}")]
    UnknownScript { name: String, repository: String },

    /// Script is already installed locally.
    #[error("script '{name}' is already installed, use the upgrade command to update it")]
    AlreadyInstalled { name: String },

    /// Script is not installed locally.
    #[error("script '{name}' is not installed, add it with the install command first")]
    NotInstalled { name: String },

    /// Remote transport fails.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Local file system interaction fails.
    #[error(transparent)]
    Local(#[from] LocalError),

    /// Script download or copying fails.
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteEntry;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use std::{collections::HashMap, fs, time::Duration};

    /// Remote served straight from memory.
    #[derive(Debug, Default)]
    struct MemoryRemote {
        files: HashMap<String, Vec<u8>>,
    }

    impl MemoryRemote {
        fn with(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(path.into(), contents.as_bytes().to_vec());
            self
        }
    }

    impl Fetch for MemoryRemote {
        fn repository(&self) -> &str {
            "memory/contrib"
        }

        async fn fetch_tree(&self) -> crate::remote::Result<Vec<RemoteEntry>> {
            Ok(self.files.keys().map(RemoteEntry::blob).collect())
        }

        async fn fetch_file(
            &self,
            script: &str,
            file: &str,
        ) -> crate::remote::Result<Option<Vec<u8>>> {
            Ok(self.files.get(&format!("{script}/{file}")).cloned())
        }
    }

    /// Remote that answers later for names earlier in the alphabet.
    #[derive(Debug)]
    struct SlowRemote {
        inner: MemoryRemote,
        delays: HashMap<String, u64>,
    }

    impl Fetch for SlowRemote {
        fn repository(&self) -> &str {
            self.inner.repository()
        }

        async fn fetch_tree(&self) -> crate::remote::Result<Vec<RemoteEntry>> {
            self.inner.fetch_tree().await
        }

        async fn fetch_file(
            &self,
            script: &str,
            file: &str,
        ) -> crate::remote::Result<Option<Vec<u8>>> {
            let millis = self.delays.get(script).copied().unwrap_or_default();
            tokio::time::sleep(Duration::from_millis(millis)).await;
            self.inner.fetch_file(script, file).await
        }
    }

    fn remote() -> MemoryRemote {
        MemoryRemote::default()
            .with("clock/README.md", "Description\n===========\nTells the TIME.\n")
            .with("clock/clock", "#!/bin/sh\ndate\n")
            .with("clock/clock.cfg", "format = %H\n")
            .with("zoom/README.md", "no heading here\n")
            .with("zoom/zoom", "#!/bin/sh\n")
            .with(
                "launch/README.md",
                indoc! {"
                    Description
                    ===========
                    Launch programs
                    from a prompt.


                    Usage
                    =====
                    Bind it.
                "},
            )
            .with("launch/launch", "#!/bin/sh\n")
    }

    #[tokio::test]
    async fn install_then_list() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        fs::create_dir(root.path().join("orphan"))?;
        let store = Store::new(root.path(), remote());

        let dir = store.install("clock").await?;
        assert_eq!(dir, root.path().join("clock"));
        assert_eq!(fs::read(dir.join("clock.cfg"))?, b"format = %H\n");
        assert_eq!(store.list().await?, vec!["clock"]);

        Ok(())
    }

    #[tokio::test]
    async fn upgrade_reports_conflict_without_writing() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = Store::new(root.path(), remote());
        let dir = store.install("clock").await?;
        fs::write(dir.join("clock.cfg"), "format = %H:%M\n")?;
        fs::write(dir.join("clock"), "edited source\n")?;

        let outcome = store.upgrade("clock", false).await?;
        assert_eq!(
            outcome,
            UpgradeOutcome::ManualIntervention {
                config_path: dir.join("clock.cfg")
            }
        );
        assert_eq!(fs::read(dir.join("clock"))?, b"edited source\n");
        assert!(outcome
            .guidance()
            .is_some_and(|text| text.contains("--skip-config")));

        Ok(())
    }

    #[tokio::test]
    async fn search_orders_and_filters_results() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = Store::new(root.path(), remote()).with_fetch_jobs(2);

        let everything = store.search("").await?;
        let names = everything
            .iter()
            .map(|hit| hit.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["clock", "launch", "zoom"]);
        assert_eq!(everything[2].description, None);

        let hits = store.search("time").await?;
        assert_eq!(
            hits,
            vec![SearchHit {
                name: "clock".into(),
                description: Some("Tells the TIME.".into()),
            }]
        );

        assert!(store.search("heading").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn search_order_ignores_fetch_completion_order() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let slow = SlowRemote {
            inner: remote(),
            delays: HashMap::from([
                ("clock".to_owned(), 60),
                ("launch".to_owned(), 30),
                ("zoom".to_owned(), 1),
            ]),
        };
        let store = Store::new(root.path(), slow).with_fetch_jobs(3);

        let names = store
            .search("")
            .await?
            .into_iter()
            .map(|hit| hit.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["clock", "launch", "zoom"]);

        Ok(())
    }

    #[test]
    fn search_hit_display_indents_description() {
        let hit = SearchHit {
            name: "launch".into(),
            description: Some("Launch programs\nfrom a prompt.".into()),
        };
        let expect = indoc! {"
            launch
                Launch programs
                from a prompt.
        "};
        assert_eq!(hit.to_string(), expect);
    }

    #[tokio::test]
    async fn info_of_unknown_script_fails() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let store = Store::new(root.path(), remote());

        assert_eq!(
            store.info("clock").await?,
            b"Description\n===========\nTells the TIME.\n"
        );
        assert!(matches!(
            store.info("nope").await,
            Err(StoreError::UnknownScript { .. })
        ));

        Ok(())
    }
}
