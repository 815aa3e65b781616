// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Manage contributed scripts for the Wingo window manager.
//!
//! Contributed scripts live in a remote repository, one top-level directory
//! per script. This crate installs them into a local scripts root, upgrades
//! them without clobbering hand-edited configuration files, lists what is
//! installed, and searches or describes what is available.
//!
//! # See Also
//!
//! 1. [`RemoteCatalog`]
//! 2. [`LocalInstallation`]
//! 3. [`reconcile`]

pub mod bundle;
pub mod config;
pub mod local;
pub mod path;
pub mod reconcile;
pub mod remote;
pub mod store;

pub use bundle::{CopyPlan, ScriptBundle};
pub use config::Settings;
pub use local::{LocalInstallation, LocalScript};
pub use reconcile::{decide, Decision};
pub use remote::{Fetch, GithubFetcher, RemoteCatalog, RemoteEntry};
pub use store::{SearchHit, Store, StoreError, UpgradeOutcome};
