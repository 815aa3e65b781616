// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Upgrade reconciliation.
//!
//! The configuration file is the only file of a script that users are
//! expected to edit by hand. Upgrading a script must never silently throw
//! such an edit away. So, before anything gets copied, the local and remote
//! configuration files are compared byte for byte, and the upgrade either
//! proceeds or stops for manual intervention. There is no semantic diffing,
//! and no attempt at merging.

use crate::bundle::{config_name, CopyPlan, ScriptBundle};

use std::path::Path;

/// What an upgrade is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Overwrite every file, configuration included.
    CopyAll,

    /// Overwrite every file except the configuration, which stays untouched.
    SkipConfig,

    /// Copy nothing. Local and remote configuration differ.
    ManualIntervention,
}

impl Decision {
    /// Turn decision into copy plan for bundle into script directory.
    ///
    /// Yields `None` if nothing may be copied.
    pub fn plan(self, bundle: &ScriptBundle, dir: impl AsRef<Path>) -> Option<CopyPlan> {
        match self {
            Self::CopyAll => Some(CopyPlan::all(bundle, dir)),
            Self::SkipConfig => {
                let config = config_name(bundle.name());
                Some(CopyPlan::all_except(bundle, dir, [config.as_str()]))
            }
            Self::ManualIntervention => None,
        }
    }
}

/// Decide how to upgrade a script.
///
/// Rules are checked in order, first match wins:
///
/// 1. Skip flag set: copy everything but the configuration.
/// 2. No local configuration, no remote configuration, or both identical:
///    copy everything.
/// 3. Otherwise: stop for manual intervention.
pub fn decide(
    local_config: Option<&[u8]>,
    remote_config: Option<&[u8]>,
    skip_config: bool,
) -> Decision {
    if skip_config {
        return Decision::SkipConfig;
    }

    match (local_config, remote_config) {
        (None, _) | (_, None) => Decision::CopyAll,
        (Some(local), Some(remote)) if local == remote => Decision::CopyAll,
        _ => Decision::ManualIntervention,
    }
}
