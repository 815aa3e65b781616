// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! README description extraction.
//!
//! Every script README is expected to carry a setext style `Description`
//! heading. The description is whatever follows that heading up to the first
//! run of two blank lines.

const HEADING: &str = "Description\n===========\n";
const BOUNDARY: &str = "\n\n\n";

/// Extract description section from README contents.
///
/// Yields `None` if README has no description heading. A description without
/// a closing boundary runs until the end of the README.
pub fn description(readme: &[u8]) -> Option<String> {
    let readme = String::from_utf8_lossy(readme);
    let (_, rest) = readme.split_once(HEADING)?;
    let body = rest.split_once(BOUNDARY).map_or(rest, |(body, _)| body);

    Some(body.trim().to_owned())
}
