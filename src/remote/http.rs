// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! GitHub transport.
//!
//! Fetch the recursive tree listing through the GitHub REST API, and fetch
//! individual files through the raw content host.

use crate::{
    config::RemoteSettings,
    remote::{Fetch, RemoteEntry, RemoteError, Result},
};

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// Fetch scripts from a GitHub repository.
#[derive(Debug, Clone)]
pub struct GithubFetcher {
    client: Client,
    repository: String,
    tree_url: String,
    raw_url: String,
}

impl GithubFetcher {
    /// Construct new GitHub fetcher from remote settings.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Client`] if HTTP client cannot be built.
    pub fn new(settings: &RemoteSettings) -> Result<Self> {
        // INVARIANT: GitHub API rejects requests without a user agent.
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RemoteError::Client)?;

        Ok(Self {
            client,
            repository: settings.repository.clone(),
            tree_url: settings.tree_url(),
            raw_url: settings.raw_url(),
        })
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|err| RemoteError::Request {
                source: err,
                url: url.to_owned(),
            })
    }
}

impl Fetch for GithubFetcher {
    fn repository(&self) -> &str {
        &self.repository
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_tree(&self) -> Result<Vec<RemoteEntry>> {
        debug!("fetch tree listing {}", self.tree_url);
        let response = self.get(&self.tree_url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                url: self.tree_url.clone(),
            });
        }

        let body = response.bytes().await.map_err(|err| RemoteError::Request {
            source: err,
            url: self.tree_url.clone(),
        })?;
        let listing: TreeListing =
            serde_json::from_slice(&body).map_err(|err| RemoteError::Decode {
                source: err,
                url: self.tree_url.clone(),
            })?;

        if listing.truncated {
            warn!(
                "tree listing of {} is truncated, some scripts may be missing",
                self.repository
            );
        }

        Ok(listing.tree.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_file(&self, script: &str, file: &str) -> Result<Option<Vec<u8>>> {
        let url = format!("{}/{script}/{file}", self.raw_url);
        let response = self.get(&url).await?;
        let status = response.status();

        // INVARIANT: Any status below 400 carries file contents.
        if status.as_u16() >= 400 {
            debug!("{url} answered with status {status}");
            return Ok(None);
        }

        let body = response.bytes().await.map_err(|err| RemoteError::Request {
            source: err,
            url: url.clone(),
        })?;

        Ok(Some(body.to_vec()))
    }
}

/// Recursive tree listing as served by the GitHub API.
#[derive(Debug, Deserialize)]
struct TreeListing {
    tree: Vec<TreeNode>,

    #[serde(default)]
    truncated: bool,
}

/// Single node of a tree listing.
#[derive(Debug, Deserialize)]
struct TreeNode {
    path: String,

    #[serde(rename = "type")]
    kind: String,
}

impl From<TreeNode> for RemoteEntry {
    fn from(node: TreeNode) -> Self {
        Self {
            is_blob: node.kind == "blob",
            path: node.path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_tree_listing() -> anyhow::Result<()> {
        let body = indoc! {r#"
            {
              "sha": "9fb037999f264ba9a7fc6274d15fa3ae2ab98312",
              "url": "https://api.github.com/repos/wingowm/contrib/git/trees/9fb0379",
              "tree": [
                { "path": "README.md", "mode": "100644", "type": "blob", "size": 30 },
                { "path": "clock", "mode": "040000", "type": "tree" },
                { "path": "clock/clock", "mode": "100755", "type": "blob", "size": 75 }
              ],
              "truncated": false
            }
        "#};

        let listing: TreeListing = serde_json::from_str(body)?;
        let result = listing
            .tree
            .into_iter()
            .map(RemoteEntry::from)
            .collect::<Vec<_>>();
        let expect = vec![
            RemoteEntry::blob("README.md"),
            RemoteEntry::tree("clock"),
            RemoteEntry::blob("clock/clock"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[tokio::test]
    async fn fetch_file_treats_error_status_as_absent() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let present = server
            .mock("GET", "/wingowm/contrib/master/clock/clock")
            .with_status(200)
            .with_body("#!/bin/sh\ndate\n")
            .create_async()
            .await;
        let missing = server
            .mock("GET", "/wingowm/contrib/master/clock/clock.cfg")
            .with_status(404)
            .create_async()
            .await;

        let settings = RemoteSettings {
            api_base: server.url(),
            raw_base: server.url(),
            ..RemoteSettings::default()
        };
        let fetcher = GithubFetcher::new(&settings)?;

        assert_eq!(
            fetcher.fetch_file("clock", "clock").await?,
            Some(b"#!/bin/sh\ndate\n".to_vec())
        );
        assert_eq!(fetcher.fetch_file("clock", "clock.cfg").await?, None);

        present.assert_async().await;
        missing.assert_async().await;

        Ok(())
    }

    #[tokio::test]
    async fn fetch_tree_fails_on_error_status() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _listing = server
            .mock("GET", "/repos/wingowm/contrib/git/trees/master")
            .match_query(mockito::Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let settings = RemoteSettings {
            api_base: server.url(),
            raw_base: server.url(),
            ..RemoteSettings::default()
        };
        let fetcher = GithubFetcher::new(&settings)?;

        let result = fetcher.fetch_tree().await;
        assert!(matches!(result, Err(RemoteError::Status { status: 403, .. })));

        Ok(())
    }
}
