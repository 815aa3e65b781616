// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use wingo_contrib::{
    config::Settings,
    path::default_config_file,
    store::{Store, UpgradeOutcome},
    GithubFetcher,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    io::{stdout, Write},
    path::PathBuf,
    process::exit,
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "wingo-contrib [options] <command> [arguments]",
    subcommand_help_heading = "Commands",
    after_help = "To uninstall a script, simply delete its directory.",
    arg_required_else_help = true,
    version
)]
struct Cli {
    /// Path to settings file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Path to local scripts directory, overriding settings.
    #[arg(short, long, global = true, value_name = "path")]
    pub scripts_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let config = match self.config {
            Some(path) => path,
            None => default_config_file()?,
        };
        let mut settings = Settings::load(config)?;
        if self.scripts_dir.is_some() {
            settings.local.scripts_dir = self.scripts_dir;
        }

        let scripts_dir = settings.scripts_dir()?;
        let fetcher = GithubFetcher::new(&settings.remote)?;
        let store = Store::new(scripts_dir, fetcher)
            .with_fetch_jobs(settings.remote.fetch_jobs)
            .with_progress(progress_bar()?);
        debug!("scripts directory {:?}", store.scripts_dir().display());

        match self.command {
            Command::Install(opts) => run_install(&store, opts).await,
            Command::Upgrade(opts) => run_upgrade(&store, opts).await,
            Command::List => run_list(&store).await,
            Command::Search(opts) => run_search(&store, opts).await,
            Command::Info(opts) => run_info(&store, opts).await,
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Add scripts from the contrib repository.
    #[command(override_usage = "wingo-contrib install [options] <script_name>")]
    Install(InstallOptions),

    /// Update an installed script.
    #[command(override_usage = "wingo-contrib upgrade [options] <script_name>")]
    Upgrade(UpgradeOptions),

    /// List all installed scripts from the contrib repository.
    #[command(override_usage = "wingo-contrib list [options]")]
    List,

    /// Find scripts by searching descriptions.
    #[command(override_usage = "wingo-contrib search [options] [<query>]...")]
    Search(SearchOptions),

    /// Show information about a script.
    #[command(override_usage = "wingo-contrib info [options] <script_name>")]
    Info(InfoOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallOptions {
    /// Name of script to install.
    #[arg(required = true, value_name = "script_name")]
    pub script_name: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UpgradeOptions {
    /// Name of script to upgrade.
    #[arg(required = true, value_name = "script_name")]
    pub script_name: String,

    /// Upgrade proceeds even if the local and remote config files differ.
    #[arg(long)]
    pub skip_config: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SearchOptions {
    /// Words to look for in script descriptions. An empty query shows all
    /// available scripts.
    #[arg(value_name = "query")]
    pub query: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InfoOptions {
    /// Name of script to describe.
    #[arg(required = true, value_name = "script_name")]
    pub script_name: String,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    // INVARIANT: Usage errors exit with 1, help and version requests with 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(usage) => {
            let code = if usage.use_stderr() { 1 } else { 0 };
            let _ = usage.print();
            exit(code);
        }
    };

    if let Err(error) = cli.run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn progress_bar() -> Result<ProgressBar> {
    let style = ProgressStyle::with_template(
        "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
    )?
    .progress_chars("-Cco.");
    Ok(ProgressBar::new(0).with_style(style))
}

async fn run_install(store: &Store<GithubFetcher>, opts: InstallOptions) -> Result<()> {
    let dir = store.install(&opts.script_name).await?;
    info!("installed {} into {:?}", opts.script_name, dir.display());

    Ok(())
}

async fn run_upgrade(store: &Store<GithubFetcher>, opts: UpgradeOptions) -> Result<()> {
    let outcome = store
        .upgrade(&opts.script_name, opts.skip_config)
        .await?;

    match &outcome {
        UpgradeOutcome::Upgraded {
            copied,
            config_skipped,
        } => {
            info!("upgraded {} ({copied} files written)", opts.script_name);
            if *config_skipped {
                info!("local configuration of {} left untouched", opts.script_name);
            }
        }
        UpgradeOutcome::ManualIntervention { .. } => {
            if let Some(guidance) = outcome.guidance() {
                warn!("{guidance}");
            }
        }
    }

    Ok(())
}

async fn run_list(store: &Store<GithubFetcher>) -> Result<()> {
    for name in store.list().await? {
        println!("{name}");
    }

    Ok(())
}

async fn run_search(store: &Store<GithubFetcher>, opts: SearchOptions) -> Result<()> {
    let query = opts.query.join(" ");
    for hit in store.search(&query).await? {
        println!("{hit}");
    }

    Ok(())
}

async fn run_info(store: &Store<GithubFetcher>, opts: InfoOptions) -> Result<()> {
    let readme = store.info(&opts.script_name).await?;
    let mut out = stdout().lock();
    out.write_all(b"\n")?;
    out.write_all(&readme)?;
    out.write_all(b"\n")?;
    out.flush()?;

    Ok(())
}
