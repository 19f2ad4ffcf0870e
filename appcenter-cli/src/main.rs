// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Appcenter CLI
//!
//! Command-line front end over the plugin loader and the built-in plugins.

use anyhow::{anyhow, Context, Result};
use appcenter_core::{
    query::{sort_by_match_value, sort_by_name},
    App, AppKind, AppList, AppQuery, AppQueryBuilder, AppRef, DedupeFlags, ListAppsFlags, LoaderConfig,
    RefineFlags, RefineJobFlags,
};
use appcenter_plugins::builtin::register_builtin;
use appcenter_plugins::job::{
    InstallAppsJob, ListAppsJob, RefineJob, RefreshMetadataJob, UninstallAppsJob, UrlToAppJob,
};
use appcenter_plugins::{sync, PluginJob, PluginLoader};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "appcenter")]
#[command(about = "Appcenter - find, install and manage apps", long_about = None)]
struct Cli {
    /// Loader configuration file (.toml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose mode
    #[arg(short, long)]
    verbose: bool,

    /// Comma separated refine flags, e.g. `license,icon,addons`
    #[arg(long, default_value = "")]
    refine: String,

    /// Maximum number of apps to print, 0 for all
    #[arg(long, default_value = "0")]
    max_results: usize,

    /// Run jobs as user-initiated
    #[arg(long)]
    interactive: bool,

    /// Output as JSON (machine-readable)
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List installed apps
    Installed,

    /// Search apps by keyword
    Search {
        /// Search terms, all of which must match
        #[arg(required = true)]
        terms: Vec<String>,
    },

    /// Install an app by id or `scheme://` URL
    Install { id: String },

    /// Remove an app by id or `scheme://` URL
    Remove { id: String },

    /// Show an app refined with the requested flags
    Refine { id: String },

    /// List curated apps
    Popular,

    /// List software sources
    Sources,

    /// Refresh plugin metadata
    Refresh {
        /// Metadata younger than this is kept
        #[arg(long, default_value = "86400")]
        cache_age: u64,
    },

    /// List plugins in run order
    Plugins,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "appcenter=debug,appcenter_plugins=debug,appcenter_core=debug"
    } else {
        "appcenter=info,appcenter_plugins=info,appcenter_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<LoaderConfig> {
    match path {
        Some(path) => LoaderConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => LoaderConfig::from_env().context("Invalid APPCENTER_* environment"),
    }
}

struct Runner {
    loader: PluginLoader,
    refine: RefineFlags,
    max_results: usize,
    interactive: bool,
    json: bool,
}

impl Runner {
    fn process(&self, job: &dyn PluginJob) -> Result<()> {
        let result = sync::job_process_sync(&self.loader, job, CancellationToken::new());
        for event in self.loader.events() {
            if let Some(error) = event.error() {
                eprintln!("warning: {}", error);
            }
        }
        self.loader.remove_events();
        result.with_context(|| format!("{} failed", job.name()))
    }

    fn job_flags(&self) -> RefineJobFlags {
        if self.interactive {
            RefineJobFlags::INTERACTIVE
        } else {
            RefineJobFlags::empty()
        }
    }

    fn list(&self, query: AppQuery) -> Result<()> {
        let job = ListAppsJob::new(query, ListAppsFlags::empty());
        self.process(&job)?;
        self.print(&job.result_list().unwrap_or_default())
    }

    fn query(&self) -> AppQueryBuilder {
        AppQuery::builder()
            .with_refine_job_flags(self.job_flags())
            .with_refine_require_flags(self.refine)
            .with_max_results(self.max_results)
            .with_dedupe_flags(DedupeFlags::KEY_ID)
    }

    /// Resolve an id or URL to a single refined app
    fn resolve(&self, id: &str) -> Result<AppRef> {
        let list = if id.contains("://") {
            let job = UrlToAppJob::new(id, self.refine);
            self.process(&job)?;
            job.result_list().unwrap_or_default()
        } else {
            let wildcard = AppList::from_app(App::new_wildcard(id, AppKind::Unknown));
            let flags = self.job_flags() | RefineJobFlags::DISABLE_FILTERING;
            let job = RefineJob::new(&wildcard, flags, self.refine | RefineFlags::ICON);
            self.process(&job)?;
            job.result_list().unwrap_or_default()
        };
        list.iter()
            .find(|app| !app.is_wildcard())
            .cloned()
            .ok_or_else(|| anyhow!("No app found for {}", id))
    }

    fn print(&self, list: &AppList) -> Result<()> {
        if self.json {
            let apps: Vec<_> = list
                .iter()
                .map(|app| {
                    serde_json::json!({
                        "unique_id": app.unique_id(),
                        "id": app.id(),
                        "kind": app.kind().as_str(),
                        "state": app.state().as_str(),
                        "name": app.name(),
                        "summary": app.summary(),
                        "origin": app.origin(),
                        "license": app.license(),
                        "management_plugin": app.management_plugin(),
                        "addons": app.addons().iter().filter_map(|a| a.id()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&apps)?);
            return Ok(());
        }
        for app in list {
            println!(
                "{}\t{}\t{}",
                app.describe(),
                app.state(),
                app.name().unwrap_or_default()
            );
        }
        Ok(())
    }

    fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Installed => self.list(
                self.query()
                    .with_is_installed(true)
                    .with_sort_func(sort_by_name())
                    .build(),
            ),
            Commands::Search { terms } => self.list(
                self.query()
                    .with_keywords(terms)
                    .with_sort_func(sort_by_match_value())
                    .build(),
            ),
            // curated results are wildcards, resolved only when something is required
            Commands::Popular => self.list(
                self.query()
                    .with_is_curated(true)
                    .with_refine_require_flags(self.refine | RefineFlags::ICON)
                    .build(),
            ),
            Commands::Sources => self.list(
                self.query()
                    .with_refine_job_flags(self.job_flags() | RefineJobFlags::DISABLE_FILTERING)
                    .with_component_kinds(vec![AppKind::Repository])
                    .with_sort_func(sort_by_name())
                    .build(),
            ),
            Commands::Refine { id } => {
                let app = self.resolve(&id)?;
                self.print(&AppList::from_app(app))
            }
            Commands::Install { id } => {
                let apps = AppList::from_app(self.resolve(&id)?);
                let job = InstallAppsJob::new(&apps).with_interactive(self.interactive);
                self.process(&job)?;
                self.print(&apps)
            }
            Commands::Remove { id } => {
                let apps = AppList::from_app(self.resolve(&id)?);
                let job = UninstallAppsJob::new(&apps).with_interactive(self.interactive);
                self.process(&job)?;
                self.print(&apps)
            }
            Commands::Refresh { cache_age } => {
                let job = RefreshMetadataJob::new(Duration::from_secs(cache_age))
                    .with_interactive(self.interactive);
                self.process(&job)?;
                println!("Metadata refreshed");
                Ok(())
            }
            Commands::Plugins => {
                for entry in self.loader.registry().get_plugins() {
                    let caps: Vec<String> = entry
                        .capabilities()
                        .all()
                        .map(|cap| format!("{:?}", cap))
                        .collect();
                    println!(
                        "{}\torder={}\t{}\t{}",
                        entry.name(),
                        entry.order(),
                        if entry.is_enabled() { "enabled" } else { "disabled" },
                        caps.join(",")
                    );
                }
                Ok(())
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_ref())?;
    let refine = RefineFlags::parse_list(&cli.refine).map_err(|e| anyhow!(e))?;

    let loader = PluginLoader::new(config);
    register_builtin(&loader).context("Failed to register built-in plugins")?;
    sync::setup_sync(&loader).context("Failed to set up plugins")?;

    let runner = Runner {
        loader,
        refine,
        max_results: cli.max_results,
        interactive: cli.interactive,
        json: cli.json,
    };
    runner.run(cli.command)
}
