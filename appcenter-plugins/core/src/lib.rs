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

//! Appcenter plugin orchestration
//!
//! Backends are exposed as [`Plugin`]s. The [`PluginLoader`] owns them,
//! resolves their ordering rules, and processes jobs: listing apps,
//! refining them, counting categories, installing, removing, launching and
//! resolving files or URLs to apps.
//!
//! # Refinement
//!
//! [`Refiner`] runs plugins in batches of equal order. Within a batch the
//! plugins run concurrently; batches run one after another so later plugins
//! see earlier results. Wildcard apps are resolved into concrete candidates,
//! addons and related apps are refined recursively, and reviews and remote
//! resources are handled once all plugins are done.
//!
//! # Example
//!
//! ```rust,ignore
//! use appcenter_plugins::{builtin, job::ListAppsJob, PluginLoader};
//! use appcenter_core::{AppQuery, ListAppsFlags, LoaderConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let loader = PluginLoader::new(LoaderConfig::default());
//!     builtin::register_builtin(&loader)?;
//!     loader.setup().await?;
//!
//!     let query = AppQuery::builder().with_keywords(["zeus"]).build();
//!     let job = ListAppsJob::new(query, ListAppsFlags::empty());
//!     loader.job_process(&job, CancellationToken::new()).await?;
//!     for app in &job.result_list().unwrap_or_default() {
//!         println!("{}", app.describe());
//!     }
//!     Ok(())
//! }
//! ```

pub mod builtin;
pub mod cache;
pub mod capabilities;
pub mod events;
pub mod job;
pub mod loader;
pub mod odrs;
pub mod plugin;
pub mod refine;
pub mod registry;
pub mod resolver;
pub mod rewrite;
pub mod sync;

// Re-exports
pub use cache::AppCache;
pub use capabilities::{Capability, CapabilitySet};
pub use events::{EventSink, EventStream};
pub use job::{JobState, PluginJob};
pub use loader::PluginLoader;
pub use odrs::{ReviewProvider, StaticReviewProvider};
pub use plugin::{Plugin, PluginContext};
pub use refine::{ErrorFold, Refiner};
pub use registry::{app_is_valid, PluginEntry, PluginRegistry};
pub use resolver::{DependencyResolver, PluginRule, PluginSpec, ResolvedPlugin};
pub use rewrite::{CssResourceRewriter, ResourceRewriter};
