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

//! Plugin loader
//!
//! Owns the registry, the shared app cache and the auxiliary providers, sets
//! plugins up and processes jobs.

use crate::cache::AppCache;
use crate::job::PluginJob;
use crate::odrs::{ReviewProvider, StaticReviewProvider};
use crate::plugin::{Plugin, PluginContext};
use crate::refine::Refiner;
use crate::registry::PluginRegistry;
use crate::resolver::DependencyResolver;
use crate::rewrite::{CssResourceRewriter, ResourceRewriter};
use appcenter_core::{LoaderConfig, PluginError, PluginEvent, PluginResult};
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Plugin loader
pub struct PluginLoader {
    config: LoaderConfig,
    registry: Arc<PluginRegistry>,
    cache: Arc<AppCache>,
    reviews: Arc<dyn ReviewProvider>,
    rewriter: Arc<dyn ResourceRewriter>,
    /// Events from finished jobs, deduplicated by unique id
    events: Mutex<Vec<PluginEvent>>,
    /// Concurrency limiter for background jobs
    background: Arc<Semaphore>,
}

impl PluginLoader {
    pub fn new(config: LoaderConfig) -> Self {
        let rewriter = Arc::new(CssResourceRewriter::new(config.cache_dir.clone()));
        let background = Arc::new(Semaphore::new(config.max_background_jobs.max(1)));
        Self {
            config,
            registry: Arc::new(PluginRegistry::new()),
            cache: Arc::new(AppCache::new()),
            reviews: Arc::new(StaticReviewProvider::new()),
            rewriter,
            events: Mutex::new(Vec::new()),
            background,
        }
    }

    pub fn with_review_provider(mut self, provider: Arc<dyn ReviewProvider>) -> Self {
        self.reviews = provider;
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn ResourceRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn cache(&self) -> &Arc<AppCache> {
        &self.cache
    }

    pub fn register(&self, plugin: Arc<dyn Plugin>) -> PluginResult<()> {
        tracing::debug!(plugin = %plugin.name(), "registering plugin");
        self.registry.register(plugin)
    }

    /// Apply allow/block lists, resolve plugin rules, then set up every
    /// enabled plugin. A plugin whose setup fails is disabled.
    pub async fn setup(&self) -> PluginResult<()> {
        self.config
            .validate()
            .map_err(|e| PluginError::Failed(e.to_string()))?;

        for entry in self.registry.get_plugins() {
            if !self.config.is_plugin_allowed(entry.name()) {
                tracing::debug!(plugin = %entry.name(), "disabled by configuration");
                entry.set_enabled(false);
            }
        }

        let mut resolver = DependencyResolver::new();
        for spec in self.registry.specs() {
            resolver.add_available(spec);
        }
        let resolved = resolver.resolve()?;
        self.registry.apply_resolution(&resolved);

        let ctx = PluginContext::detached();
        let setups = self
            .registry
            .get_plugins()
            .into_iter()
            .filter(|entry| entry.is_enabled())
            .map(|entry| {
                let ctx = &ctx;
                async move {
                    let result = entry.plugin().setup(ctx).await;
                    (entry, result)
                }
            });

        for (entry, result) in join_all(setups).await {
            match result {
                Ok(()) => tracing::debug!(
                    plugin = %entry.name(),
                    order = entry.order(),
                    priority = entry.priority(),
                    "plugin set up"
                ),
                Err(e) => {
                    tracing::warn!(plugin = %entry.name(), error = %e, "failed to set up plugin, disabling");
                    entry.set_enabled(false);
                }
            }
        }

        tracing::info!(
            enabled = self.registry.get_plugins().iter().filter(|e| e.is_enabled()).count(),
            total = self.registry.count(),
            "plugin loader ready"
        );
        Ok(())
    }

    /// Refinement engine bound to this loader's plugins and providers
    pub fn refiner(&self) -> Refiner {
        Refiner::new(self.registry.clone())
            .with_review_provider(self.reviews.clone())
            .with_rewriter(self.rewriter.clone())
    }

    /// Run a job to completion.
    ///
    /// Non-interactive jobs wait for a background slot first; a job
    /// cancelled while waiting still completes, failing with `Cancelled`.
    /// The job's events are collected into the loader once it completes,
    /// whether it succeeded or not.
    pub async fn job_process(
        &self,
        job: &dyn PluginJob,
        cancellable: CancellationToken,
    ) -> PluginResult<()> {
        let _permit = if job.is_interactive() {
            None
        } else {
            let permit = tokio::select! {
                biased;
                _ = cancellable.cancelled() => {
                    return Err(job.state().abandon(PluginError::cancelled()));
                }
                permit = self.background.clone().acquire_owned() => permit
                    .map_err(|_| PluginError::Failed("job queue closed".to_string()))?,
            };
            Some(permit)
        };

        let result = job.run(self, cancellable).await;
        for event in job.state().events() {
            self.add_event(event);
        }
        result
    }

    /// Record an event, ignoring duplicates of one already held
    pub fn add_event(&self, event: PluginEvent) {
        let mut events = self.events.lock();
        if events.iter().any(|e| e.unique_id() == event.unique_id()) {
            tracing::debug!(event = %event.unique_id(), "ignoring duplicate event");
            return;
        }
        events.push(event);
    }

    pub fn events(&self) -> Vec<PluginEvent> {
        self.events.lock().clone()
    }

    pub fn remove_events(&self) {
        self.events.lock().clear();
    }
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::{Capability, CapabilitySet};
    use crate::job::RefineJob;
    use crate::resolver::PluginRule;
    use async_trait::async_trait;
    use appcenter_core::{App, AppList, PluginAction, RefineFlags, RefineJobFlags};
    use std::time::Duration;

    struct Setup {
        name: &'static str,
        fail: bool,
        rules: Vec<PluginRule>,
    }

    #[async_trait]
    impl Plugin for Setup {
        fn name(&self) -> &str {
            self.name
        }

        fn rules(&self) -> Vec<PluginRule> {
            self.rules.clone()
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::Refine)
        }

        async fn setup(&self, _ctx: &PluginContext) -> PluginResult<()> {
            if self.fail {
                Err(PluginError::NoNetwork("offline".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn plugin(name: &'static str) -> Arc<Setup> {
        Arc::new(Setup {
            name,
            fail: false,
            rules: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_setup_disables_failing_and_blocked() {
        let config = LoaderConfig {
            blocklist: vec!["blocked".to_string()],
            ..Default::default()
        };
        let loader = PluginLoader::new(config);
        loader.register(plugin("good")).unwrap();
        loader.register(plugin("blocked")).unwrap();
        loader
            .register(Arc::new(Setup {
                name: "broken",
                fail: true,
                rules: Vec::new(),
            }))
            .unwrap();

        loader.setup().await.unwrap();
        let registry = loader.registry();
        assert!(registry.find_plugin("good").unwrap().is_enabled());
        assert!(!registry.find_plugin("blocked").unwrap().is_enabled());
        assert!(!registry.find_plugin("broken").unwrap().is_enabled());
    }

    #[tokio::test]
    async fn test_setup_applies_rules() {
        let loader = PluginLoader::default();
        loader
            .register(Arc::new(Setup {
                name: "aaa",
                fail: false,
                rules: vec![PluginRule::RunAfter("zzz".to_string())],
            }))
            .unwrap();
        loader.register(plugin("zzz")).unwrap();

        loader.setup().await.unwrap();
        assert_eq!(loader.registry().plugin_names(), vec!["zzz", "aaa"]);
    }

    #[tokio::test]
    async fn test_setup_rejects_cycle() {
        let loader = PluginLoader::default();
        loader
            .register(Arc::new(Setup {
                name: "a",
                fail: false,
                rules: vec![PluginRule::RunAfter("b".to_string())],
            }))
            .unwrap();
        loader
            .register(Arc::new(Setup {
                name: "b",
                fail: false,
                rules: vec![PluginRule::RunAfter("a".to_string())],
            }))
            .unwrap();

        let err = loader.setup().await.unwrap_err();
        assert!(matches!(err, PluginError::DepsolveFailed(_)));
    }

    #[tokio::test]
    async fn test_cancelled_while_queued_completes() {
        let loader = PluginLoader::new(LoaderConfig {
            max_background_jobs: 1,
            ..Default::default()
        });
        let _slot = loader.background.clone().acquire_owned().await.unwrap();
        let list = AppList::from_app(App::new("zeus.desktop"));
        let job = RefineJob::new(&list, RefineJobFlags::empty(), RefineFlags::ICON);
        let token = CancellationToken::new();

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let (result, ()) = tokio::join!(loader.job_process(&job, token.clone()), canceller);
        assert!(result.unwrap_err().is_cancelled());
        assert!(job.state().is_completed());
        assert!(job.state().error().unwrap().is_cancelled());
        assert!(job.result_list().is_none());

        // a second attempt reports the run-once violation instead
        let err = loader.job_process(&job, token).await.unwrap_err();
        assert!(matches!(err, PluginError::Failed(_)));
    }

    #[test]
    fn test_events_deduplicated() {
        let loader = PluginLoader::default();
        let app = App::new("zeus.desktop");
        let event = || {
            PluginEvent::builder()
                .with_app(app.clone())
                .with_action(PluginAction::Install)
                .with_error(PluginError::NoSpace("disk full".to_string()))
                .build()
        };
        loader.add_event(event());
        loader.add_event(event());
        assert_eq!(loader.events().len(), 1);
        loader.remove_events();
        assert!(loader.events().is_empty());
    }
}
