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

use super::{JobState, PluginJob};
use crate::capabilities::Capability;
use crate::loader::PluginLoader;
use crate::plugin::PluginContext;
use crate::refine::ErrorFold;
use appcenter_core::{CategoryRef, PluginResult};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;

/// Count the apps in each category
pub struct ListCategoriesJob {
    state: JobState,
    categories: Vec<CategoryRef>,
    interactive: bool,
    result: Mutex<Option<Vec<CategoryRef>>>,
}

impl ListCategoriesJob {
    pub fn new(categories: Vec<CategoryRef>) -> Self {
        Self {
            state: JobState::new(),
            categories,
            interactive: false,
            result: Mutex::new(None),
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Categories with their sizes, once the job succeeded
    pub fn result_categories(&self) -> Option<Vec<CategoryRef>> {
        self.result.lock().clone()
    }
}

#[async_trait]
impl PluginJob for ListCategoriesJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "list-categories"
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        for category in &self.categories {
            category.reset_size();
        }
        ctx.check_cancelled()?;

        let plugins = loader.registry().plugins_with(Capability::RefineCategories);
        let calls = plugins.iter().map(|entry| async move {
            (entry.name(), entry.plugin().refine_categories(&self.categories, ctx).await)
        });

        let mut errors = ErrorFold::new();
        for (name, result) in join_all(calls).await {
            if let Err(e) = result {
                errors.add_swallowing(name, e);
            }
        }
        errors.into_result()?;

        *self.result.lock() = Some(self.categories.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::plugin::Plugin;
    use appcenter_core::{Category, PluginError};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct Counter(&'static str);

    #[async_trait]
    impl Plugin for Counter {
        fn name(&self) -> &str {
            self.0
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::RefineCategories)
        }

        async fn refine_categories(
            &self,
            categories: &[CategoryRef],
            _ctx: &PluginContext,
        ) -> PluginResult<()> {
            if self.0 == "broken" {
                return Err(PluginError::Failed("no index".to_string()));
            }
            for category in categories {
                category.increment_size(1);
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sizes_summed_across_plugins() {
        let loader = PluginLoader::default();
        loader.register(Arc::new(Counter("one"))).unwrap();
        loader.register(Arc::new(Counter("two"))).unwrap();
        loader.register(Arc::new(Counter("broken"))).unwrap();
        loader.setup().await.unwrap();

        let audio = Category::new("audio", "Audio", ["AudioVideo"]);
        audio.increment_size(1);
        let job = ListCategoriesJob::new(vec![audio.clone()]);
        loader.job_process(&job, CancellationToken::new()).await.unwrap();

        assert_eq!(audio.size(), 2);
        assert_eq!(job.result_categories().unwrap().len(), 1);
    }
}
