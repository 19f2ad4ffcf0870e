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
use appcenter_core::{EventFlags, PluginAction, PluginEvent, PluginResult};
use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;

/// Refresh plugin metadata older than `cache_age`.
///
/// Plugin failures become events; only cancellation fails the job.
pub struct RefreshMetadataJob {
    state: JobState,
    cache_age: Duration,
    interactive: bool,
}

impl RefreshMetadataJob {
    pub fn new(cache_age: Duration) -> Self {
        Self {
            state: JobState::new(),
            cache_age,
            interactive: false,
        }
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn cache_age(&self) -> Duration {
        self.cache_age
    }
}

#[async_trait]
impl PluginJob for RefreshMetadataJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "refresh-metadata"
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        ctx.check_cancelled()?;
        let plugins = loader.registry().plugins_with(Capability::RefreshMetadata);
        let calls = plugins.iter().map(|entry| async move {
            (entry, entry.plugin().refresh_metadata(self.cache_age, ctx).await)
        });

        let mut errors = ErrorFold::new();
        for (entry, result) in join_all(calls).await {
            match result {
                Ok(()) => tracing::debug!(plugin = %entry.name(), "metadata refreshed"),
                Err(e) if e.is_cancelled() => errors.add(e),
                Err(e) => {
                    tracing::debug!(plugin = %entry.name(), error = %e, "failed to refresh metadata");
                    let mut flags = EventFlags::WARNING;
                    if self.interactive {
                        flags.insert(EventFlags::VISIBLE | EventFlags::INTERACTIVE);
                    }
                    ctx.emit(
                        PluginEvent::builder()
                            .with_plugin(entry.name())
                            .with_action(PluginAction::RefreshMetadata)
                            .with_error(e)
                            .with_flags(flags)
                            .build(),
                    );
                }
            }
        }
        errors.into_result()
    }
}
