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
use appcenter_core::{AppList, AppRef, PluginError, PluginResult};
use async_trait::async_trait;

/// Launch an installed app through its management plugin
pub struct LaunchJob {
    state: JobState,
    app: AppRef,
}

impl LaunchJob {
    pub fn new(app: AppRef) -> Self {
        Self {
            state: JobState::new(),
            app,
        }
    }

    pub fn app(&self) -> &AppRef {
        &self.app
    }
}

#[async_trait]
impl PluginJob for LaunchJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "launch"
    }

    fn is_interactive(&self) -> bool {
        true
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        if self.app.management_plugin().is_none() {
            loader
                .registry()
                .run_adopt(&AppList::from_app(self.app.clone()));
        }
        let entry = self
            .app
            .management_plugin()
            .and_then(|name| loader.registry().find_plugin(&name))
            .filter(|entry| entry.is_enabled() && entry.has(Capability::Launch))
            .ok_or_else(|| {
                PluginError::NotSupported(format!("no plugin can launch {}", self.app.describe()))
            })?;
        ctx.check_cancelled()?;
        tracing::debug!(plugin = %entry.name(), app = %self.app.describe(), "launching");
        entry.plugin().launch(&self.app, ctx).await
    }
}
