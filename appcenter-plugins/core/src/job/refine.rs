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
use crate::loader::PluginLoader;
use crate::plugin::PluginContext;
use appcenter_core::{AppList, PluginResult, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Refine a list of apps. The input list is never modified.
pub struct RefineJob {
    state: JobState,
    list: AppList,
    job_flags: RefineJobFlags,
    refine_flags: RefineFlags,
    result: Mutex<Option<AppList>>,
}

impl RefineJob {
    /// Implied requirements are added to `refine_flags`
    pub fn new(list: &AppList, job_flags: RefineJobFlags, refine_flags: RefineFlags) -> Self {
        Self {
            state: JobState::new(),
            list: list.copy(),
            job_flags,
            refine_flags: refine_flags.with_implied(),
            result: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.state = self.state.with_timeout(timeout);
        self
    }

    pub fn refine_flags(&self) -> RefineFlags {
        self.refine_flags
    }

    /// The refined list, once the job succeeded
    pub fn result_list(&self) -> Option<AppList> {
        self.result.lock().clone()
    }
}

#[async_trait]
impl PluginJob for RefineJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "refine"
    }

    fn is_interactive(&self) -> bool {
        self.job_flags.contains(RefineJobFlags::INTERACTIVE)
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        let refined = loader
            .refiner()
            .run(&self.list, self.job_flags, self.refine_flags, ctx)
            .await?;
        *self.result.lock() = Some(refined);
        Ok(())
    }
}
