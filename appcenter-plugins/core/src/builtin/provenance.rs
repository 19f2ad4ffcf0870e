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

//! Marks apps shipped by the distribution

use crate::capabilities::{Capability, CapabilitySet};
use crate::plugin::{Plugin, PluginContext};
use crate::resolver::PluginRule;
use appcenter_core::{AppList, PluginResult, Quirks, RefineFlags, RefineJobFlags};
use async_trait::async_trait;

/// Sets the provenance quirk on apps from a trusted origin
pub struct ProvenancePlugin {
    origins: Vec<String>,
}

impl ProvenancePlugin {
    pub const NAME: &'static str = "provenance";

    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    fn is_trusted(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }
}

#[async_trait]
impl Plugin for ProvenancePlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn order(&self) -> i32 {
        20
    }

    // Origins are only known once the catalog has refined
    fn rules(&self) -> Vec<PluginRule> {
        vec![PluginRule::RunAfter(super::CatalogPlugin::NAME.to_string())]
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::new().with(Capability::Refine)
    }

    async fn refine(
        &self,
        list: &AppList,
        _job_flags: RefineJobFlags,
        flags: RefineFlags,
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        if !flags.contains(RefineFlags::PROVENANCE) || self.origins.is_empty() {
            return Ok(());
        }
        for app in list {
            if app.has_quirk(Quirks::PROVENANCE) {
                continue;
            }
            if app.origin().is_some_and(|origin| self.is_trusted(&origin)) {
                app.add_quirk(Quirks::PROVENANCE);
            }
        }
        Ok(())
    }
}
