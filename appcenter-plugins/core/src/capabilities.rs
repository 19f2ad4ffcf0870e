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

//! Plugin capabilities
//!
//! A plugin declares the operations it implements. The loader only calls
//! an operation on plugins whose capability set contains it; everyone else
//! abstains.

use appcenter_core::PluginAction;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Individual operation a plugin can implement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Claim ownership of orphan apps
    AdoptApp,
    /// Enrich apps with requested fields
    Refine,
    /// Resolve wildcard placeholders into concrete apps
    RefineWildcard,
    /// Answer app queries
    ListApps,
    /// Fill category sizes
    RefineCategories,
    /// Refresh cached metadata
    RefreshMetadata,
    InstallApps,
    UninstallApps,
    Launch,
    FileToApp,
    UrlToApp,
}

impl Capability {
    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Capability::AdoptApp => "Adopt orphan apps",
            Capability::Refine => "Refine app metadata",
            Capability::RefineWildcard => "Resolve wildcard apps",
            Capability::ListApps => "List apps matching a query",
            Capability::RefineCategories => "Count apps per category",
            Capability::RefreshMetadata => "Refresh metadata",
            Capability::InstallApps => "Install apps",
            Capability::UninstallApps => "Uninstall apps",
            Capability::Launch => "Launch apps",
            Capability::FileToApp => "Convert a local file to an app",
            Capability::UrlToApp => "Convert a URL to an app",
        }
    }

    /// Check if this capability changes the system
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Capability::InstallApps | Capability::UninstallApps | Capability::Launch
        )
    }

    /// Action reported on events raised by this operation
    pub fn action(&self) -> PluginAction {
        match self {
            Capability::AdoptApp | Capability::Refine | Capability::RefineWildcard => {
                PluginAction::Refine
            }
            Capability::ListApps => PluginAction::ListApps,
            Capability::RefineCategories => PluginAction::RefineCategories,
            Capability::RefreshMetadata => PluginAction::RefreshMetadata,
            Capability::InstallApps => PluginAction::Install,
            Capability::UninstallApps => PluginAction::Uninstall,
            Capability::Launch => PluginAction::Launch,
            Capability::FileToApp => PluginAction::FileToApp,
            Capability::UrlToApp => PluginAction::UrlToApp,
        }
    }
}

/// A set of capabilities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    capabilities: HashSet<Capability>,
}

impl CapabilitySet {
    /// Create an empty capability set
    pub fn new() -> Self {
        Self {
            capabilities: HashSet::new(),
        }
    }

    /// Add a capability
    pub fn add(&mut self, cap: Capability) {
        self.capabilities.insert(cap);
    }

    /// Builder-style add
    pub fn with(mut self, cap: Capability) -> Self {
        self.add(cap);
        self
    }

    /// Remove a capability
    pub fn remove(&mut self, cap: &Capability) {
        self.capabilities.remove(cap);
    }

    /// Check if a capability is present
    pub fn has(&self, cap: &Capability) -> bool {
        self.capabilities.contains(cap)
    }

    /// Get all capabilities
    pub fn all(&self) -> impl Iterator<Item = &Capability> {
        self.capabilities.iter()
    }

    /// Get mutating capabilities
    pub fn mutating(&self) -> Vec<&Capability> {
        self.capabilities
            .iter()
            .filter(|c| c.is_mutating())
            .collect()
    }

    /// Check if set is empty
    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Number of capabilities
    pub fn len(&self) -> usize {
        self.capabilities.len()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self {
            capabilities: iter.into_iter().collect(),
        }
    }
}
