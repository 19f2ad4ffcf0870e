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

//! The plugin interface
//!
//! Backends implement [`Plugin`] and list the operations they support in
//! [`Plugin::capabilities`]. Every operation has a default implementation
//! returning `NotSupported`; the loader never calls an operation the
//! plugin did not declare.

use crate::capabilities::CapabilitySet;
use crate::events::EventSink;
use crate::resolver::PluginRule;
use appcenter_core::{
    AppList, AppQuery, AppRef, CategoryRef, ListAppsFlags, PluginError, PluginEvent,
    PluginResult, RefineFlags, RefineJobFlags,
};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-call context handed to every plugin operation
#[derive(Debug, Clone)]
pub struct PluginContext {
    cancellable: CancellationToken,
    events: EventSink,
    interactive: bool,
}

impl PluginContext {
    pub fn new(cancellable: CancellationToken, events: EventSink) -> Self {
        Self {
            cancellable,
            events,
            interactive: false,
        }
    }

    /// Context for calls made outside any job, such as setup
    pub fn detached() -> Self {
        Self::new(CancellationToken::new(), EventSink::discard())
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn cancellable(&self) -> &CancellationToken {
        &self.cancellable
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellable.is_cancelled()
    }

    /// Fail with `Cancelled` once the token has fired
    pub fn check_cancelled(&self) -> PluginResult<()> {
        if self.cancellable.is_cancelled() {
            Err(PluginError::cancelled())
        } else {
            Ok(())
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn events(&self) -> &EventSink {
        &self.events
    }

    pub fn emit(&self, event: PluginEvent) {
        self.events.emit(event);
    }
}

/// A backend plugin
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable plugin name
    fn name(&self) -> &str;

    /// Batch rank during refine; lower runs first
    fn order(&self) -> i32 {
        0
    }

    /// Dedupe tie-break weight
    fn priority(&self) -> i32 {
        0
    }

    fn rules(&self) -> Vec<PluginRule> {
        Vec::new()
    }

    fn capabilities(&self) -> CapabilitySet;

    /// One-time initialization. An error disables the plugin.
    async fn setup(&self, _ctx: &PluginContext) -> PluginResult<()> {
        Ok(())
    }

    /// Claim an app by setting its management plugin
    fn adopt_app(&self, _app: &AppRef) {}

    /// Enrich every app in the list with the fields in `flags`.
    ///
    /// Must be idempotent. Wildcards are skipped here; see
    /// [`Plugin::refine_wildcard`].
    async fn refine(
        &self,
        _list: &AppList,
        _job_flags: RefineJobFlags,
        _flags: RefineFlags,
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        Err(PluginError::not_supported("refine"))
    }

    /// Return fresh concrete candidates for a wildcard.
    ///
    /// The wildcard itself must not be modified.
    async fn refine_wildcard(
        &self,
        _wildcard: &AppRef,
        _flags: RefineFlags,
        _ctx: &PluginContext,
    ) -> PluginResult<AppList> {
        Err(PluginError::not_supported("refine wildcard"))
    }

    /// Answer a query; return an empty list when it does not apply
    async fn list_apps(
        &self,
        _query: &AppQuery,
        _flags: ListAppsFlags,
        _ctx: &PluginContext,
    ) -> PluginResult<AppList> {
        Err(PluginError::not_supported("list apps"))
    }

    async fn refine_categories(
        &self,
        _categories: &[CategoryRef],
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        Err(PluginError::not_supported("refine categories"))
    }

    async fn refresh_metadata(&self, _cache_age: Duration, _ctx: &PluginContext) -> PluginResult<()> {
        Err(PluginError::not_supported("refresh metadata"))
    }

    async fn install_apps(&self, _apps: &AppList, _ctx: &PluginContext) -> PluginResult<()> {
        Err(PluginError::not_supported("install"))
    }

    async fn uninstall_apps(&self, _apps: &AppList, _ctx: &PluginContext) -> PluginResult<()> {
        Err(PluginError::not_supported("uninstall"))
    }

    async fn launch(&self, _app: &AppRef, _ctx: &PluginContext) -> PluginResult<()> {
        Err(PluginError::not_supported("launch"))
    }

    async fn file_to_app(&self, _path: &Path, _ctx: &PluginContext) -> PluginResult<AppList> {
        Err(PluginError::not_supported("file to app"))
    }

    async fn url_to_app(&self, _url: &str, _ctx: &PluginContext) -> PluginResult<AppList> {
        Err(PluginError::not_supported("url to app"))
    }
}
