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

//! Dummy backend
//!
//! A self-contained backend used for demos and integration tests. It manages
//! the fixture apps and anything with a `dummy:` id, installs and removes
//! them by walking the state machine, and offers a few hooks for exercising
//! the job machinery: searching for `hang` blocks until the job is
//! cancelled, and installing `dummy:fail` always fails.

use crate::cache::AppCache;
use crate::capabilities::{Capability, CapabilitySet};
use crate::plugin::{Plugin, PluginContext};
use appcenter_core::{
    App, AppKind, AppList, AppQuery, AppRef, AppState, ListAppsFlags, PluginError, PluginResult,
    RefineFlags, RefineJobFlags,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Apps this plugin owns regardless of their id prefix
const MANAGED_IDS: &[&str] = &["chiron.desktop", "zeus.desktop", "zeus-spell.addon"];

/// Apps returned for the curated query, resolved by whoever knows them
const CURATED_IDS: &[&str] = &["zeus.desktop", "chiron.desktop"];

const ID_PREFIX: &str = "dummy:";
const URL_SCHEME: &str = "dummy://";
const FAIL_ID: &str = "dummy:fail";
const HANG_KEYWORD: &str = "hang";

pub struct DummyPlugin {
    cache: Arc<AppCache>,
    last_refresh: Mutex<Option<Instant>>,
}

impl DummyPlugin {
    pub const NAME: &'static str = "dummy";

    pub fn new(cache: Arc<AppCache>) -> Self {
        Self {
            cache,
            last_refresh: Mutex::new(None),
        }
    }

    fn owns(app: &App) -> bool {
        let Some(id) = app.id() else {
            return false;
        };
        id.starts_with(ID_PREFIX)
            || MANAGED_IDS.contains(&id.as_str())
            || app.sources().iter().any(|s| s == "chiron")
    }

    fn is_managed(app: &App) -> bool {
        app.management_plugin().as_deref() == Some(Self::NAME)
    }

    /// Time since the last metadata refresh, if any
    pub fn last_refresh_age(&self) -> Option<Duration> {
        self.last_refresh.lock().map(|at| at.elapsed())
    }

    async fn install_one(&self, app: &AppRef, ctx: &PluginContext) -> PluginResult<()> {
        if !app.set_state(AppState::Installing) {
            return Err(PluginError::Failed(format!(
                "cannot install {} from state {}",
                app.describe(),
                app.state()
            )));
        }
        if app.id().as_deref() == Some(FAIL_ID) {
            app.set_state_recover();
            return Err(PluginError::Failed(format!(
                "installation of {} failed",
                app.describe()
            )));
        }
        for progress in [25, 50, 75, 100] {
            if let Err(e) = ctx.check_cancelled() {
                app.set_state_recover();
                return Err(e);
            }
            app.set_progress(progress);
            tokio::task::yield_now().await;
        }
        app.set_state(AppState::Installed);
        tracing::info!(app = %app.describe(), "installed");
        Ok(())
    }

    async fn uninstall_one(&self, app: &AppRef, ctx: &PluginContext) -> PluginResult<()> {
        if !app.set_state(AppState::Removing) {
            return Err(PluginError::Failed(format!(
                "cannot remove {} from state {}",
                app.describe(),
                app.state()
            )));
        }
        if let Err(e) = ctx.check_cancelled() {
            app.set_state_recover();
            return Err(e);
        }
        app.set_state(AppState::Available);
        tracing::info!(app = %app.describe(), "removed");
        Ok(())
    }
}

#[async_trait]
impl Plugin for DummyPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn order(&self) -> i32 {
        10
    }

    fn capabilities(&self) -> CapabilitySet {
        [
            Capability::AdoptApp,
            Capability::Refine,
            Capability::ListApps,
            Capability::RefreshMetadata,
            Capability::InstallApps,
            Capability::UninstallApps,
            Capability::Launch,
            Capability::UrlToApp,
        ]
        .into_iter()
        .collect()
    }

    fn adopt_app(&self, app: &AppRef) {
        if Self::owns(app) {
            app.set_management_plugin(Self::NAME);
        }
    }

    async fn refine(
        &self,
        list: &AppList,
        _job_flags: RefineJobFlags,
        flags: RefineFlags,
        ctx: &PluginContext,
    ) -> PluginResult<()> {
        for app in list {
            ctx.check_cancelled()?;
            if !Self::is_managed(app) && !Self::owns(app) {
                continue;
            }
            if flags.contains(RefineFlags::SIZE) && app.size_installed().is_none() {
                app.set_size_installed(42 * 1024 * 1024);
            }
            if flags.contains(RefineFlags::ORIGIN_UI) && app.origin_ui().is_none() {
                app.set_origin_ui("Dummy");
            }
        }
        Ok(())
    }

    async fn list_apps(
        &self,
        query: &AppQuery,
        _flags: ListAppsFlags,
        ctx: &PluginContext,
    ) -> PluginResult<AppList> {
        if let Some(keywords) = query.keywords() {
            if keywords.iter().any(|k| k == HANG_KEYWORD) {
                tracing::debug!("hanging until cancelled");
                ctx.cancellable().cancelled().await;
                return Err(PluginError::cancelled());
            }
            return Ok(AppList::new());
        }
        if query.is_curated().as_bool() == Some(true) {
            return Ok(CURATED_IDS
                .iter()
                .map(|id| App::new_wildcard(*id, AppKind::DesktopApp))
                .collect());
        }
        Ok(AppList::new())
    }

    async fn refresh_metadata(&self, cache_age: Duration, ctx: &PluginContext) -> PluginResult<()> {
        ctx.check_cancelled()?;
        let mut last = self.last_refresh.lock();
        if let Some(at) = *last {
            if at.elapsed() < cache_age {
                tracing::debug!(age_ms = at.elapsed().as_millis() as u64, "metadata fresh enough");
                return Ok(());
            }
        }
        *last = Some(Instant::now());
        tracing::debug!("refreshed metadata");
        Ok(())
    }

    async fn install_apps(&self, apps: &AppList, ctx: &PluginContext) -> PluginResult<()> {
        for app in apps {
            self.install_one(app, ctx).await?;
        }
        Ok(())
    }

    async fn uninstall_apps(&self, apps: &AppList, ctx: &PluginContext) -> PluginResult<()> {
        for app in apps {
            self.uninstall_one(app, ctx).await?;
        }
        Ok(())
    }

    async fn launch(&self, app: &AppRef, _ctx: &PluginContext) -> PluginResult<()> {
        if !app.is_installed() {
            return Err(PluginError::Failed(format!(
                "{} is not installed",
                app.describe()
            )));
        }
        tracing::info!(app = %app.describe(), "launching");
        Ok(())
    }

    async fn url_to_app(&self, url: &str, _ctx: &PluginContext) -> PluginResult<AppList> {
        let Some(name) = url.strip_prefix(URL_SCHEME).filter(|n| !n.is_empty()) else {
            return Ok(AppList::new());
        };
        let id = format!("{ID_PREFIX}{name}");
        if let Some(cached) = self.cache.lookup_by_id(&id) {
            return Ok(AppList::from_app(cached));
        }
        let app = App::new(id);
        app.set_kind(AppKind::Generic);
        app.set_state(AppState::Available);
        app.set_name(name);
        app.set_summary(format!("Dummy app {name}"));
        app.set_license("GPL-3.0+");
        app.set_management_plugin(Self::NAME);
        Ok(AppList::from_app(self.cache.insert(&app)))
    }
}
