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

//! Query execution
//!
//! Every enabled list-capable plugin is asked concurrently; their results
//! are merged, refined, then shaped in a fixed order: filter, deduplicate,
//! sort, truncate.

use super::{JobState, PluginJob};
use crate::capabilities::Capability;
use crate::loader::PluginLoader;
use crate::plugin::PluginContext;
use crate::refine::ErrorFold;
use crate::registry::app_is_valid;
use appcenter_core::{
    AppKind, AppList, AppQuery, AppRef, AppState, DeveloperVerifiedType, LicenseType,
    ListAppsFlags, PluginError, PluginResult, Quirks, RefineFlags, RefineJobFlags,
};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::time::Duration;

/// List apps matching a query
pub struct ListAppsJob {
    state: JobState,
    query: AppQuery,
    flags: ListAppsFlags,
    result: Mutex<Option<AppList>>,
}

impl ListAppsJob {
    pub fn new(query: AppQuery, flags: ListAppsFlags) -> Self {
        Self {
            state: JobState::new(),
            query,
            flags,
            result: Mutex::new(None),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.state = self.state.with_timeout(timeout);
        self
    }

    pub fn query(&self) -> &AppQuery {
        &self.query
    }

    pub fn result_list(&self) -> Option<AppList> {
        self.result.lock().clone()
    }

    async fn collect(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<AppList> {
        let plugins = loader.registry().plugins_with(Capability::ListApps);
        if plugins.is_empty() {
            tracing::debug!("no plugin could handle listing apps");
        }
        ctx.check_cancelled()?;

        let calls = plugins.iter().map(|entry| async move {
            let result = entry.plugin().list_apps(&self.query, self.flags, ctx).await;
            (entry.name().to_string(), result)
        });

        let mut merged = AppList::new();
        let mut errors = ErrorFold::new();
        for (name, result) in join_all(calls).await {
            match result {
                Ok(apps) => {
                    tracing::debug!(plugin = %name, count = apps.len(), "plugin listed apps");
                    merged.add_list(&apps);
                }
                Err(e) if e.is_cancelled() => errors.add(e),
                Err(e) => tracing::debug!(plugin = %name, error = %e, "plugin failed to list apps"),
            }
        }
        errors.into_result()?;
        Ok(merged)
    }

    fn refine_flags(&self) -> RefineFlags {
        let mut flags = self.query.refine_require_flags();
        if self.query.license_type() != LicenseType::Any {
            flags.insert(RefineFlags::LICENSE);
        }
        flags.with_implied()
    }

    fn shape(&self, list: &mut AppList) {
        let query = &self.query;
        if !query.refine_job_flags().contains(RefineJobFlags::DISABLE_FILTERING) {
            let flags = self.refine_flags();
            list.filter(|app| app_is_valid(app, flags));
            if query.license_type() == LicenseType::Foss {
                list.filter(is_freely_licensed);
            }
            if query.developer_verified_type() == DeveloperVerifiedType::Only {
                list.filter(|app| app.has_quirk(Quirks::DEVELOPER_VERIFIED));
            }
        }

        if let Some(filter) = query.filter_func() {
            list.filter(|app| filter(app));
        }

        if !query.dedupe_flags().is_empty() {
            list.filter_duplicates(query.dedupe_flags());
        }

        match query.sort_func() {
            Some(sort) => list.sort_by(|a, b| sort(a, b)),
            None => {
                tracing::debug!("no sort func set, using random");
                list.randomize();
            }
        }

        if query.max_results() > 0 {
            list.truncate(query.max_results());
        }
    }
}

/// Proprietary apps are only hidden until installed
fn is_freely_licensed(app: &AppRef) -> bool {
    !matches!(
        app.kind(),
        AppKind::Generic | AppKind::DesktopApp | AppKind::Console | AppKind::WebApp
    ) || matches!(
        app.state(),
        AppState::Installed | AppState::Updatable | AppState::UpdatableLive
    ) || app.license_is_free()
}

#[async_trait]
impl PluginJob for ListAppsJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "list-apps"
    }

    fn is_interactive(&self) -> bool {
        self.flags.contains(ListAppsFlags::INTERACTIVE)
            || self
                .query
                .refine_job_flags()
                .contains(RefineJobFlags::INTERACTIVE)
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        let n_properties = self.query.n_properties_set();
        if n_properties > 1 {
            return Err(PluginError::NotSupported(format!(
                "queries with {} filter properties are not supported",
                n_properties
            )));
        }

        let merged = self.collect(loader, ctx).await?;

        let flags = self.refine_flags();
        let mut list = if !merged.is_empty() && !flags.is_empty() {
            let job_flags = self.query.refine_job_flags() | RefineJobFlags::DISABLE_FILTERING;
            loader.refiner().run(&merged, job_flags, flags, ctx).await?
        } else {
            tracing::debug!("no apps to refine");
            merged
        };

        self.shape(&mut list);
        tracing::debug!(count = list.len(), "listed apps");
        *self.result.lock() = Some(list);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::plugin::Plugin;
    use appcenter_core::query::sort_by_name;
    use appcenter_core::{App, DedupeFlags};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct Lister {
        name: &'static str,
        apps: Vec<(&'static str, &'static str, i32)>,
        fail: Option<PluginError>,
    }

    #[async_trait]
    impl Plugin for Lister {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::ListApps)
        }

        async fn list_apps(
            &self,
            _query: &AppQuery,
            _flags: ListAppsFlags,
            _ctx: &PluginContext,
        ) -> PluginResult<AppList> {
            if let Some(e) = &self.fail {
                return Err(e.clone());
            }
            let mut list = AppList::new();
            for (id, name, priority) in &self.apps {
                let app = App::new(*id);
                app.set_origin(self.name);
                app.set_name(*name);
                app.set_summary("summary");
                app.set_kind(AppKind::DesktopApp);
                app.set_state(AppState::Available);
                app.set_priority(*priority);
                list.add(app);
            }
            Ok(list)
        }
    }

    async fn loader_with(plugins: Vec<Lister>) -> PluginLoader {
        let loader = PluginLoader::default();
        for plugin in plugins {
            loader.register(Arc::new(plugin)).unwrap();
        }
        loader.setup().await.unwrap();
        loader
    }

    fn ids(list: &AppList) -> Vec<String> {
        list.iter().map(|a| a.id().unwrap_or_default()).collect()
    }

    #[tokio::test]
    async fn test_rejects_multiple_properties() {
        let loader = loader_with(vec![]).await;
        let query = AppQuery::builder()
            .with_keywords(["zeus"])
            .with_is_installed(true)
            .build();
        let job = ListAppsJob::new(query, ListAppsFlags::empty());

        let err = loader
            .job_process(&job, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotSupported(_)));
        assert!(job.result_list().is_none());
    }

    #[tokio::test]
    async fn test_merge_dedupe_sort_truncate() {
        let loader = loader_with(vec![
            Lister {
                name: "first",
                apps: vec![("b.desktop", "Beta", 0), ("a.desktop", "Alpha", 0)],
                fail: None,
            },
            Lister {
                name: "second",
                apps: vec![("b.desktop", "Beta", 50), ("c.desktop", "Gamma", 0)],
                fail: None,
            },
            Lister {
                name: "broken",
                apps: vec![],
                fail: Some(PluginError::NoNetwork("offline".to_string())),
            },
        ])
        .await;

        let query = AppQuery::builder()
            .with_keywords(["any"])
            .with_dedupe_flags(DedupeFlags::KEY_ID)
            .with_sort_func(sort_by_name())
            .with_max_results(2)
            .build();
        let job = ListAppsJob::new(query, ListAppsFlags::empty());
        loader
            .job_process(&job, CancellationToken::new())
            .await
            .unwrap();

        let list = job.result_list().unwrap();
        assert_eq!(ids(&list), vec!["a.desktop", "b.desktop"]);
        assert_eq!(list.index(1).unwrap().priority(), 50);
        assert!(list.has_flag(appcenter_core::AppListFlags::IS_TRUNCATED));
    }

    #[tokio::test]
    async fn test_cancelled_plugin_fails_job() {
        let loader = loader_with(vec![Lister {
            name: "cancelled",
            apps: vec![],
            fail: Some(PluginError::cancelled()),
        }])
        .await;
        let query = AppQuery::builder().with_keywords(["zeus"]).build();
        let job = ListAppsJob::new(query, ListAppsFlags::empty());

        let err = loader
            .job_process(&job, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_freely_licensed_filter() {
        let app = App::new("nonfree.desktop");
        app.set_kind(AppKind::DesktopApp);
        app.set_state(AppState::Available);
        app.set_license("LicenseRef-proprietary");
        assert!(!is_freely_licensed(&app));

        let installed = App::new("installed.desktop");
        installed.set_kind(AppKind::DesktopApp);
        installed.set_state(AppState::Installed);
        installed.set_license("LicenseRef-proprietary");
        assert!(is_freely_licensed(&installed));

        let font = App::new("font");
        font.set_kind(AppKind::Font);
        assert!(is_freely_licensed(&font));
    }
}
