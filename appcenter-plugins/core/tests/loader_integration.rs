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

//! End-to-end tests against the built-in plugins

use appcenter_core::{
    query::sort_by_match_value, AppQuery, AppState, Category, DedupeFlags, ListAppsFlags,
    LoaderConfig, PluginError, Quirks, RefineFlags,
};
use appcenter_plugins::builtin::register_builtin;
use appcenter_plugins::job::{
    InstallAppsJob, ListAppsJob, ListCategoriesJob, UninstallAppsJob, UrlToAppJob,
};
use appcenter_plugins::{sync, PluginJob, PluginLoader};
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

async fn loader() -> PluginLoader {
    let loader = PluginLoader::new(LoaderConfig {
        provenance_origins: vec!["os".to_string()],
        ..Default::default()
    });
    register_builtin(&loader).unwrap();
    loader.setup().await.unwrap();
    loader
}

async fn list(loader: &PluginLoader, query: AppQuery) -> Vec<String> {
    let job = ListAppsJob::new(query, ListAppsFlags::empty());
    assert_ok!(loader.job_process(&job, CancellationToken::new()).await);
    job.result_list()
        .unwrap()
        .iter()
        .filter_map(|app| app.id())
        .collect()
}

/// Rules put provenance after the catalog
#[tokio::test]
async fn test_builtin_order() {
    let loader = loader().await;
    assert_eq!(
        loader.registry().plugin_names(),
        vec!["catalog", "dummy", "provenance"]
    );
}

/// Search ranks by match value and hides addons
#[tokio::test]
async fn test_search() {
    let loader = loader().await;

    let search = |term: &str| {
        AppQuery::builder()
            .with_keywords([term])
            .with_refine_require_flags(RefineFlags::ICON)
            .with_dedupe_flags(DedupeFlags::DEFAULT)
            .with_sort_func(sort_by_match_value())
            .build()
    };
    assert_eq!(list(&loader, search("zeus")).await, vec!["zeus.desktop"]);

    let query = search("teaching");
    assert_eq!(list(&loader, query).await, vec!["chiron.desktop", "zeus.desktop"]);
}

/// Installed apps refined with addons, provenance and the rest
#[tokio::test]
async fn test_installed_fully_refined() {
    let loader = loader().await;
    let flags = RefineFlags::ADDONS
        | RefineFlags::ORIGIN
        | RefineFlags::LICENSE
        | RefineFlags::KUDOS
        | RefineFlags::ICON
        | RefineFlags::CATEGORIES
        | RefineFlags::PROVENANCE;
    let query = AppQuery::builder()
        .with_is_installed(true)
        .with_refine_require_flags(flags)
        .build();
    let job = ListAppsJob::new(query, ListAppsFlags::empty());
    assert_ok!(loader.job_process(&job, CancellationToken::new()).await);

    let apps = job.result_list().unwrap();
    assert_eq!(apps.len(), 1);
    let zeus = apps.index(0).unwrap();
    assert_eq!(zeus.id().as_deref(), Some("zeus.desktop"));
    assert_eq!(zeus.license().as_deref(), Some("GPL-2.0+"));
    assert!(zeus.icon().is_some());
    assert!(zeus.has_quirk(Quirks::PROVENANCE));

    let addons = zeus.addons();
    assert_eq!(addons.len(), 1);
    let spell = addons.index(0).unwrap();
    assert_eq!(spell.id().as_deref(), Some("zeus-spell.addon"));
    assert_eq!(spell.license().as_deref(), Some("GPL-2.0+"));
}

/// Curated wildcards from one plugin are resolved by another
#[tokio::test]
async fn test_curated_wildcards_resolved() {
    let loader = loader().await;
    let query = AppQuery::builder()
        .with_is_curated(true)
        .with_refine_require_flags(RefineFlags::ICON)
        .build();
    let mut ids = list(&loader, query).await;
    ids.sort();
    assert_eq!(ids, vec!["chiron.desktop", "zeus.desktop"]);
}

#[tokio::test]
async fn test_hanging_search_times_out() {
    let loader = loader().await;
    let query = AppQuery::builder().with_keywords(["hang"]).build();
    let job = ListAppsJob::new(query, ListAppsFlags::empty()).with_timeout(Duration::from_millis(50));
    let token = CancellationToken::new();

    let err = assert_err!(loader.job_process(&job, token.clone()).await);
    assert!(matches!(err, PluginError::TimedOut(_)));
    assert!(token.is_cancelled());
    assert!(job.result_list().is_none());
    assert!(job.state().is_completed());
}

/// A job cancelled before it runs still signals completion
#[tokio::test]
async fn test_cancelled_job_completes() {
    let loader = loader().await;
    let query = AppQuery::builder().with_keywords(["zeus"]).build();
    let job = ListAppsJob::new(query, ListAppsFlags::empty());
    let token = CancellationToken::new();
    token.cancel();

    let err = assert_err!(loader.job_process(&job, token).await);
    assert!(err.is_cancelled());
    assert_ok!(tokio::time::timeout(Duration::from_millis(200), job.state().completed()).await);
    assert!(job.state().is_completed());
    assert!(job.state().error().is_some_and(|e| e.is_cancelled()));
    assert!(job.result_list().is_none());
}

#[tokio::test]
async fn test_category_sizes() {
    let loader = loader().await;
    let music = Category::new("music", "Music", ["AudioVideo::Player"]);
    let education = Category::new("education", "Education", ["Education"]);
    let games = Category::new("games", "Games", ["Game"]);
    let job = ListCategoriesJob::new(vec![music.clone(), education.clone(), games.clone()]);

    assert_ok!(loader.job_process(&job, CancellationToken::new()).await);
    assert_eq!(music.size(), 1);
    assert_eq!(education.size(), 1);
    assert_eq!(games.size(), 0);
}

/// Resolve a URL, install it, then remove it
#[tokio::test]
async fn test_url_install_uninstall() {
    let loader = loader().await;
    let lookup = UrlToAppJob::new("dummy://hello", RefineFlags::LICENSE);
    assert_ok!(loader.job_process(&lookup, CancellationToken::new()).await);
    let apps = lookup.result_list().unwrap();
    let app = apps.index(0).unwrap().clone();
    assert_eq!(app.state(), AppState::Available);

    let install = InstallAppsJob::new(&apps);
    assert_ok!(loader.job_process(&install, CancellationToken::new()).await);
    assert_eq!(app.state(), AppState::Installed);

    let uninstall = UninstallAppsJob::new(&apps);
    assert_ok!(loader.job_process(&uninstall, CancellationToken::new()).await);
    assert_eq!(app.state(), AppState::Available);
    assert!(loader.events().is_empty());
}

#[tokio::test]
async fn test_failed_install_reports_event() {
    let loader = loader().await;
    let lookup = UrlToAppJob::new("dummy://fail", RefineFlags::empty());
    assert_ok!(loader.job_process(&lookup, CancellationToken::new()).await);
    let apps = lookup.result_list().unwrap();

    let install = InstallAppsJob::new(&apps).with_interactive(true);
    assert_err!(loader.job_process(&install, CancellationToken::new()).await);
    assert_eq!(apps.index(0).unwrap().state(), AppState::Available);

    let events = loader.events();
    assert_eq!(events.len(), 1);
    assert!(events[0].error().is_some());
}

#[test]
fn test_sync_adapter() {
    let loader = PluginLoader::default();
    register_builtin(&loader).unwrap();
    sync::setup_sync(&loader).unwrap();

    let query = AppQuery::builder().with_keywords(["spell"]).build();
    let job = ListAppsJob::new(query, ListAppsFlags::empty());
    sync::job_process_sync(&loader, &job, CancellationToken::new()).unwrap();
    // the only match is an addon, which is never listed
    assert!(job.result_list().unwrap().is_empty());
}
