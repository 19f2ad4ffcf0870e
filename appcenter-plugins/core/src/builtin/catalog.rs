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

//! In-memory app catalog
//!
//! The catalog is read from TOML, one `[[app]]` table per app:
//!
//! ```toml
//! [[app]]
//! id = "zeus.desktop"
//! kind = "desktop-app"
//! state = "installed"
//! name = "Zeus"
//! summary = "A teaching application"
//! sources = ["zeus"]
//! keywords = ["zeus"]
//! ```
//!
//! Listing creates cheap apps carrying identity, state and the fields needed
//! for validity checks; everything else is filled in on refine.

use crate::cache::AppCache;
use crate::capabilities::{Capability, CapabilitySet};
use crate::plugin::{Plugin, PluginContext};
use appcenter_core::{
    unique_id, App, AppKind, AppList, AppQuery, AppRef, AppState, CategoryRef, Icon, Kudos,
    ListAppsFlags, PluginError, PluginResult, RefineFlags, RefineJobFlags, UrlKind,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One app in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub kind: AppKind,
    #[serde(default)]
    pub state: AppState,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub developer: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub menu_path: Vec<String>,
    /// Id of the app this addon extends
    #[serde(default)]
    pub extends: Option<String>,
    /// Id of the app this one is an alternative to
    #[serde(default)]
    pub alternate_of: Option<String>,
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size_installed: Option<u64>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub curated: bool,
    #[serde(default)]
    pub priority: i32,
}

impl CatalogEntry {
    fn unique_id(&self) -> String {
        unique_id::build(None, None, self.origin.as_deref(), &self.id, None)
    }

    fn is_installed(&self) -> bool {
        matches!(
            self.state,
            AppState::Installed | AppState::Updatable | AppState::UpdatableLive
        )
    }

    /// Relevance of this entry for the search terms, zero if it does not match
    fn match_value(&self, terms: &[String]) -> u32 {
        let stem = self.id.rsplit_once('.').map_or(self.id.as_str(), |(s, _)| s);
        let name = self.name.as_deref().unwrap_or_default().to_lowercase();
        let summary = self.summary.as_deref().unwrap_or_default().to_lowercase();

        let mut total = 0;
        for term in terms {
            let term = term.to_lowercase();
            let mut score = 0;
            if stem.eq_ignore_ascii_case(&term) {
                score += 100;
            }
            if name.contains(&term) {
                score += 80;
            }
            if self.keywords.iter().any(|k| k.eq_ignore_ascii_case(&term)) {
                score += 60;
            }
            if summary.contains(&term) {
                score += 30;
            }
            // every term must match
            if score == 0 {
                return 0;
            }
            total += score;
        }
        total
    }
}

/// A set of catalog entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default, rename = "app")]
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn from_toml(toml_str: &str) -> PluginResult<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PluginResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), apps = catalog.len(), "loaded catalog");
        Ok(catalog)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serves apps from a [`Catalog`]
pub struct CatalogPlugin {
    catalog: Catalog,
    cache: Arc<AppCache>,
}

impl CatalogPlugin {
    pub const NAME: &'static str = "catalog";

    pub fn new(catalog: Catalog, cache: Arc<AppCache>) -> Self {
        Self { catalog, cache }
    }

    /// The shared app for an entry, created on first use
    fn app_for(&self, entry: &CatalogEntry) -> AppRef {
        if let Some(app) = self.cache.lookup(&entry.unique_id()) {
            return app;
        }
        let app = App::new(entry.id.clone());
        app.set_kind(entry.kind);
        app.set_state(entry.state);
        app.set_priority(entry.priority);
        if let Some(origin) = &entry.origin {
            app.set_origin(origin.clone());
        }
        if let Some(name) = &entry.name {
            app.set_name(name.clone());
        }
        if let Some(summary) = &entry.summary {
            app.set_summary(summary.clone());
        }
        for source in &entry.sources {
            app.add_source(source.clone());
        }
        for category in &entry.categories {
            app.add_category(category.clone());
        }
        for keyword in &entry.keywords {
            app.add_keyword(keyword.clone());
        }
        self.cache.insert(&app)
    }

    fn entry_for(&self, app: &App) -> Option<&CatalogEntry> {
        let id = app.id()?;
        let origin = app.origin();
        self.catalog
            .entries()
            .iter()
            .find(|e| e.id == id && (origin.is_none() || e.origin == origin))
    }

    fn refine_app(&self, app: &App, entry: &CatalogEntry, flags: RefineFlags) {
        if flags.contains(RefineFlags::LICENSE) && app.license().is_none() {
            if let Some(license) = &entry.license {
                app.set_license(license.clone());
            }
        }
        if flags.contains(RefineFlags::DESCRIPTION) && app.description().is_none() {
            if let Some(description) = &entry.description {
                app.set_description(description.clone());
            }
        }
        if flags.contains(RefineFlags::VERSION) && app.version().is_none() {
            if let Some(version) = &entry.version {
                app.set_version(version.clone());
            }
        }
        if flags.contains(RefineFlags::URL) && app.url(UrlKind::Homepage).is_none() {
            if let Some(homepage) = &entry.homepage {
                app.set_url(UrlKind::Homepage, homepage.clone());
            }
        }
        if flags.contains(RefineFlags::ICON) && app.icon().is_none() {
            if let Some(icon) = &entry.icon {
                app.set_icon(Icon::stock(icon.clone()));
            }
        }
        if flags.contains(RefineFlags::MENU_PATH) && app.menu_path().is_empty() {
            app.set_menu_path(entry.menu_path.clone());
        }
        if flags.contains(RefineFlags::CATEGORIES) {
            for category in &entry.categories {
                app.add_category(category.clone());
            }
        }
        if flags.contains(RefineFlags::SIZE) && app.size_installed().is_none() {
            if let Some(size) = entry.size_installed {
                app.set_size_installed(size);
            }
        }
        if flags.contains(RefineFlags::ORIGIN_HOSTNAME) && app.origin_hostname().is_none() {
            if let Some(homepage) = &entry.homepage {
                if let Some(host) = homepage.split("://").nth(1).and_then(|r| r.split('/').next()) {
                    app.set_origin_hostname(host);
                }
            }
        }
        if flags.contains(RefineFlags::ORIGIN_UI) && app.origin_ui().is_none() {
            if let Some(origin) = &entry.origin {
                app.set_origin_ui(origin.clone());
            }
        }
        if let Some(developer) = &entry.developer {
            if app.developer_name().is_none() {
                app.set_developer_name(developer.clone());
            }
        }
        if let Some(date) = entry.release_date {
            if app.release_date().is_none() {
                app.set_release_date(date);
            }
        }
        if flags.contains(RefineFlags::KUDOS) {
            if !entry.keywords.is_empty() {
                app.add_kudo(Kudos::HAS_KEYWORDS);
            }
            if entry.release_date.map_or(false, |d| Utc::now() - d < chrono::Duration::days(365)) {
                app.add_kudo(Kudos::RECENT_RELEASE);
            }
        }
        if flags.contains(RefineFlags::ADDONS) {
            for addon in self
                .catalog
                .entries()
                .iter()
                .filter(|e| e.extends.as_deref() == Some(entry.id.as_str()))
            {
                app.add_addon(&self.app_for(addon));
            }
        }
        if flags.contains(RefineFlags::RUNTIME) && app.runtime().is_none() {
            if let Some(runtime) = entry.runtime.as_deref().and_then(|id| self.catalog.get(id)) {
                app.set_runtime(&self.app_for(runtime));
            }
        }
    }

    fn matching<F>(&self, keep: F) -> AppList
    where
        F: Fn(&CatalogEntry) -> bool,
    {
        self.catalog
            .entries()
            .iter()
            .filter(|&e| keep(e))
            .map(|e| self.app_for(e))
            .collect()
    }
}

#[async_trait]
impl Plugin for CatalogPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn capabilities(&self) -> CapabilitySet {
        [
            Capability::Refine,
            Capability::RefineWildcard,
            Capability::ListApps,
            Capability::RefineCategories,
        ]
        .into_iter()
        .collect()
    }

    async fn setup(&self, _ctx: &PluginContext) -> PluginResult<()> {
        tracing::debug!(apps = self.catalog.len(), "catalog ready");
        Ok(())
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
            if let Some(entry) = self.entry_for(app) {
                self.refine_app(app, entry, flags);
            }
        }
        Ok(())
    }

    async fn refine_wildcard(
        &self,
        wildcard: &AppRef,
        _flags: RefineFlags,
        _ctx: &PluginContext,
    ) -> PluginResult<AppList> {
        let Some(id) = wildcard.id() else {
            return Ok(AppList::new());
        };
        let kind = wildcard.kind();
        Ok(self.matching(|e| e.id == id && (kind == AppKind::Unknown || e.kind == kind)))
    }

    async fn list_apps(
        &self,
        query: &AppQuery,
        _flags: ListAppsFlags,
        ctx: &PluginContext,
    ) -> PluginResult<AppList> {
        ctx.check_cancelled()?;

        if let Some(keywords) = query.keywords() {
            let mut list = AppList::new();
            for entry in self.catalog.entries() {
                let score = entry.match_value(keywords);
                if score > 0 {
                    let app = self.app_for(entry);
                    app.set_match_value(score);
                    list.add(app);
                }
            }
            return Ok(list);
        }
        if let Some(installed) = query.is_installed().as_bool() {
            return Ok(self.matching(|e| e.is_installed() == installed));
        }
        if let Some(category) = query.category() {
            return Ok(self.matching(|e| e.categories.iter().any(|c| c == category)));
        }
        if let Some(other) = query.alternate_of() {
            let Some(id) = other.id() else {
                return Ok(AppList::new());
            };
            return Ok(self.matching(|e| e.alternate_of.as_deref() == Some(id.as_str())));
        }
        if let Some(featured) = query.is_featured().as_bool() {
            return Ok(self.matching(|e| e.featured == featured));
        }
        if let Some(curated) = query.is_curated().as_bool() {
            return Ok(self.matching(|e| e.curated == curated));
        }
        if let Some(developers) = query.developers() {
            return Ok(self.matching(|e| {
                e.developer
                    .as_deref()
                    .map_or(false, |d| developers.iter().any(|want| want.eq_ignore_ascii_case(d)))
            }));
        }
        if let Some(kinds) = query.component_kinds() {
            return Ok(self.matching(|e| kinds.contains(&e.kind)));
        }
        if query.n_properties_set() == 0 {
            return Ok(AppList::new());
        }
        Err(PluginError::not_supported("catalog query"))
    }

    async fn refine_categories(
        &self,
        categories: &[CategoryRef],
        _ctx: &PluginContext,
    ) -> PluginResult<()> {
        for entry in self.catalog.entries() {
            if entry.kind == AppKind::Addon {
                continue;
            }
            let app = self.app_for(entry);
            for category in categories.iter().filter(|c| c.matches(&app)) {
                category.increment_size(1);
            }
        }
        Ok(())
    }
}
