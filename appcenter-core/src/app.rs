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

//! The app entity.
//!
//! An [`App`] is an installable or updatable unit. Apps are shared through
//! [`AppRef`] handles: the same physical app can sit in several lists and in
//! plugin caches at once, and a mutation through one handle is visible
//! through all of them.
//!
//! Fields are guarded by an internal lock, so every accessor takes `&self`.
//! The lock is held only for the duration of one accessor call.

use crate::app_list::AppList;
use crate::flags::{Kudos, Quirks};
use crate::unique_id;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared handle to an app
pub type AppRef = Arc<App>;

/// Progress value meaning "not known"
pub const PROGRESS_UNKNOWN: u32 = u32::MAX;

/// Lifecycle state of an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppState {
    #[default]
    Unknown,
    Available,
    AvailableLocal,
    Installed,
    Updatable,
    UpdatableLive,
    QueuedForInstall,
    Installing,
    Removing,
    PendingInstall,
    PendingRemove,
    Downloading,
    Purchasable,
    Purchasing,
    Unavailable,
}

impl AppState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppState::Unknown => "unknown",
            AppState::Available => "available",
            AppState::AvailableLocal => "available-local",
            AppState::Installed => "installed",
            AppState::Updatable => "updatable",
            AppState::UpdatableLive => "updatable-live",
            AppState::QueuedForInstall => "queued-for-install",
            AppState::Installing => "installing",
            AppState::Removing => "removing",
            AppState::PendingInstall => "pending-install",
            AppState::PendingRemove => "pending-remove",
            AppState::Downloading => "downloading",
            AppState::Purchasable => "purchasable",
            AppState::Purchasing => "purchasing",
            AppState::Unavailable => "unavailable",
        }
    }

    /// Transient states are not recorded as the recovery point
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppState::Installing
                | AppState::Removing
                | AppState::Downloading
                | AppState::Purchasing
                | AppState::QueuedForInstall
        )
    }

    /// Check whether moving from `self` to `to` is an allowed transition
    pub fn can_transition_to(&self, to: AppState) -> bool {
        use AppState::*;
        if to == Unknown {
            return true;
        }
        match self {
            Unknown => matches!(
                to,
                Installed
                    | QueuedForInstall
                    | Available
                    | AvailableLocal
                    | Updatable
                    | UpdatableLive
                    | Unavailable
                    | Purchasable
                    | PendingInstall
                    | PendingRemove
            ),
            Installed => matches!(
                to,
                Removing | Unavailable | Updatable | UpdatableLive | PendingRemove
            ),
            QueuedForInstall => matches!(to, Installing | Available),
            Available => matches!(
                to,
                QueuedForInstall | Installing | Downloading | PendingInstall
            ),
            Installing => matches!(
                to,
                Installed | Updatable | UpdatableLive | Available | PendingInstall
            ),
            Removing => matches!(to, Available | Purchasable | Installed | PendingRemove),
            Updatable => matches!(to, Available | Removing | Installing | Downloading),
            UpdatableLive => matches!(to, Removing | Installing | Downloading),
            Unavailable => matches!(to, Available),
            AvailableLocal => matches!(to, Installing),
            Purchasable => matches!(to, Purchasing),
            Purchasing => matches!(to, Available | Purchasable),
            Downloading => matches!(to, Available | Updatable | UpdatableLive | Installing),
            PendingInstall => matches!(to, Installing | Available | Installed),
            PendingRemove => matches!(to, Removing | Installed | Available),
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of component an app represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppKind {
    #[default]
    Unknown,
    DesktopApp,
    Runtime,
    Addon,
    Repository,
    OperatingSystem,
    Console,
    Generic,
    Firmware,
    Font,
    Codec,
    InputMethod,
    WebApp,
    ShellExtension,
    OsUpgrade,
}

impl AppKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppKind::Unknown => "unknown",
            AppKind::DesktopApp => "desktop-app",
            AppKind::Runtime => "runtime",
            AppKind::Addon => "addon",
            AppKind::Repository => "repository",
            AppKind::OperatingSystem => "operating-system",
            AppKind::Console => "console",
            AppKind::Generic => "generic",
            AppKind::Firmware => "firmware",
            AppKind::Font => "font",
            AppKind::Codec => "codec",
            AppKind::InputMethod => "input-method",
            AppKind::WebApp => "web-app",
            AppKind::ShellExtension => "shell-extension",
            AppKind::OsUpgrade => "os-upgrade",
        }
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppScope {
    #[default]
    Unknown,
    System,
    User,
}

impl AppScope {
    fn segment(&self) -> Option<&'static str> {
        match self {
            AppScope::Unknown => None,
            AppScope::System => Some("system"),
            AppScope::User => Some("user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BundleKind {
    #[default]
    Unknown,
    Package,
    Flatpak,
    Snap,
    AppImage,
    Cabinet,
    Limba,
}

impl BundleKind {
    fn segment(&self) -> Option<&'static str> {
        match self {
            BundleKind::Unknown => None,
            BundleKind::Package => Some("package"),
            BundleKind::Flatpak => Some("flatpak"),
            BundleKind::Snap => Some("snap"),
            BundleKind::AppImage => Some("appimage"),
            BundleKind::Cabinet => Some("cabinet"),
            BundleKind::Limba => Some("limba"),
        }
    }
}

/// Something an app provides to the system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provide {
    pub kind: ProvideKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvideKind {
    /// Another component id this app replaces
    Id,
    Binary,
    Library,
    Mimetype,
    Font,
    Modalias,
    Codec,
    Firmware,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UrlKind {
    Homepage,
    BugTracker,
    Help,
    Donation,
    Translate,
    Faq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    Stock,
    Cached,
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon {
    pub kind: IconKind,
    pub name: String,
}

impl Icon {
    pub fn stock(name: impl Into<String>) -> Self {
        Self {
            kind: IconKind::Stock,
            name: name.into(),
        }
    }
}

/// A user review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub reviewer_name: String,
    pub summary: String,
    pub description: String,
    /// 0-100
    pub rating: u32,
    pub version: Option<String>,
    /// Higher sorts first
    pub priority: i32,
    pub date: DateTime<Utc>,
    /// Written by the current user
    #[serde(default)]
    pub is_self: bool,
}

#[derive(Default)]
struct AppInner {
    id: Option<String>,
    kind: AppKind,
    scope: AppScope,
    bundle_kind: BundleKind,
    origin: Option<String>,
    origin_hostname: Option<String>,
    origin_ui: Option<String>,
    branch: Option<String>,
    state: AppState,
    state_recover: AppState,
    progress: u32,
    allow_cancel: bool,
    quirks: Quirks,
    priority: i32,
    management_plugin: Option<String>,
    addons: AppList,
    runtime: Option<Weak<App>>,
    related: AppList,
    history: AppList,
    name: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    license: Option<String>,
    version: Option<String>,
    update_details: Option<String>,
    developer_name: Option<String>,
    sources: Vec<String>,
    provides: Vec<Provide>,
    categories: Vec<String>,
    keywords: Vec<String>,
    menu_path: Vec<String>,
    icon: Option<Icon>,
    urls: BTreeMap<String, String>,
    kudos: Kudos,
    reviews: Vec<Review>,
    rating: Option<u32>,
    review_ratings: Vec<u32>,
    metadata: BTreeMap<String, String>,
    css: Option<String>,
    match_value: u32,
    release_date: Option<DateTime<Utc>>,
    size_installed: Option<u64>,
    size_download: Option<u64>,
}

/// An installable or updatable unit
pub struct App {
    inner: RwLock<AppInner>,
}

macro_rules! text_property {
    ($(#[$meta:meta])* $field:ident, $setter:ident) => {
        $(#[$meta])*
        pub fn $field(&self) -> Option<String> {
            self.inner.read().$field.clone()
        }

        pub fn $setter(&self, value: impl Into<String>) {
            self.inner.write().$field = Some(value.into());
        }
    };
}

impl App {
    /// Create a new shared app with the given id
    pub fn new(id: impl Into<String>) -> AppRef {
        let app = Self::new_anonymous();
        app.inner.write().id = Some(id.into());
        app
    }

    /// Create a new shared app whose id will be resolved later
    pub fn new_anonymous() -> AppRef {
        Arc::new(App {
            inner: RwLock::new(AppInner {
                progress: PROGRESS_UNKNOWN,
                ..Default::default()
            }),
        })
    }

    /// Create a wildcard placeholder with only id and kind set
    pub fn new_wildcard(id: impl Into<String>, kind: AppKind) -> AppRef {
        let app = Self::new(id);
        {
            let mut inner = app.inner.write();
            inner.kind = kind;
            inner.quirks.insert(Quirks::IS_WILDCARD);
        }
        app
    }

    pub fn id(&self) -> Option<String> {
        self.inner.read().id.clone()
    }

    pub fn set_id(&self, id: impl Into<String>) {
        self.inner.write().id = Some(id.into());
    }

    /// Get the unique id, derived from the current identity fields
    pub fn unique_id(&self) -> Option<String> {
        let inner = self.inner.read();
        let id = inner.id.as_deref()?;
        Some(unique_id::build(
            inner.scope.segment(),
            inner.bundle_kind.segment(),
            inner.origin.as_deref(),
            id,
            inner.branch.as_deref(),
        ))
    }

    pub fn kind(&self) -> AppKind {
        self.inner.read().kind
    }

    pub fn set_kind(&self, kind: AppKind) {
        self.inner.write().kind = kind;
    }

    pub fn scope(&self) -> AppScope {
        self.inner.read().scope
    }

    pub fn set_scope(&self, scope: AppScope) {
        self.inner.write().scope = scope;
    }

    pub fn bundle_kind(&self) -> BundleKind {
        self.inner.read().bundle_kind
    }

    pub fn set_bundle_kind(&self, bundle_kind: BundleKind) {
        self.inner.write().bundle_kind = bundle_kind;
    }

    text_property!(origin, set_origin);
    text_property!(
        /// Hostname the origin is served from
        origin_hostname,
        set_origin_hostname
    );
    text_property!(
        /// Human readable origin
        origin_ui,
        set_origin_ui
    );
    text_property!(branch, set_branch);
    text_property!(name, set_name);
    text_property!(summary, set_summary);
    text_property!(description, set_description);
    text_property!(
        /// SPDX license expression
        license,
        set_license
    );
    text_property!(version, set_version);
    text_property!(update_details, set_update_details);
    text_property!(developer_name, set_developer_name);
    text_property!(
        /// Custom CSS used when presenting the app
        css,
        set_css
    );

    pub fn state(&self) -> AppState {
        self.inner.read().state
    }

    /// Set the lifecycle state.
    ///
    /// Returns false and leaves the state untouched when the transition is
    /// not allowed. Stable states become the recovery point for
    /// [`App::set_state_recover`].
    pub fn set_state(&self, state: AppState) -> bool {
        let mut inner = self.inner.write();
        if inner.state == state {
            return false;
        }
        if !inner.state.can_transition_to(state) {
            tracing::warn!(
                app = ?inner.id,
                from = %inner.state,
                to = %state,
                "State change is not allowed"
            );
            return false;
        }
        inner.state = state;
        if !state.is_transient() {
            inner.state_recover = state;
        }
        if state == AppState::Unknown {
            inner.progress = PROGRESS_UNKNOWN;
        }
        true
    }

    /// Return to the last stable state after a failed transaction
    pub fn set_state_recover(&self) {
        let mut inner = self.inner.write();
        if inner.state_recover == AppState::Unknown || inner.state_recover == inner.state {
            return;
        }
        tracing::debug!(
            app = ?inner.id,
            from = %inner.state,
            to = %inner.state_recover,
            "Recovering state"
        );
        inner.progress = 0;
        inner.state = inner.state_recover;
    }

    pub fn progress(&self) -> u32 {
        self.inner.read().progress
    }

    /// Set progress in percent, values above 100 are clamped
    pub fn set_progress(&self, progress: u32) {
        let progress = if progress == PROGRESS_UNKNOWN {
            PROGRESS_UNKNOWN
        } else {
            progress.min(100)
        };
        self.inner.write().progress = progress;
    }

    pub fn allow_cancel(&self) -> bool {
        self.inner.read().allow_cancel
    }

    pub fn set_allow_cancel(&self, allow_cancel: bool) {
        self.inner.write().allow_cancel = allow_cancel;
    }

    pub fn quirks(&self) -> Quirks {
        self.inner.read().quirks
    }

    pub fn has_quirk(&self, quirk: Quirks) -> bool {
        self.inner.read().quirks.contains(quirk)
    }

    pub fn add_quirk(&self, quirk: Quirks) {
        self.inner.write().quirks.insert(quirk);
    }

    pub fn remove_quirk(&self, quirk: Quirks) {
        self.inner.write().quirks.remove(quirk);
    }

    /// Is this an unresolved placeholder
    pub fn is_wildcard(&self) -> bool {
        self.has_quirk(Quirks::IS_WILDCARD)
    }

    pub fn priority(&self) -> i32 {
        self.inner.read().priority
    }

    pub fn set_priority(&self, priority: i32) {
        self.inner.write().priority = priority;
    }

    pub fn management_plugin(&self) -> Option<String> {
        self.inner.read().management_plugin.clone()
    }

    /// Set the plugin owning lifecycle operations.
    ///
    /// Write-once: a later, different owner is refused, and wildcards can
    /// never be owned.
    pub fn set_management_plugin(&self, plugin: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.quirks.contains(Quirks::IS_WILDCARD) {
            tracing::warn!(
                app = ?inner.id,
                plugin,
                "Plugins should not adopt wildcard apps"
            );
            return false;
        }
        match inner.management_plugin.as_deref() {
            Some(current) if current == plugin => true,
            Some(current) => {
                tracing::warn!(
                    app = ?inner.id,
                    current,
                    plugin,
                    "Prevented change of management plugin"
                );
                false
            }
            None => {
                inner.management_plugin = Some(plugin.to_string());
                true
            }
        }
    }

    /// Get a shallow copy of the addons
    pub fn addons(&self) -> AppList {
        self.inner.read().addons.clone()
    }

    pub fn add_addon(&self, addon: &AppRef) {
        self.inner.write().addons.add(addon.clone());
    }

    pub fn remove_addon(&self, addon: &AppRef) {
        self.inner.write().addons.remove(addon);
    }

    /// Get the runtime, if it is still alive
    pub fn runtime(&self) -> Option<AppRef> {
        self.inner.read().runtime.as_ref().and_then(Weak::upgrade)
    }

    /// Set the runtime.
    ///
    /// Only a weak reference is kept; the runtime must be owned elsewhere,
    /// typically by a plugin cache.
    pub fn set_runtime(&self, runtime: &AppRef) {
        self.inner.write().runtime = Some(Arc::downgrade(runtime));
    }

    pub fn related(&self) -> AppList {
        self.inner.read().related.clone()
    }

    pub fn add_related(&self, related: &AppRef) {
        self.inner.write().related.add(related.clone());
    }

    pub fn history(&self) -> AppList {
        self.inner.read().history.clone()
    }

    pub fn add_history(&self, entry: &AppRef) {
        self.inner.write().history.add(entry.clone());
    }

    pub fn sources(&self) -> Vec<String> {
        self.inner.read().sources.clone()
    }

    /// The first package source
    pub fn source_default(&self) -> Option<String> {
        self.inner.read().sources.first().cloned()
    }

    pub fn add_source(&self, source: impl Into<String>) {
        let source = source.into();
        let mut inner = self.inner.write();
        if !inner.sources.contains(&source) {
            inner.sources.push(source);
        }
    }

    pub fn provides(&self) -> Vec<Provide> {
        self.inner.read().provides.clone()
    }

    pub fn add_provide(&self, kind: ProvideKind, value: impl Into<String>) {
        let provide = Provide {
            kind,
            value: value.into(),
        };
        let mut inner = self.inner.write();
        if !inner.provides.contains(&provide) {
            inner.provides.push(provide);
        }
    }

    pub fn categories(&self) -> Vec<String> {
        self.inner.read().categories.clone()
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.inner.read().categories.iter().any(|c| c == category)
    }

    pub fn add_category(&self, category: impl Into<String>) {
        let category = category.into();
        let mut inner = self.inner.write();
        if !inner.categories.contains(&category) {
            inner.categories.push(category);
        }
    }

    pub fn keywords(&self) -> Vec<String> {
        self.inner.read().keywords.clone()
    }

    pub fn add_keyword(&self, keyword: impl Into<String>) {
        let keyword = keyword.into();
        let mut inner = self.inner.write();
        if !inner.keywords.contains(&keyword) {
            inner.keywords.push(keyword);
        }
    }

    pub fn menu_path(&self) -> Vec<String> {
        self.inner.read().menu_path.clone()
    }

    pub fn set_menu_path(&self, path: Vec<String>) {
        self.inner.write().menu_path = path;
    }

    pub fn icon(&self) -> Option<Icon> {
        self.inner.read().icon.clone()
    }

    pub fn set_icon(&self, icon: Icon) {
        self.inner.write().icon = Some(icon);
    }

    pub fn url(&self, kind: UrlKind) -> Option<String> {
        self.inner.read().urls.get(url_key(kind)).cloned()
    }

    pub fn set_url(&self, kind: UrlKind, url: impl Into<String>) {
        self.inner
            .write()
            .urls
            .insert(url_key(kind).to_string(), url.into());
    }

    pub fn kudos(&self) -> Kudos {
        self.inner.read().kudos
    }

    pub fn add_kudo(&self, kudo: Kudos) {
        self.inner.write().kudos.insert(kudo);
    }

    pub fn reviews(&self) -> Vec<Review> {
        self.inner.read().reviews.clone()
    }

    pub fn add_review(&self, review: Review) {
        self.inner.write().reviews.push(review);
    }

    /// Sort reviews by priority, highest first
    pub fn sort_reviews(&self) {
        self.inner
            .write()
            .reviews
            .sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    pub fn rating(&self) -> Option<u32> {
        self.inner.read().rating
    }

    pub fn set_rating(&self, rating: u32) {
        self.inner.write().rating = Some(rating.min(100));
    }

    /// Star histogram, index 0 is "no stars"
    pub fn review_ratings(&self) -> Vec<u32> {
        self.inner.read().review_ratings.clone()
    }

    pub fn set_review_ratings(&self, ratings: Vec<u32>) {
        self.inner.write().review_ratings = ratings;
    }

    pub fn metadata_item(&self, key: &str) -> Option<String> {
        self.inner.read().metadata.get(key).cloned()
    }

    /// Set a metadata entry.
    ///
    /// The first writer wins: an existing, different value is kept and
    /// false is returned.
    pub fn set_metadata(&self, key: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        let mut inner = self.inner.write();
        match inner.metadata.get(key) {
            Some(existing) if *existing == value => true,
            Some(existing) => {
                tracing::debug!(
                    app = ?inner.id,
                    key,
                    existing = %existing,
                    ignored = %value,
                    "Metadata already set"
                );
                false
            }
            None => {
                inner.metadata.insert(key.to_string(), value);
                true
            }
        }
    }

    pub fn remove_metadata(&self, key: &str) {
        self.inner.write().metadata.remove(key);
    }

    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.inner.read().metadata.clone()
    }

    /// Search relevance, higher is better
    pub fn match_value(&self) -> u32 {
        self.inner.read().match_value
    }

    pub fn set_match_value(&self, match_value: u32) {
        self.inner.write().match_value = match_value;
    }

    pub fn release_date(&self) -> Option<DateTime<Utc>> {
        self.inner.read().release_date
    }

    pub fn set_release_date(&self, date: DateTime<Utc>) {
        self.inner.write().release_date = Some(date);
    }

    pub fn size_installed(&self) -> Option<u64> {
        self.inner.read().size_installed
    }

    pub fn set_size_installed(&self, size: u64) {
        self.inner.write().size_installed = Some(size);
    }

    pub fn size_download(&self) -> Option<u64> {
        self.inner.read().size_download
    }

    pub fn set_size_download(&self, size: u64) {
        self.inner.write().size_download = Some(size);
    }

    pub fn is_installed(&self) -> bool {
        matches!(
            self.state(),
            AppState::Installed | AppState::Updatable | AppState::UpdatableLive | AppState::Removing
        )
    }

    pub fn is_updatable(&self) -> bool {
        matches!(self.state(), AppState::Updatable | AppState::UpdatableLive)
    }

    /// Check whether the license only names free software licenses
    pub fn license_is_free(&self) -> bool {
        match self.license() {
            Some(license) => license_is_free(&license),
            None => false,
        }
    }

    /// Copy metadata and quirks from `donor` that this app does not have.
    ///
    /// Used when a wildcard is replaced by a concrete app. The wildcard
    /// quirk itself is never copied.
    pub fn subsume_metadata(&self, donor: &App) {
        if std::ptr::eq(self, donor) {
            return;
        }
        let (metadata, quirks) = {
            let donor = donor.inner.read();
            (donor.metadata.clone(), donor.quirks)
        };
        let mut inner = self.inner.write();
        for (key, value) in metadata {
            inner.metadata.entry(key).or_insert(value);
        }
        inner.quirks.insert(quirks.difference(Quirks::IS_WILDCARD));
    }

    /// Short description for log lines
    pub fn describe(&self) -> String {
        self.unique_id()
            .or_else(|| self.source_default())
            .unwrap_or_else(|| "<anonymous>".to_string())
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("App")
            .field("id", &inner.id)
            .field("kind", &inner.kind)
            .field("state", &inner.state)
            .field("quirks", &inner.quirks)
            .field("priority", &inner.priority)
            .field("management_plugin", &inner.management_plugin)
            .finish()
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.describe(), self.state(), self.kind())
    }
}

fn url_key(kind: UrlKind) -> &'static str {
    match kind {
        UrlKind::Homepage => "homepage",
        UrlKind::BugTracker => "bugtracker",
        UrlKind::Help => "help",
        UrlKind::Donation => "donation",
        UrlKind::Translate => "translate",
        UrlKind::Faq => "faq",
    }
}

const FREE_LICENSE_PREFIXES: &[&str] = &[
    "GPL-", "LGPL-", "AGPL-", "MPL-", "BSD-", "Apache-", "CC0-", "CC-BY-", "EPL-", "OFL-",
    "Artistic-", "MIT", "ISC", "Zlib", "Unlicense", "LicenseRef-public-domain", "PSF-",
    "Python-", "OpenSSL", "BSL-",
];

/// Check an SPDX expression for only free software license tokens
pub fn license_is_free(license: &str) -> bool {
    let tokens: Vec<&str> = license
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|t| !t.is_empty())
        .filter(|t| !matches!(*t, "AND" | "OR" | "WITH" | "and" | "or"))
        .collect();
    if tokens.is_empty() {
        return false;
    }
    tokens.iter().all(|token| {
        let token = token.trim_end_matches('+');
        token.starts_with("LicenseRef-free")
            || FREE_LICENSE_PREFIXES.iter().any(|p| token.starts_with(p))
    })
}
