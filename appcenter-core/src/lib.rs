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

//! Appcenter core data model
//!
//! Shared types used by the plugin loader, the refinement engine and every
//! backend plugin:
//! - [`App`]: a mutable, shared record for one installable unit
//! - [`AppList`]: an ordered, deduplicating collection of apps
//! - [`AppQuery`]: an immutable description of a wanted result set
//! - [`PluginError`]: the error taxonomy surfaced to callers
//! - [`PluginEvent`]: non-fatal warnings raised while plugins run
//!
//! Apps are reference counted and interior-mutable. The same physical app
//! may be visible from several lists and plugin caches at once.

pub mod app;
pub mod app_list;
pub mod category;
pub mod config;
pub mod error;
pub mod event;
pub mod flags;
pub mod query;
pub mod unique_id;

pub use app::{
    App, AppKind, AppRef, AppScope, AppState, BundleKind, Icon, IconKind, Provide, ProvideKind,
    Review, UrlKind, PROGRESS_UNKNOWN,
};
pub use app_list::AppList;
pub use category::{Category, CategoryRef};
pub use config::{ConfigError, LoaderConfig};
pub use error::{PluginError, PluginErrorKind, PluginResult};
pub use event::{PluginAction, PluginEvent, PluginEventBuilder};
pub use flags::{
    AppListFlags, DedupeFlags, EventFlags, Kudos, ListAppsFlags, Quirks, RefineFlags,
    RefineJobFlags, ReviewRefineFlags,
};
pub use query::{
    AppFilterFunc, AppQuery, AppQueryBuilder, AppSortFunc, DeveloperVerifiedType, LicenseType,
    ProvidesType, Tristate,
};
