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

//! Declarative app queries.
//!
//! An [`AppQuery`] is immutable once built. It carries one primary filter
//! property plus result shaping controls. Executors must apply them in this
//! order: filter, deduplicate, sort, truncate.
//!
//! # Example
//!
//! ```rust,ignore
//! let query = AppQuery::builder()
//!     .with_keywords(["zeus"])
//!     .with_refine_require_flags(RefineFlags::ICON)
//!     .with_sort_func(sort_by_match_value())
//!     .build();
//! assert_eq!(query.n_properties_set(), 1);
//! ```

use crate::app::{AppKind, AppRef};
use crate::flags::{DedupeFlags, RefineFlags, RefineJobFlags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Comparator used to order query results
pub type AppSortFunc = Arc<dyn Fn(&AppRef, &AppRef) -> Ordering + Send + Sync>;

/// Predicate used to filter query results
pub type AppFilterFunc = Arc<dyn Fn(&AppRef) -> bool + Send + Sync>;

/// A boolean that may be left unset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tristate {
    #[default]
    Unset,
    False,
    True,
}

impl Tristate {
    pub fn is_set(&self) -> bool {
        !matches!(self, Tristate::Unset)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Tristate::Unset => None,
            Tristate::False => Some(false),
            Tristate::True => Some(true),
        }
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::True
        } else {
            Tristate::False
        }
    }
}

/// What a `provides_tag` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvidesType {
    #[default]
    Unknown,
    PackageName,
    Gstreamer,
    Font,
    MimeHandler,
    PsDriver,
    Plasma,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LicenseType {
    #[default]
    Any,
    /// Only free and open source software
    Foss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeveloperVerifiedType {
    #[default]
    Any,
    /// Only apps from verified developers
    Only,
}

/// Immutable description of a desired result set
#[derive(Clone, Default)]
pub struct AppQuery {
    refine_job_flags: RefineJobFlags,
    refine_require_flags: RefineFlags,
    max_results: usize,
    dedupe_flags: DedupeFlags,
    sort_func: Option<AppSortFunc>,
    filter_func: Option<AppFilterFunc>,

    provides_files: Option<Vec<String>>,
    released_since: Option<DateTime<Utc>>,
    is_curated: Tristate,
    is_featured: Tristate,
    category: Option<String>,
    is_installed: Tristate,
    deployment_featured: Option<Vec<String>>,
    developers: Option<Vec<String>>,
    keywords: Option<Vec<String>>,
    alternate_of: Option<AppRef>,
    provides_tag: Option<String>,
    provides_type: ProvidesType,
    is_for_update: Tristate,
    component_kinds: Option<Vec<AppKind>>,
    is_langpack_for_locale: Option<String>,

    license_type: LicenseType,
    developer_verified_type: DeveloperVerifiedType,
}

impl AppQuery {
    pub fn builder() -> AppQueryBuilder {
        AppQueryBuilder::new()
    }

    /// Number of primary filter properties that are set.
    ///
    /// Shaping and refine controls, the license type and the developer
    /// verification type are not counted.
    pub fn n_properties_set(&self) -> usize {
        [
            self.provides_files.is_some(),
            self.released_since.is_some(),
            self.is_curated.is_set(),
            self.is_featured.is_set(),
            self.category.is_some(),
            self.is_installed.is_set(),
            self.deployment_featured.is_some(),
            self.developers.is_some(),
            self.keywords.is_some(),
            self.alternate_of.is_some(),
            self.provides_tag.is_some(),
            self.is_for_update.is_set(),
            self.component_kinds.is_some(),
            self.is_langpack_for_locale.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    pub fn refine_job_flags(&self) -> RefineJobFlags {
        self.refine_job_flags
    }

    pub fn refine_require_flags(&self) -> RefineFlags {
        self.refine_require_flags
    }

    /// Zero means unlimited
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    pub fn dedupe_flags(&self) -> DedupeFlags {
        self.dedupe_flags
    }

    pub fn sort_func(&self) -> Option<&AppSortFunc> {
        self.sort_func.as_ref()
    }

    pub fn filter_func(&self) -> Option<&AppFilterFunc> {
        self.filter_func.as_ref()
    }

    pub fn provides_files(&self) -> Option<&[String]> {
        self.provides_files.as_deref()
    }

    pub fn released_since(&self) -> Option<DateTime<Utc>> {
        self.released_since
    }

    pub fn is_curated(&self) -> Tristate {
        self.is_curated
    }

    pub fn is_featured(&self) -> Tristate {
        self.is_featured
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_installed(&self) -> Tristate {
        self.is_installed
    }

    pub fn deployment_featured(&self) -> Option<&[String]> {
        self.deployment_featured.as_deref()
    }

    pub fn developers(&self) -> Option<&[String]> {
        self.developers.as_deref()
    }

    pub fn keywords(&self) -> Option<&[String]> {
        self.keywords.as_deref()
    }

    pub fn alternate_of(&self) -> Option<&AppRef> {
        self.alternate_of.as_ref()
    }

    pub fn provides_tag(&self) -> Option<&str> {
        self.provides_tag.as_deref()
    }

    pub fn provides_type(&self) -> ProvidesType {
        self.provides_type
    }

    pub fn is_for_update(&self) -> Tristate {
        self.is_for_update
    }

    pub fn component_kinds(&self) -> Option<&[AppKind]> {
        self.component_kinds.as_deref()
    }

    pub fn is_langpack_for_locale(&self) -> Option<&str> {
        self.is_langpack_for_locale.as_deref()
    }

    pub fn license_type(&self) -> LicenseType {
        self.license_type
    }

    pub fn developer_verified_type(&self) -> DeveloperVerifiedType {
        self.developer_verified_type
    }
}

impl fmt::Debug for AppQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("AppQuery");
        d.field("refine_require_flags", &self.refine_require_flags)
            .field("max_results", &self.max_results)
            .field("dedupe_flags", &self.dedupe_flags);
        if let Some(v) = &self.keywords {
            d.field("keywords", v);
        }
        if self.is_installed.is_set() {
            d.field("is_installed", &self.is_installed);
        }
        if let Some(v) = &self.category {
            d.field("category", v);
        }
        if let Some(v) = &self.alternate_of {
            d.field("alternate_of", &v.describe());
        }
        if let Some(v) = &self.provides_tag {
            d.field("provides_tag", v)
                .field("provides_type", &self.provides_type);
        }
        d.finish_non_exhaustive()
    }
}

/// Builder for [`AppQuery`]
pub struct AppQueryBuilder {
    query: AppQuery,
}

impl AppQueryBuilder {
    pub fn new() -> Self {
        Self {
            query: AppQuery {
                dedupe_flags: DedupeFlags::DEFAULT,
                ..Default::default()
            },
        }
    }

    pub fn with_refine_job_flags(mut self, flags: RefineJobFlags) -> Self {
        self.query.refine_job_flags = flags;
        self
    }

    pub fn with_refine_require_flags(mut self, flags: RefineFlags) -> Self {
        self.query.refine_require_flags = flags;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.query.max_results = max_results;
        self
    }

    pub fn with_dedupe_flags(mut self, flags: DedupeFlags) -> Self {
        self.query.dedupe_flags = flags;
        self
    }

    pub fn with_sort_func(mut self, func: AppSortFunc) -> Self {
        self.query.sort_func = Some(func);
        self
    }

    pub fn with_filter_func(mut self, func: AppFilterFunc) -> Self {
        self.query.filter_func = Some(func);
        self
    }

    pub fn with_provides_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.provides_files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_released_since(mut self, since: DateTime<Utc>) -> Self {
        self.query.released_since = Some(since);
        self
    }

    pub fn with_is_curated(mut self, value: impl Into<Tristate>) -> Self {
        self.query.is_curated = value.into();
        self
    }

    pub fn with_is_featured(mut self, value: impl Into<Tristate>) -> Self {
        self.query.is_featured = value.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.query.category = Some(category.into());
        self
    }

    pub fn with_is_installed(mut self, value: impl Into<Tristate>) -> Self {
        self.query.is_installed = value.into();
        self
    }

    pub fn with_deployment_featured<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.deployment_featured = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_developers<I, S>(mut self, developers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.developers = Some(developers.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query.keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_alternate_of(mut self, app: AppRef) -> Self {
        self.query.alternate_of = Some(app);
        self
    }

    pub fn with_provides(mut self, provides_type: ProvidesType, tag: impl Into<String>) -> Self {
        self.query.provides_type = provides_type;
        self.query.provides_tag = Some(tag.into());
        self
    }

    pub fn with_is_for_update(mut self, value: impl Into<Tristate>) -> Self {
        self.query.is_for_update = value.into();
        self
    }

    pub fn with_component_kinds(mut self, kinds: Vec<AppKind>) -> Self {
        self.query.component_kinds = Some(kinds);
        self
    }

    pub fn with_is_langpack_for_locale(mut self, locale: impl Into<String>) -> Self {
        self.query.is_langpack_for_locale = Some(locale.into());
        self
    }

    pub fn with_license_type(mut self, license_type: LicenseType) -> Self {
        self.query.license_type = license_type;
        self
    }

    pub fn with_developer_verified_type(mut self, verified: DeveloperVerifiedType) -> Self {
        self.query.developer_verified_type = verified;
        self
    }

    pub fn build(self) -> AppQuery {
        self.query
    }
}

impl Default for AppQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by search relevance, best match first
pub fn sort_by_match_value() -> AppSortFunc {
    Arc::new(|a: &AppRef, b: &AppRef| b.match_value().cmp(&a.match_value()))
}

/// Sort by display name, case-insensitively
pub fn sort_by_name() -> AppSortFunc {
    Arc::new(|a: &AppRef, b: &AppRef| {
        let name = |app: &AppRef| app.name().unwrap_or_default().to_lowercase();
        name(a).cmp(&name(b))
    })
}

/// Sort by release date, newest first
pub fn sort_by_release_date() -> AppSortFunc {
    Arc::new(|a: &AppRef, b: &AppRef| b.release_date().cmp(&a.release_date()))
}
