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

//! Shared app cache
//!
//! Plugins use the cache to hand out the same physical [`App`] for the same
//! logical app across jobs. Lookups return shared handles: a mutation made
//! through one handle is visible to every other holder. Nothing is evicted
//! implicitly.
//!
//! [`App`]: appcenter_core::App

use appcenter_core::{unique_id, AppRef};
use dashmap::DashMap;

/// Concurrent app cache keyed by unique id
#[derive(Debug, Default)]
pub struct AppCache {
    apps: DashMap<String, AppRef>,
}

impl AppCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(app: &AppRef) -> Option<String> {
        app.unique_id().or_else(|| app.id())
    }

    /// Look up by exact key, then by wildcard-aware unique id matching
    pub fn lookup(&self, key: &str) -> Option<AppRef> {
        if let Some(app) = self.apps.get(key) {
            return Some(app.value().clone());
        }
        if !unique_id::is_valid(key) {
            return None;
        }
        self.apps
            .iter()
            .find(|entry| unique_id::equal(entry.key(), key))
            .map(|entry| entry.value().clone())
    }

    /// Look up by the plain id segment
    pub fn lookup_by_id(&self, id: &str) -> Option<AppRef> {
        self.apps
            .iter()
            .find(|entry| entry.value().id().as_deref() == Some(id))
            .map(|entry| entry.value().clone())
    }

    /// Insert an app, returning the app already cached under the same key
    pub fn insert(&self, app: &AppRef) -> AppRef {
        let Some(key) = Self::key(app) else {
            tracing::debug!("Not caching app without id");
            return app.clone();
        };
        self.apps.entry(key).or_insert_with(|| app.clone()).clone()
    }

    pub fn remove(&self, app: &AppRef) -> Option<AppRef> {
        let key = Self::key(app)?;
        self.apps.remove(&key).map(|(_, v)| v)
    }

    /// Drop every cached app
    pub fn invalidate(&self) {
        self.apps.clear();
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appcenter_core::App;
    use std::sync::Arc;

    #[test]
    fn test_insert_returns_existing() {
        let cache = AppCache::new();
        let first = App::new("zeus.desktop");
        let second = App::new("zeus.desktop");

        let cached = cache.insert(&first);
        assert!(Arc::ptr_eq(&cached, &first));
        let cached = cache.insert(&second);
        assert!(Arc::ptr_eq(&cached, &first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lookup_aliasing() {
        let cache = AppCache::new();
        let app = App::new("zeus.desktop");
        app.set_origin("fedora");
        cache.insert(&app);

        let found = cache.lookup("*/*/fedora/zeus.desktop/*").unwrap();
        found.set_name("Zeus");
        assert_eq!(app.name().as_deref(), Some("Zeus"));

        assert!(cache.lookup("*/*/flathub/zeus.desktop/*").is_none());
        assert!(cache.lookup_by_id("zeus.desktop").is_some());
    }

    #[test]
    fn test_remove_and_invalidate() {
        let cache = AppCache::new();
        let a = App::new("a.desktop");
        cache.insert(&a);
        cache.insert(&App::new("b.desktop"));

        assert!(cache.remove(&a).is_some());
        assert_eq!(cache.len(), 1);
        cache.invalidate();
        assert!(cache.is_empty());
        assert!(cache.insert(&App::new_anonymous()).id().is_none());
        assert!(cache.is_empty());
    }
}
