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

//! Ordered, deduplicating collections of apps.
//!
//! An [`AppList`] behaves like a set that remembers insertion order. Adding
//! an app that is already present (by glob-matching unique id) keeps the
//! existing entry. Wildcards carry no meaningful unique id, so two
//! wildcards are considered the same when their plain ids are equal.
//!
//! Cloning a list is shallow: the apps themselves are shared.

use crate::app::{AppRef, AppState, ProvideKind, PROGRESS_UNKNOWN};
use crate::flags::{AppListFlags, DedupeFlags};
use crate::unique_id;
use chrono::Datelike;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct AppList {
    apps: Vec<AppRef>,
    flags: AppListFlags,
    size_peak: usize,
}

impl AppList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a list holding a single app
    pub fn from_app(app: AppRef) -> Self {
        let mut list = Self::new();
        list.add(app);
        list
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn index(&self, idx: usize) -> Option<&AppRef> {
        self.apps.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AppRef> {
        self.apps.iter()
    }

    /// The largest length this list has ever had
    pub fn size_peak(&self) -> usize {
        self.size_peak
    }

    pub fn flags(&self) -> AppListFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: AppListFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn add_flag(&mut self, flag: AppListFlags) {
        self.flags.insert(flag);
    }

    /// Add an app unless it is already present.
    ///
    /// Returns the entry that is in the list afterwards: either `app` or the
    /// pre-existing duplicate.
    pub fn add(&mut self, app: AppRef) -> AppRef {
        if let Some(existing) = self.find_duplicate(&app) {
            return existing;
        }
        self.push(app.clone());
        app
    }

    /// Add every app of `other`, with the same duplicate rules as [`AppList::add`]
    pub fn add_list(&mut self, other: &AppList) {
        for app in other.iter() {
            self.add(app.clone());
        }
    }

    /// Remove an app by identity
    pub fn remove(&mut self, app: &AppRef) -> bool {
        let before = self.apps.len();
        self.apps.retain(|a| !Arc::ptr_eq(a, app));
        self.apps.len() != before
    }

    pub fn remove_all(&mut self) {
        self.apps.clear();
    }

    /// Find the first app whose unique id glob-matches `unique_id`
    pub fn lookup(&self, unique_id: &str) -> Option<AppRef> {
        self.apps
            .iter()
            .find(|a| {
                a.unique_id()
                    .map(|uid| unique_id::equal(&uid, unique_id))
                    .unwrap_or(false)
            })
            .cloned()
    }

    /// Keep only the apps for which `keep` returns true
    pub fn filter<F>(&mut self, mut keep: F)
    where
        F: FnMut(&AppRef) -> bool,
    {
        self.apps.retain(|a| keep(a));
    }

    /// Stable sort with a comparator
    pub fn sort_by<F>(&mut self, compare: F)
    where
        F: FnMut(&AppRef, &AppRef) -> Ordering,
    {
        self.apps.sort_by(compare);
    }

    /// Shorten the list to `length` entries and mark it truncated
    pub fn truncate(&mut self, length: usize) {
        if length >= self.apps.len() {
            return;
        }
        self.apps.truncate(length);
        self.flags.insert(AppListFlags::IS_TRUNCATED);
    }

    /// Shuffle the list.
    ///
    /// The generator is seeded with the day of the year, so the order is
    /// stable within one day.
    pub fn randomize(&mut self) {
        let seed = chrono::Local::now().ordinal() as u64;
        self.randomize_with_seed(seed);
    }

    pub fn randomize_with_seed(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        self.apps.shuffle(&mut rng);
        self.flags.insert(AppListFlags::IS_RANDOMIZED);
    }

    /// Shallow copy without the list flags
    pub fn copy(&self) -> Self {
        let mut list = Self::new();
        for app in &self.apps {
            list.push(app.clone());
        }
        list
    }

    /// Remove duplicates according to `flags`.
    ///
    /// Two apps are duplicates when they share a key. With empty flags the
    /// key is the unique id. With `KEY_ID_PROVIDES` every id-kind provide is
    /// an extra key. Otherwise the key is built from the selected fields.
    /// Between duplicates, an installed app wins when `PREFER_INSTALLED` is
    /// set, then the higher priority; on a tie the first one seen stays.
    pub fn filter_duplicates(&mut self, flags: DedupeFlags) {
        let mut by_key: HashMap<String, AppRef> = HashMap::new();
        let mut kept: HashSet<*const crate::app::App> = HashSet::new();

        for app in &self.apps {
            let keys = dedupe_keys(app, flags);
            if keys.is_empty() {
                kept.insert(Arc::as_ptr(app));
                continue;
            }

            let found = keys.iter().find_map(|k| by_key.get(k).cloned());
            match found {
                None => {
                    for key in keys {
                        by_key.insert(key, app.clone());
                    }
                    kept.insert(Arc::as_ptr(app));
                }
                Some(found) => {
                    if !flags.is_empty() && app_is_better(app, &found, flags) {
                        // keys of the evicted app now lead to its replacement
                        for bound in by_key.values_mut() {
                            if Arc::ptr_eq(bound, &found) {
                                *bound = app.clone();
                            }
                        }
                        for key in keys {
                            by_key.insert(key, app.clone());
                        }
                        kept.remove(&Arc::as_ptr(&found));
                        kept.insert(Arc::as_ptr(app));
                    }
                }
            }
        }

        self.apps.retain(|a| kept.contains(&Arc::as_ptr(a)));
    }

    /// Aggregate state of the apps in the list
    pub fn state(&self) -> AppState {
        if self.apps.iter().any(|a| a.state() == AppState::Installing) {
            return AppState::Installing;
        }
        if self.apps.iter().any(|a| a.state() == AppState::Removing) {
            return AppState::Removing;
        }
        AppState::Unknown
    }

    /// Mean progress of the apps with known progress
    pub fn progress(&self) -> u32 {
        let known: Vec<u32> = self
            .apps
            .iter()
            .map(|a| a.progress())
            .filter(|p| *p != PROGRESS_UNKNOWN)
            .collect();
        if known.is_empty() {
            return PROGRESS_UNKNOWN;
        }
        known.iter().sum::<u32>() / known.len() as u32
    }

    fn push(&mut self, app: AppRef) {
        self.apps.push(app);
        self.size_peak = self.size_peak.max(self.apps.len());
    }

    fn find_duplicate(&self, app: &AppRef) -> Option<AppRef> {
        if app.is_wildcard() {
            let id = app.id();
            return self
                .apps
                .iter()
                .filter(|a| a.is_wildcard())
                .find(|a| match (&id, a.id()) {
                    (Some(id), Some(other)) => *id == other,
                    _ => Arc::ptr_eq(a, app),
                })
                .cloned();
        }

        let Some(uid) = app.unique_id() else {
            return self.apps.iter().find(|a| Arc::ptr_eq(a, app)).cloned();
        };

        self.apps
            .iter()
            .filter(|a| !a.is_wildcard())
            .find(|a| {
                a.unique_id()
                    .map(|other| unique_id::equal(&other, &uid))
                    .unwrap_or(false)
            })
            .cloned()
    }
}

fn dedupe_keys(app: &AppRef, flags: DedupeFlags) -> Vec<String> {
    if flags.is_empty() {
        return app.unique_id().into_iter().collect();
    }

    if flags.contains(DedupeFlags::KEY_ID_PROVIDES) {
        let mut keys: Vec<String> = app.id().into_iter().collect();
        keys.extend(
            app.provides()
                .into_iter()
                .filter(|p| p.kind == ProvideKind::Id)
                .map(|p| p.value),
        );
        return keys;
    }

    let mut key = String::new();
    if flags.contains(DedupeFlags::KEY_ID) {
        if let Some(id) = app.id() {
            key.push_str(&id);
        }
    }
    if flags.contains(DedupeFlags::KEY_SOURCE) {
        if let Some(source) = app.source_default() {
            key.push(':');
            key.push_str(&source);
        }
    }
    if flags.contains(DedupeFlags::KEY_VERSION) {
        if let Some(version) = app.version() {
            key.push(':');
            key.push_str(&version);
        }
    }
    if key.is_empty() {
        return Vec::new();
    }
    vec![key]
}

fn app_is_better(app: &AppRef, found: &AppRef, flags: DedupeFlags) -> bool {
    if flags.contains(DedupeFlags::PREFER_INSTALLED) {
        match (app.is_installed(), found.is_installed()) {
            (true, false) => return true,
            (false, true) => return false,
            _ => {}
        }
    }
    app.priority() > found.priority()
}

impl<'a> IntoIterator for &'a AppList {
    type Item = &'a AppRef;
    type IntoIter = std::slice::Iter<'a, AppRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.apps.iter()
    }
}

impl FromIterator<AppRef> for AppList {
    fn from_iter<I: IntoIterator<Item = AppRef>>(iter: I) -> Self {
        let mut list = AppList::new();
        for app in iter {
            list.add(app);
        }
        list
    }
}

impl std::fmt::Debug for AppList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.apps.iter().map(|a| a.describe()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{App, AppKind, AppScope, BundleKind};
    use proptest::prelude::*;

    fn app_with_origin(id: &str, origin: &str) -> AppRef {
        let app = App::new(id);
        app.set_origin(origin);
        app
    }

    #[test]
    fn test_add_dedupes_by_unique_id() {
        let mut list = AppList::new();
        let first = app_with_origin("zeus.desktop", "fedora");
        list.add(first.clone());

        let dup = app_with_origin("zeus.desktop", "fedora");
        let entry = list.add(dup);
        assert!(Arc::ptr_eq(&entry, &first));
        assert_eq!(list.len(), 1);

        list.add(app_with_origin("zeus.desktop", "flathub"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_add_glob_match() {
        let mut list = AppList::new();
        let concrete = App::new("zeus.desktop");
        concrete.set_scope(AppScope::User);
        concrete.set_bundle_kind(BundleKind::Snap);
        list.add(concrete);

        // "*/*/*/zeus.desktop/*" matches the scoped entry
        list.add(App::new("zeus.desktop"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_wildcards_dedupe_by_id() {
        let mut list = AppList::new();
        list.add(App::new_wildcard("zeus.desktop", AppKind::DesktopApp));
        list.add(App::new_wildcard("zeus.desktop", AppKind::Unknown));
        assert_eq!(list.len(), 1);

        list.add(App::new_wildcard("chiron.desktop", AppKind::DesktopApp));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_concrete_added_next_to_wildcard() {
        let mut list = AppList::new();
        list.add(App::new_wildcard("zeus.desktop", AppKind::DesktopApp));
        list.add(App::new("zeus.desktop"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_anonymous_dedupe_by_identity() {
        let mut list = AppList::new();
        let anon = App::new_anonymous();
        anon.add_source("zeus");
        list.add(anon.clone());
        list.add(anon.clone());
        assert_eq!(list.len(), 1);
        list.add(App::new_anonymous());
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_remove_and_lookup() {
        let mut list = AppList::new();
        let a = app_with_origin("a.desktop", "fedora");
        let b = app_with_origin("b.desktop", "fedora");
        list.add(a.clone());
        list.add(b.clone());

        assert!(list.lookup("*/*/fedora/b.desktop/*").is_some());
        assert!(list.remove(&b));
        assert!(!list.remove(&b));
        assert!(list.lookup("*/*/*/b.desktop/*").is_none());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_priority_tie_break() {
        let mut list = AppList::new();
        for (origin, priority) in [("a", 0), ("b", 99), ("c", 50)] {
            let app = app_with_origin("e", origin);
            app.set_priority(priority);
            list.add(app);
        }
        assert_eq!(list.len(), 3);

        list.filter_duplicates(DedupeFlags::KEY_ID);
        assert_eq!(list.len(), 1);
        assert_eq!(list.index(0).unwrap().priority(), 99);
    }

    #[test]
    fn test_priority_tie_keeps_first() {
        let mut list = AppList::new();
        list.add(app_with_origin("e", "first"));
        list.add(app_with_origin("e", "second"));
        list.filter_duplicates(DedupeFlags::KEY_ID);
        assert_eq!(list.len(), 1);
        assert_eq!(list.index(0).unwrap().origin().as_deref(), Some("first"));
    }

    #[test]
    fn test_prefer_installed() {
        let mut list = AppList::new();
        let installed = app_with_origin("e", "local");
        installed.set_state(AppState::Installed);
        installed.set_priority(0);
        let available = app_with_origin("e", "remote");
        available.set_state(AppState::Available);
        available.set_priority(100);
        list.add(available);
        list.add(installed.clone());

        list.filter_duplicates(DedupeFlags::KEY_ID | DedupeFlags::PREFER_INSTALLED);
        assert_eq!(list.len(), 1);
        assert!(Arc::ptr_eq(list.index(0).unwrap(), &installed));
    }

    #[test]
    fn test_dedupe_by_provides() {
        let mut list = AppList::new();
        let old = app_with_origin("org.old.Name", "fedora");
        let new = app_with_origin("org.new.Name", "fedora");
        new.add_provide(ProvideKind::Id, "org.old.Name");
        new.set_priority(10);
        list.add(old);
        list.add(new.clone());

        list.filter_duplicates(DedupeFlags::KEY_ID_PROVIDES);
        assert_eq!(list.len(), 1);
        assert!(Arc::ptr_eq(list.index(0).unwrap(), &new));
    }

    #[test]
    fn test_dedupe_replacement_inherits_keys() {
        let mut list = AppList::new();
        let old = app_with_origin("org.app.Name", "fedora");
        old.add_provide(ProvideKind::Id, "org.legacy.Name");
        let better = app_with_origin("org.app.Name", "flathub");
        better.set_priority(10);
        let legacy = app_with_origin("org.legacy.Name", "fedora");
        legacy.set_priority(5);
        list.add(old);
        list.add(better.clone());
        list.add(legacy);

        // legacy is compared against the replacement, not the evicted app
        list.filter_duplicates(DedupeFlags::KEY_ID_PROVIDES);
        assert_eq!(list.len(), 1);
        assert!(Arc::ptr_eq(list.index(0).unwrap(), &better));
    }

    #[test]
    fn test_dedupe_keeps_order_and_keyless() {
        let mut list = AppList::new();
        let a = app_with_origin("a", "x");
        let anon = App::new_anonymous();
        let b = app_with_origin("b", "x");
        let a2 = app_with_origin("a", "y");
        a2.set_priority(5);
        for app in [&a, &anon, &b, &a2] {
            list.add((*app).clone());
        }

        list.filter_duplicates(DedupeFlags::KEY_ID);
        let order: Vec<_> = list.iter().map(|a| a.describe()).collect();
        assert_eq!(
            order,
            vec![anon.describe(), b.describe(), a2.describe()]
        );
    }

    #[test]
    fn test_truncate_and_size_peak() {
        let mut list = AppList::new();
        for i in 0..5 {
            list.add(App::new(format!("app{}", i)));
        }
        list.truncate(10);
        assert!(!list.has_flag(AppListFlags::IS_TRUNCATED));

        list.truncate(3);
        assert_eq!(list.len(), 3);
        assert!(list.has_flag(AppListFlags::IS_TRUNCATED));
        assert_eq!(list.size_peak(), 5);

        list.truncate(1);
        assert_eq!(list.len(), 1);
        assert_eq!(list.size_peak(), 5);
    }

    #[test]
    fn test_randomize_is_seeded() {
        let mut a = AppList::new();
        for i in 0..20 {
            a.add(App::new(format!("app{}", i)));
        }
        let mut b = a.copy();
        a.randomize_with_seed(42);
        b.randomize_with_seed(42);
        let ids_a: Vec<_> = a.iter().map(|x| x.id()).collect();
        let ids_b: Vec<_> = b.iter().map(|x| x.id()).collect();
        assert_eq!(ids_a, ids_b);
        assert!(a.has_flag(AppListFlags::IS_RANDOMIZED));
    }

    #[test]
    fn test_state_and_progress() {
        let mut list = AppList::new();
        let a = App::new("a");
        a.set_state(AppState::Available);
        a.set_state(AppState::Installing);
        a.set_progress(20);
        let b = App::new("b");
        b.set_progress(60);
        let c = App::new("c");
        list.add(a);
        list.add(b);
        list.add(c);

        assert_eq!(list.state(), AppState::Installing);
        assert_eq!(list.progress(), 40);
        assert_eq!(AppList::new().progress(), PROGRESS_UNKNOWN);
    }

    #[test]
    fn test_copy_is_shallow() {
        let mut list = AppList::new();
        list.add(App::new("a"));
        list.truncate(0);
        let copy = list.copy();
        assert!(copy.flags().is_empty());

        let mut list = AppList::new();
        let app = App::new("shared");
        list.add(app.clone());
        let copy = list.copy();
        app.set_name("Shared");
        assert_eq!(copy.index(0).unwrap().name().as_deref(), Some("Shared"));
    }

    proptest! {
        #[test]
        fn prop_distinct_ids_each_add_one(n in 1usize..40) {
            let mut list = AppList::new();
            for i in 0..n {
                list.add(app_with_origin(&format!("app{}", i), "origin"));
                prop_assert_eq!(list.len(), i + 1);
            }
        }

        #[test]
        fn prop_re_adding_never_grows(ids in proptest::collection::vec(0u8..10, 1..50)) {
            let mut list = AppList::new();
            for id in &ids {
                let before = list.len();
                let app = app_with_origin(&format!("app{}", id), "origin");
                let present = list.lookup(&app.unique_id().unwrap()).is_some();
                list.add(app);
                if present {
                    prop_assert_eq!(list.len(), before);
                } else {
                    prop_assert_eq!(list.len(), before + 1);
                }
            }
        }

        #[test]
        fn prop_filter_duplicates_leaves_unique_ids(ids in proptest::collection::vec(0u8..8, 0..40)) {
            let mut list = AppList::new();
            for (i, id) in ids.iter().enumerate() {
                let app = app_with_origin(&format!("app{}", id), &format!("o{}", i));
                app.set_priority(i as i32 % 3);
                list.add(app);
            }
            list.filter_duplicates(DedupeFlags::KEY_ID);
            let mut seen = HashSet::new();
            for app in &list {
                prop_assert!(seen.insert(app.id().unwrap()));
            }
        }
    }
}
