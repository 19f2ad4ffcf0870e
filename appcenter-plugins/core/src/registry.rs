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

//! Plugin registry
//!
//! Holds every registered plugin with its resolved order, priority and
//! enabled state, kept sorted by `(order, name)`.

use crate::capabilities::{Capability, CapabilitySet};
use crate::plugin::Plugin;
use crate::resolver::{PluginSpec, ResolvedPlugin};
use appcenter_core::{AppKind, AppList, AppRef, AppState, PluginError, PluginResult, RefineFlags};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

/// A registered plugin and its scheduling state
pub struct PluginEntry {
    plugin: Arc<dyn Plugin>,
    capabilities: CapabilitySet,
    order: AtomicI32,
    priority: AtomicI32,
    enabled: AtomicBool,
}

impl PluginEntry {
    fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            capabilities: plugin.capabilities(),
            order: AtomicI32::new(plugin.order()),
            priority: AtomicI32::new(plugin.priority()),
            enabled: AtomicBool::new(true),
            plugin,
        }
    }

    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn order(&self) -> i32 {
        self.order.load(Ordering::Acquire)
    }

    pub fn priority(&self) -> i32 {
        self.priority.load(Ordering::Acquire)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.capabilities.has(&cap)
    }
}

impl std::fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginEntry")
            .field("name", &self.name())
            .field("order", &self.order())
            .field("priority", &self.priority())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Registry of loaded plugins
pub struct PluginRegistry {
    plugins: RwLock<Vec<Arc<PluginEntry>>>,
}

impl PluginRegistry {
    /// Create a new plugin registry
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// Register a plugin
    pub fn register(&self, plugin: Arc<dyn Plugin>) -> PluginResult<()> {
        let mut plugins = self.plugins.write();
        if plugins.iter().any(|e| e.name() == plugin.name()) {
            return Err(PluginError::Failed(format!(
                "plugin {} already registered",
                plugin.name()
            )));
        }
        plugins.push(Arc::new(PluginEntry::new(plugin)));
        sort_entries(&mut plugins);
        Ok(())
    }

    /// Unregister a plugin
    pub fn unregister(&self, name: &str) -> PluginResult<Arc<dyn Plugin>> {
        let mut plugins = self.plugins.write();
        let idx = plugins
            .iter()
            .position(|e| e.name() == name)
            .ok_or_else(|| PluginError::Failed(format!("plugin {} not registered", name)))?;
        Ok(plugins.remove(idx).plugin.clone())
    }

    /// Get every plugin, enabled or not, in scheduling order
    pub fn get_plugins(&self) -> Vec<Arc<PluginEntry>> {
        self.plugins.read().clone()
    }

    /// Get enabled plugins implementing `cap`, in scheduling order
    pub fn plugins_with(&self, cap: Capability) -> Vec<Arc<PluginEntry>> {
        self.plugins
            .read()
            .iter()
            .filter(|e| e.is_enabled() && e.has(cap))
            .cloned()
            .collect()
    }

    pub fn find_plugin(&self, name: &str) -> Option<Arc<PluginEntry>> {
        self.plugins.read().iter().find(|e| e.name() == name).cloned()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins
            .read()
            .iter()
            .map(|e| e.name().to_string())
            .collect()
    }

    /// Enable a plugin; returns false if it is not registered
    pub fn enable(&self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable a plugin; returns false if it is not registered
    pub fn disable(&self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.find_plugin(name) {
            Some(entry) => {
                entry.set_enabled(enabled);
                true
            }
            None => false,
        }
    }

    /// Check if a plugin is registered
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.read().iter().any(|e| e.name() == name)
    }

    /// Get plugin count
    pub fn count(&self) -> usize {
        self.plugins.read().len()
    }

    /// Clear all plugins
    pub fn clear(&self) {
        self.plugins.write().clear();
    }

    /// Snapshot the declared state for rule resolution
    pub fn specs(&self) -> Vec<PluginSpec> {
        self.plugins
            .read()
            .iter()
            .map(|e| PluginSpec {
                name: e.name().to_string(),
                order: e.plugin.order(),
                priority: e.plugin.priority(),
                enabled: e.is_enabled(),
                rules: e.plugin.rules(),
            })
            .collect()
    }

    /// Store resolved order, priority and enabled state, then re-sort
    pub fn apply_resolution(&self, resolved: &[ResolvedPlugin]) {
        let mut plugins = self.plugins.write();
        for r in resolved {
            if let Some(entry) = plugins.iter().find(|e| e.name() == r.name) {
                entry.order.store(r.order, Ordering::Release);
                entry.priority.store(r.priority, Ordering::Release);
                entry.set_enabled(r.enabled);
            }
        }
        sort_entries(&mut plugins);
    }

    /// Offer every unowned app to the plugins that adopt apps
    pub fn run_adopt(&self, list: &AppList) {
        for entry in self.plugins_with(Capability::AdoptApp) {
            for app in list {
                if app.management_plugin().is_some() || app.is_wildcard() {
                    continue;
                }
                entry.plugin.adopt_app(app);
            }
        }
        for app in list {
            if app.management_plugin().is_none() && !app.is_wildcard() {
                tracing::debug!(app = %app.describe(), "nothing adopted");
            }
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn sort_entries(plugins: &mut [Arc<PluginEntry>]) {
    plugins.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| a.name().cmp(b.name()))
    });
}

/// Check whether an app is fit to be shown to the user
pub fn app_is_valid(app: &AppRef, flags: RefineFlags) -> bool {
    let reject = |reason: &str| {
        tracing::debug!(app = %app.describe(), reason, "app invalid");
        false
    };

    match app.kind() {
        AppKind::Addon => return reject("addon"),
        AppKind::Console => return reject("console app"),
        _ => {}
    }
    if app.state() == AppState::Unknown {
        return reject("unknown state");
    }
    if app.kind() == AppKind::Unknown && app.state() == AppState::Unavailable {
        return reject("unknown kind and unavailable");
    }
    if app.has_category("Blacklisted") {
        return reject("blacklisted");
    }
    match app.kind() {
        AppKind::Repository => return reject("repository"),
        AppKind::Unknown => return reject("unknown kind"),
        AppKind::Generic if !flags.contains(RefineFlags::ALLOW_PACKAGES) => {
            return reject("package")
        }
        _ => {}
    }
    if app.name().is_none() {
        return reject("no name");
    }
    if app.summary().is_none() {
        return reject("no summary");
    }
    if flags.contains(RefineFlags::ICON) && app.kind() == AppKind::DesktopApp && app.icon().is_none()
    {
        return reject("no icon");
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::Capability;
    use crate::resolver::DependencyResolver;
    use appcenter_core::{App, Icon};
    use async_trait::async_trait;

    struct Named {
        name: &'static str,
        order: i32,
    }

    #[async_trait]
    impl Plugin for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::AdoptApp)
        }

        fn adopt_app(&self, app: &AppRef) {
            if app.id().is_some_and(|id| id.starts_with(self.name)) {
                app.set_management_plugin(self.name);
            }
        }
    }

    fn named(name: &'static str, order: i32) -> Arc<dyn Plugin> {
        Arc::new(Named { name, order })
    }

    fn valid_app() -> AppRef {
        let app = App::new("zeus.desktop");
        app.set_kind(AppKind::DesktopApp);
        app.set_state(AppState::Available);
        app.set_name("Zeus");
        app.set_summary("A teaching application");
        app
    }

    #[test]
    fn test_registry_operations() {
        let registry = PluginRegistry::new();
        registry.register(named("zeta", 0)).unwrap();
        registry.register(named("alpha", 5)).unwrap();
        registry.register(named("beta", 0)).unwrap();
        assert!(registry.register(named("beta", 1)).is_err());

        assert_eq!(registry.plugin_names(), vec!["beta", "zeta", "alpha"]);
        assert_eq!(registry.count(), 3);
        assert!(registry.contains("alpha"));

        assert!(registry.disable("zeta"));
        assert!(!registry.disable("missing"));
        assert_eq!(registry.plugins_with(Capability::AdoptApp).len(), 2);

        registry.unregister("alpha").unwrap();
        assert!(registry.find_plugin("alpha").is_none());
        assert!(registry.unregister("alpha").is_err());
    }

    #[test]
    fn test_apply_resolution() {
        let registry = PluginRegistry::new();
        registry.register(named("a", 0)).unwrap();
        registry.register(named("b", 0)).unwrap();

        let mut resolver = DependencyResolver::new();
        for mut spec in registry.specs() {
            if spec.name == "a" {
                spec.rules = vec![crate::resolver::PluginRule::RunAfter("b".to_string())];
            }
            resolver.add_available(spec);
        }
        registry.apply_resolution(&resolver.resolve().unwrap());

        assert_eq!(registry.plugin_names(), vec!["b", "a"]);
        assert_eq!(registry.find_plugin("a").unwrap().order(), 1);
    }

    #[test]
    fn test_run_adopt() {
        let registry = PluginRegistry::new();
        registry.register(named("dummy", 0)).unwrap();

        let mut list = AppList::new();
        let mine = list.add(App::new("dummy:chiron"));
        let other = list.add(App::new("org.example.Other"));
        let wildcard = list.add(App::new_wildcard("dummy:zeus", AppKind::DesktopApp));
        registry.run_adopt(&list);

        assert_eq!(mine.management_plugin().as_deref(), Some("dummy"));
        assert!(other.management_plugin().is_none());
        assert!(wildcard.management_plugin().is_none());
    }

    #[test]
    fn test_app_is_valid() {
        let app = valid_app();
        assert!(app_is_valid(&app, RefineFlags::empty()));
        assert!(!app_is_valid(&app, RefineFlags::ICON));
        app.set_icon(Icon::stock("zeus"));
        assert!(app_is_valid(&app, RefineFlags::ICON));

        let addon = valid_app();
        addon.set_kind(AppKind::Addon);
        assert!(!app_is_valid(&addon, RefineFlags::empty()));

        let package = valid_app();
        package.set_kind(AppKind::Generic);
        assert!(!app_is_valid(&package, RefineFlags::empty()));
        assert!(app_is_valid(&package, RefineFlags::ALLOW_PACKAGES));

        let unnamed = App::new("unnamed.desktop");
        unnamed.set_kind(AppKind::DesktopApp);
        unnamed.set_state(AppState::Available);
        assert!(!app_is_valid(&unnamed, RefineFlags::empty()));

        let hidden = valid_app();
        hidden.add_category("Blacklisted");
        assert!(!app_is_valid(&hidden, RefineFlags::empty()));

        assert!(!app_is_valid(&App::new("bare"), RefineFlags::empty()));
    }
}
