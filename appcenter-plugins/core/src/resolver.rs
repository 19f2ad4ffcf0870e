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

//! Plugin rule resolver
//!
//! Turns the declared `RunAfter`/`RunBefore`/`BetterThan`/`Conflicts` rules
//! into a final order, priority and enabled state for every plugin. Order
//! and priority constraints are layered with Kahn's algorithm.

use appcenter_core::{PluginError, PluginResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Relationship a plugin declares towards another plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "plugin", rename_all = "snake_case")]
pub enum PluginRule {
    /// Run in a later order batch than the named plugin
    RunAfter(String),
    /// Run in an earlier order batch than the named plugin
    RunBefore(String),
    /// Disable the named plugin when both are enabled
    Conflicts(String),
    /// Take precedence over the named plugin when deduplicating
    BetterThan(String),
}

impl PluginRule {
    pub fn target(&self) -> &str {
        match self {
            PluginRule::RunAfter(t)
            | PluginRule::RunBefore(t)
            | PluginRule::Conflicts(t)
            | PluginRule::BetterThan(t) => t,
        }
    }
}

/// Declared state of one plugin before resolution
#[derive(Debug, Clone)]
pub struct PluginSpec {
    pub name: String,
    pub order: i32,
    pub priority: i32,
    pub enabled: bool,
    pub rules: Vec<PluginRule>,
}

/// Plugin state after resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPlugin {
    pub name: String,
    pub order: i32,
    pub priority: i32,
    pub enabled: bool,
}

/// Rule resolver
pub struct DependencyResolver {
    /// Available plugins by name
    available: BTreeMap<String, PluginSpec>,
}

impl DependencyResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self {
            available: BTreeMap::new(),
        }
    }

    /// Add an available plugin
    pub fn add_available(&mut self, spec: PluginSpec) {
        self.available.insert(spec.name.clone(), spec);
    }

    /// Remove an available plugin
    pub fn remove_available(&mut self, name: &str) {
        self.available.remove(name);
    }

    /// Clear all available plugins
    pub fn clear(&mut self) {
        self.available.clear();
    }

    /// Resolve every rule, returning plugins sorted by `(order, name)`
    pub fn resolve(&self) -> PluginResult<Vec<ResolvedPlugin>> {
        let mut enabled: HashMap<&str, bool> = self
            .available
            .values()
            .map(|s| (s.name.as_str(), s.enabled))
            .collect();

        // Conflicts first, so disabled plugins drop out of the ordering
        for spec in self.available.values() {
            if !enabled[spec.name.as_str()] {
                continue;
            }
            for rule in &spec.rules {
                if let PluginRule::Conflicts(target) = rule {
                    match enabled.get_mut(target.as_str()) {
                        Some(state) if *state => {
                            tracing::info!(
                                plugin = %target,
                                conflicts_with = %spec.name,
                                "Disabling plugin due to conflict"
                            );
                            *state = false;
                        }
                        _ => {
                            tracing::debug!(plugin = %spec.name, target = %target, "Conflict target not enabled");
                        }
                    }
                }
            }
        }

        let mut order_edges = Vec::new();
        let mut priority_edges = Vec::new();
        for spec in self.available.values() {
            if !enabled[spec.name.as_str()] {
                continue;
            }
            for rule in &spec.rules {
                let target = rule.target();
                if !enabled.get(target).copied().unwrap_or(false) {
                    tracing::debug!(
                        plugin = %spec.name,
                        target = %target,
                        "Ignoring rule for missing or disabled plugin"
                    );
                    continue;
                }
                match rule {
                    PluginRule::RunAfter(t) => order_edges.push((t.as_str(), spec.name.as_str())),
                    PluginRule::RunBefore(t) => order_edges.push((spec.name.as_str(), t.as_str())),
                    PluginRule::BetterThan(t) => {
                        priority_edges.push((t.as_str(), spec.name.as_str()))
                    }
                    PluginRule::Conflicts(_) => {}
                }
            }
        }

        let active: Vec<&PluginSpec> = self
            .available
            .values()
            .filter(|s| enabled[s.name.as_str()])
            .collect();
        let orders = layer(
            active.iter().map(|s| (s.name.as_str(), s.order)),
            &order_edges,
            "order",
        )?;
        let priorities = layer(
            active.iter().map(|s| (s.name.as_str(), s.priority)),
            &priority_edges,
            "priority",
        )?;

        let mut resolved: Vec<ResolvedPlugin> = self
            .available
            .values()
            .map(|s| ResolvedPlugin {
                name: s.name.clone(),
                order: orders.get(s.name.as_str()).copied().unwrap_or(s.order),
                priority: priorities
                    .get(s.name.as_str())
                    .copied()
                    .unwrap_or(s.priority),
                enabled: enabled[s.name.as_str()],
            })
            .collect();
        resolved.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Ok(resolved)
    }

    /// Get plugins whose rules name this one
    pub fn reverse_dependencies(&self, name: &str) -> Vec<String> {
        self.available
            .values()
            .filter(|s| s.name != name && s.rules.iter().any(|r| r.target() == name))
            .map(|s| s.name.clone())
            .collect()
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Raise values so every edge `(a, b)` ends with `value(b) > value(a)`.
fn layer<'a>(
    nodes: impl Iterator<Item = (&'a str, i32)>,
    edges: &[(&'a str, &'a str)],
    what: &str,
) -> PluginResult<HashMap<&'a str, i32>> {
    let mut values: HashMap<&str, i32> = nodes.collect();
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = values.keys().map(|k| (*k, 0)).collect();

    for &(from, to) in edges {
        graph.entry(from).or_default().push(to);
        *in_degree.entry(to).or_insert(0) += 1;
    }

    // Kahn's algorithm, sorted start for stable logs
    let mut start: Vec<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    start.sort_unstable();
    let mut queue: VecDeque<&str> = start.into_iter().collect();
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(node) = queue.pop_front() {
        visited.insert(node);
        let base = values.get(node).copied().unwrap_or(0);
        if let Some(dependents) = graph.get(node) {
            for dependent in dependents {
                if let Some(value) = values.get_mut(dependent) {
                    if *value <= base {
                        *value = base + 1;
                    }
                }
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
    }

    if visited.len() != in_degree.len() {
        let mut remaining: Vec<_> = in_degree
            .keys()
            .filter(|n| !visited.contains(*n))
            .copied()
            .collect();
        remaining.sort_unstable();
        return Err(PluginError::DepsolveFailed(format!(
            "{} rules form a cycle: {}",
            what,
            remaining.join(" -> ")
        )));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, order: i32, rules: Vec<PluginRule>) -> PluginSpec {
        PluginSpec {
            name: name.to_string(),
            order,
            priority: 0,
            enabled: true,
            rules,
        }
    }

    fn find<'a>(resolved: &'a [ResolvedPlugin], name: &str) -> &'a ResolvedPlugin {
        resolved.iter().find(|p| p.name == name).unwrap()
    }

    #[test]
    fn test_simple_resolution() {
        let mut resolver = DependencyResolver::new();
        resolver.add_available(spec("b", 0, vec![]));
        resolver.add_available(spec("a", 0, vec![]));

        let resolved = resolver.resolve().unwrap();
        let names: Vec<_> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_run_after_and_before() {
        let mut resolver = DependencyResolver::new();
        resolver.add_available(spec("appstream", 0, vec![]));
        resolver.add_available(spec(
            "packagekit",
            0,
            vec![PluginRule::RunAfter("appstream".to_string())],
        ));
        resolver.add_available(spec(
            "icons",
            0,
            vec![PluginRule::RunAfter("packagekit".to_string())],
        ));
        resolver.add_available(spec(
            "early",
            5,
            vec![PluginRule::RunBefore("appstream".to_string())],
        ));

        let resolved = resolver.resolve().unwrap();
        let early = find(&resolved, "early").order;
        let appstream = find(&resolved, "appstream").order;
        let packagekit = find(&resolved, "packagekit").order;
        let icons = find(&resolved, "icons").order;
        assert!(early < appstream);
        assert!(appstream < packagekit);
        assert!(packagekit < icons);
        assert_eq!(resolved[0].name, "early");
    }

    #[test]
    fn test_cycle_detection() {
        let mut resolver = DependencyResolver::new();
        resolver.add_available(spec("a", 0, vec![PluginRule::RunAfter("b".to_string())]));
        resolver.add_available(spec("b", 0, vec![PluginRule::RunAfter("a".to_string())]));

        let result = resolver.resolve();
        assert!(matches!(result, Err(PluginError::DepsolveFailed(_))));
    }

    #[test]
    fn test_conflicts_disable_target() {
        let mut resolver = DependencyResolver::new();
        resolver.add_available(spec("new", 0, vec![PluginRule::Conflicts("old".to_string())]));
        resolver.add_available(spec("old", 0, vec![PluginRule::RunAfter("new".to_string())]));

        let resolved = resolver.resolve().unwrap();
        assert!(find(&resolved, "new").enabled);
        assert!(!find(&resolved, "old").enabled);
        // rules of a disabled plugin are not applied
        assert_eq!(find(&resolved, "old").order, 0);
    }

    #[test]
    fn test_better_than_and_missing_target() {
        let mut resolver = DependencyResolver::new();
        resolver.add_available(PluginSpec {
            priority: 10,
            ..spec("flatpak", 0, vec![])
        });
        resolver.add_available(spec(
            "snap",
            0,
            vec![
                PluginRule::BetterThan("flatpak".to_string()),
                PluginRule::RunAfter("missing".to_string()),
            ],
        ));

        let resolved = resolver.resolve().unwrap();
        assert_eq!(find(&resolved, "snap").priority, 11);
        assert_eq!(find(&resolved, "snap").order, 0);
        assert_eq!(resolver.reverse_dependencies("flatpak"), vec!["snap"]);
    }
}
