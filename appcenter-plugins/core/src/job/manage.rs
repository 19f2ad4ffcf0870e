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

//! Install and uninstall
//!
//! Each app is handed to its management plugin; apps without one are
//! offered for adoption first.

use super::{JobState, PluginJob};
use crate::capabilities::Capability;
use crate::loader::PluginLoader;
use crate::plugin::PluginContext;
use crate::refine::ErrorFold;
use crate::registry::PluginEntry;
use appcenter_core::{AppList, EventFlags, PluginError, PluginEvent, PluginResult};
use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::Mutex;
use std::sync::Arc;

/// Group apps by the plugin that manages them
fn group_by_plugin(
    loader: &PluginLoader,
    apps: &AppList,
    cap: Capability,
) -> PluginResult<Vec<(Arc<PluginEntry>, AppList)>> {
    loader.registry().run_adopt(apps);

    let mut groups: Vec<(Arc<PluginEntry>, AppList)> = Vec::new();
    for app in apps {
        let entry = app
            .management_plugin()
            .and_then(|name| loader.registry().find_plugin(&name))
            .filter(|entry| entry.is_enabled() && entry.has(cap))
            .ok_or_else(|| {
                PluginError::NotSupported(format!(
                    "no plugin can {} {}",
                    cap.action(),
                    app.describe()
                ))
            })?;
        match groups.iter_mut().find(|(e, _)| Arc::ptr_eq(e, &entry)) {
            Some((_, list)) => {
                list.add(app.clone());
            }
            None => groups.push((entry, AppList::from_app(app.clone()))),
        }
    }
    Ok(groups)
}

async fn dispatch(
    loader: &PluginLoader,
    ctx: &PluginContext,
    apps: &AppList,
    cap: Capability,
) -> PluginResult<()> {
    let groups = group_by_plugin(loader, apps, cap)?;
    ctx.check_cancelled()?;

    let calls = groups.iter().map(|(entry, list)| async move {
        tracing::debug!(plugin = %entry.name(), count = list.len(), action = %cap.action(), "dispatching apps");
        let result = match cap {
            Capability::UninstallApps => entry.plugin().uninstall_apps(list, ctx).await,
            _ => entry.plugin().install_apps(list, ctx).await,
        };
        (entry, list, result)
    });

    let mut errors = ErrorFold::new();
    for (entry, list, result) in join_all(calls).await {
        let Err(e) = result else { continue };
        if !e.is_cancelled() {
            let mut flags = EventFlags::VISIBLE | EventFlags::WARNING;
            if ctx.is_interactive() {
                flags.insert(EventFlags::INTERACTIVE);
            }
            for app in list {
                ctx.emit(
                    PluginEvent::builder()
                        .with_plugin(entry.name())
                        .with_app(app.clone())
                        .with_action(cap.action())
                        .with_error(e.clone())
                        .with_flags(flags)
                        .build(),
                );
            }
        }
        errors.add(e);
    }
    errors.into_result()
}

macro_rules! manage_job {
    ($(#[$meta:meta])* $name:ident, $cap:expr, $label:literal) => {
        $(#[$meta])*
        pub struct $name {
            state: JobState,
            apps: AppList,
            interactive: bool,
            result: Mutex<Option<AppList>>,
        }

        impl $name {
            pub fn new(apps: &AppList) -> Self {
                Self {
                    state: JobState::new(),
                    apps: apps.copy(),
                    interactive: false,
                    result: Mutex::new(None),
                }
            }

            pub fn with_interactive(mut self, interactive: bool) -> Self {
                self.interactive = interactive;
                self
            }

            /// The processed apps, once the job succeeded
            pub fn result_list(&self) -> Option<AppList> {
                self.result.lock().clone()
            }
        }

        #[async_trait]
        impl PluginJob for $name {
            fn state(&self) -> &JobState {
                &self.state
            }

            fn name(&self) -> &'static str {
                $label
            }

            fn is_interactive(&self) -> bool {
                self.interactive
            }

            async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
                dispatch(loader, ctx, &self.apps, $cap).await?;
                *self.result.lock() = Some(self.apps.copy());
                Ok(())
            }
        }
    };
}

manage_job!(
    /// Install apps through their management plugins
    InstallAppsJob,
    Capability::InstallApps,
    "install-apps"
);

manage_job!(
    /// Remove apps through their management plugins
    UninstallAppsJob,
    Capability::UninstallApps,
    "uninstall-apps"
);
