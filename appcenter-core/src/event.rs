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

//! Non-fatal plugin events.
//!
//! Plugins report warnings and recoverable errors as events. Events never
//! fail the operation that produced them.

use crate::app::AppRef;
use crate::error::PluginError;
use crate::flags::EventFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level operation an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginAction {
    Setup,
    Refine,
    ListApps,
    RefineCategories,
    RefreshMetadata,
    Install,
    Uninstall,
    Launch,
    FileToApp,
    UrlToApp,
}

impl PluginAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginAction::Setup => "setup",
            PluginAction::Refine => "refine",
            PluginAction::ListApps => "list-apps",
            PluginAction::RefineCategories => "refine-categories",
            PluginAction::RefreshMetadata => "refresh-metadata",
            PluginAction::Install => "install",
            PluginAction::Uninstall => "uninstall",
            PluginAction::Launch => "launch",
            PluginAction::FileToApp => "file-to-app",
            PluginAction::UrlToApp => "url-to-app",
        }
    }
}

impl fmt::Display for PluginAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A warning or recoverable error raised by a plugin
#[derive(Debug, Clone)]
pub struct PluginEvent {
    unique_id: String,
    plugin: Option<String>,
    app: Option<AppRef>,
    origin: Option<AppRef>,
    action: Option<PluginAction>,
    error: Option<PluginError>,
    flags: EventFlags,
}

impl PluginEvent {
    pub fn builder() -> PluginEventBuilder {
        PluginEventBuilder::default()
    }

    /// Identifier used to suppress repeats of the same event.
    ///
    /// Built from the error kind and the app (or origin) the event is
    /// about; events about nothing in particular get a random id.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn plugin(&self) -> Option<&str> {
        self.plugin.as_deref()
    }

    pub fn app(&self) -> Option<&AppRef> {
        self.app.as_ref()
    }

    pub fn origin(&self) -> Option<&AppRef> {
        self.origin.as_ref()
    }

    pub fn action(&self) -> Option<PluginAction> {
        self.action
    }

    pub fn error(&self) -> Option<&PluginError> {
        self.error.as_ref()
    }

    pub fn flags(&self) -> EventFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: EventFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn add_flag(&mut self, flag: EventFlags) {
        self.flags.insert(flag);
    }
}

impl fmt::Display for PluginEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(plugin) = &self.plugin {
            write!(f, "[{}] ", plugin)?;
        }
        if let Some(action) = self.action {
            write!(f, "{}: ", action)?;
        }
        if let Some(app) = &self.app {
            write!(f, "{}: ", app.describe())?;
        }
        match &self.error {
            Some(error) => write!(f, "{}", error),
            None => f.write_str("event"),
        }
    }
}

#[derive(Default)]
pub struct PluginEventBuilder {
    plugin: Option<String>,
    app: Option<AppRef>,
    origin: Option<AppRef>,
    action: Option<PluginAction>,
    error: Option<PluginError>,
    flags: EventFlags,
}

impl PluginEventBuilder {
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugin = Some(plugin.into());
        self
    }

    pub fn with_app(mut self, app: AppRef) -> Self {
        self.app = Some(app);
        self
    }

    pub fn with_origin(mut self, origin: AppRef) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_action(mut self, action: PluginAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_error(mut self, error: PluginError) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_flags(mut self, flags: EventFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn build(self) -> PluginEvent {
        let kind = self
            .error
            .as_ref()
            .map(|e| e.kind().as_str())
            .unwrap_or("event");
        let subject = self
            .app
            .as_ref()
            .and_then(|a| a.unique_id())
            .or_else(|| self.origin.as_ref().and_then(|o| o.unique_id()));
        let unique_id = match subject {
            Some(subject) => format!("{}:{}", kind, subject),
            None => format!("{}:{}", kind, uuid::Uuid::new_v4()),
        };

        PluginEvent {
            unique_id,
            plugin: self.plugin,
            app: self.app,
            origin: self.origin,
            action: self.action,
            error: self.error,
            flags: self.flags,
        }
    }
}
