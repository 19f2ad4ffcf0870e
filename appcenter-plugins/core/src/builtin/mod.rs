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

//! Built-in plugins
//!
//! - [`CatalogPlugin`]: serves apps from a TOML catalog
//! - [`DummyPlugin`]: a test backend managing the fixture apps
//! - [`ProvenancePlugin`]: flags apps from trusted origins

mod catalog;
mod dummy;
mod provenance;

pub use catalog::{Catalog, CatalogEntry, CatalogPlugin};
pub use dummy::DummyPlugin;
pub use provenance::ProvenancePlugin;

use crate::loader::PluginLoader;
use appcenter_core::PluginResult;
use std::sync::Arc;

/// Catalog used when no catalog file is configured
pub const FIXTURE_CATALOG: &str = r#"
[[app]]
id = "zeus.desktop"
kind = "desktop-app"
state = "installed"
origin = "os"
name = "Zeus"
summary = "A teaching application"
description = "Zeus plays music and checks your spelling."
license = "GPL-2.0+"
version = "1.2.3"
developer = "Olympus"
homepage = "https://zeus.example.org/about"
icon = "zeus"
sources = ["zeus"]
categories = ["Player", "AudioVideo"]
keywords = ["zeus", "music"]
menu_path = ["Audio & Video", "Music Players"]
size_installed = 1048576
priority = 10

[[app]]
id = "zeus-spell.addon"
kind = "addon"
state = "available"
origin = "os"
name = "Spell Check"
summary = "Spell checking for Zeus"
license = "GPL-2.0+"
sources = ["zeus-spell"]
keywords = ["spell"]
extends = "zeus.desktop"

[[app]]
id = "chiron.desktop"
kind = "desktop-app"
state = "available"
origin = "thirdparty"
name = "Chiron"
summary = "A teaching application from a third party"
license = "LicenseRef-proprietary"
developer = "Centaurs"
icon = "chiron"
sources = ["chiron"]
categories = ["Education"]
keywords = ["teaching"]
alternate_of = "zeus.desktop"
featured = true

[[app]]
id = "os-repo"
kind = "repository"
state = "installed"
origin = "os"
name = "Operating System"
summary = "Apps shipped with the operating system"
homepage = "https://os.example.org"
"#;

pub fn fixture_catalog() -> PluginResult<Catalog> {
    Catalog::from_toml(FIXTURE_CATALOG)
}

/// Register the built-in plugins with a loader.
///
/// The catalog is read from `catalog_path` when configured, otherwise the
/// fixture catalog is used.
pub fn register_builtin(loader: &PluginLoader) -> PluginResult<()> {
    let catalog = match &loader.config().catalog_path {
        Some(path) => Catalog::from_file(path)?,
        None => fixture_catalog()?,
    };
    let cache = loader.cache().clone();
    loader.register(Arc::new(CatalogPlugin::new(catalog, cache.clone())))?;
    loader.register(Arc::new(DummyPlugin::new(cache)))?;
    loader.register(Arc::new(ProvenancePlugin::new(
        loader.config().provenance_origins.clone(),
    )))?;
    Ok(())
}
