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

//! Remote resource rewriting
//!
//! App CSS may reference remote images. Before presenting it, every remote
//! `url(...)` is pointed at a content-addressed file in the local cache.

use crate::plugin::PluginContext;
use appcenter_core::{App, AppList, PluginResult};
use async_trait::async_trait;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Metadata keys holding CSS snippets
pub const CSS_METADATA_KEYS: &[&str] = &["Appcenter::FeatureTile-css", "Appcenter::UpgradeBanner-css"];

/// Rewrites remote resource references embedded in apps
#[async_trait]
pub trait ResourceRewriter: Send + Sync {
    async fn rewrite(&self, list: &AppList, ctx: &PluginContext) -> PluginResult<()>;
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?(https?://[^'")\s]+)['"]?\s*\)"#).expect("Invalid regex pattern")
    })
}

/// Points remote CSS `url(...)` targets at the local resource cache.
///
/// Only the references are rewritten; fetching the files is left to
/// whoever populates the cache directory.
#[derive(Debug, Clone)]
pub struct CssResourceRewriter {
    cache_dir: PathBuf,
}

impl CssResourceRewriter {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Local path a remote URL is cached at
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let digest = blake3::hash(url.as_bytes());
        self.cache_dir.join(hex::encode(digest.as_bytes()))
    }

    /// Rewrite one CSS snippet, returning `None` if nothing changed
    pub fn rewrite_css(&self, css: &str) -> Option<String> {
        let re = url_regex();
        if !re.is_match(css) {
            return None;
        }
        let rewritten = re.replace_all(css, |caps: &Captures<'_>| {
            format!("url('file://{}')", self.cache_path(&caps[1]).display())
        });
        Some(rewritten.into_owned())
    }

    fn rewrite_app(&self, app: &App) {
        if let Some(new_css) = app.css().and_then(|css| self.rewrite_css(&css)) {
            app.set_css(new_css);
        }
        for key in CSS_METADATA_KEYS {
            if let Some(new_css) = app.metadata_item(key).and_then(|css| self.rewrite_css(&css)) {
                app.remove_metadata(key);
                app.set_metadata(key, new_css);
            }
        }
    }
}

#[async_trait]
impl ResourceRewriter for CssResourceRewriter {
    async fn rewrite(&self, list: &AppList, ctx: &PluginContext) -> PluginResult<()> {
        for app in list {
            ctx.check_cancelled()?;
            self.rewrite_app(app);
        }
        Ok(())
    }
}
