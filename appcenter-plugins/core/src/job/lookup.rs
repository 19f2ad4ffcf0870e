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

//! Turning local files and URLs into apps
//!
//! Plugins are asked in scheduling order and the first non-empty answer
//! wins. The result is refined before it is stored.

use super::{JobState, PluginJob};
use crate::capabilities::Capability;
use crate::loader::PluginLoader;
use crate::plugin::PluginContext;
use crate::registry::PluginEntry;
use appcenter_core::{AppList, PluginError, PluginResult, RefineFlags, RefineJobFlags};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

async fn first_match<'a, F>(
    loader: &'a PluginLoader,
    ctx: &'a PluginContext,
    cap: Capability,
    what: &str,
    call: F,
) -> PluginResult<AppList>
where
    F: Fn(Arc<PluginEntry>) -> BoxFuture<'a, PluginResult<AppList>>,
{
    for entry in loader.registry().plugins_with(cap) {
        ctx.check_cancelled()?;
        let name = entry.name().to_string();
        match call(entry).await {
            Ok(list) if !list.is_empty() => {
                tracing::debug!(plugin = %name, count = list.len(), input = what, "converted to apps");
                return Ok(list);
            }
            Ok(_) => {}
            Err(e) if e.is_cancelled() => return Err(e),
            Err(PluginError::NotSupported(_)) => {}
            Err(e) => tracing::debug!(plugin = %name, error = %e, input = what, "conversion failed"),
        }
    }
    Err(PluginError::NotSupported(format!("no plugin could handle {}", what)))
}

async fn refine_result(
    loader: &PluginLoader,
    ctx: &PluginContext,
    list: AppList,
    flags: RefineFlags,
) -> PluginResult<AppList> {
    loader
        .refiner()
        .run(&list, RefineJobFlags::DISABLE_FILTERING, flags.with_implied(), ctx)
        .await
}

/// Convert a local file into apps
pub struct FileToAppJob {
    state: JobState,
    path: PathBuf,
    refine_flags: RefineFlags,
    result: Mutex<Option<AppList>>,
}

impl FileToAppJob {
    pub fn new(path: impl Into<PathBuf>, refine_flags: RefineFlags) -> Self {
        Self {
            state: JobState::new(),
            path: path.into(),
            refine_flags,
            result: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn result_list(&self) -> Option<AppList> {
        self.result.lock().clone()
    }
}

#[async_trait]
impl PluginJob for FileToAppJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "file-to-app"
    }

    fn is_interactive(&self) -> bool {
        true
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        let what = self.path.display().to_string();
        let found = first_match(loader, ctx, Capability::FileToApp, &what, |entry| {
            let path = self.path.clone();
            async move { entry.plugin().file_to_app(&path, ctx).await }.boxed()
        })
        .await?;
        let refined = refine_result(loader, ctx, found, self.refine_flags).await?;
        *self.result.lock() = Some(refined);
        Ok(())
    }
}

/// Convert a URL such as `appstream://zeus.desktop` into apps
pub struct UrlToAppJob {
    state: JobState,
    url: String,
    refine_flags: RefineFlags,
    result: Mutex<Option<AppList>>,
}

impl UrlToAppJob {
    pub fn new(url: impl Into<String>, refine_flags: RefineFlags) -> Self {
        Self {
            state: JobState::new(),
            url: url.into(),
            refine_flags,
            result: Mutex::new(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn result_list(&self) -> Option<AppList> {
        self.result.lock().clone()
    }
}

#[async_trait]
impl PluginJob for UrlToAppJob {
    fn state(&self) -> &JobState {
        &self.state
    }

    fn name(&self) -> &'static str {
        "url-to-app"
    }

    fn is_interactive(&self) -> bool {
        true
    }

    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
        let found = first_match(loader, ctx, Capability::UrlToApp, &self.url, |entry| {
            let url = self.url.clone();
            async move { entry.plugin().url_to_app(&url, ctx).await }.boxed()
        })
        .await?;
        let refined = refine_result(loader, ctx, found, self.refine_flags).await?;
        *self.result.lock() = Some(refined);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::plugin::Plugin;
    use appcenter_core::App;
    use tokio_util::sync::CancellationToken;

    struct Scheme {
        name: &'static str,
        scheme: &'static str,
    }

    #[async_trait]
    impl Plugin for Scheme {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new().with(Capability::UrlToApp)
        }

        async fn url_to_app(&self, url: &str, _ctx: &PluginContext) -> PluginResult<AppList> {
            match url.strip_prefix(self.scheme) {
                Some(id) => Ok(AppList::from_app(App::new(id))),
                None => Err(PluginError::not_supported("scheme")),
            }
        }
    }

    async fn loader() -> PluginLoader {
        let loader = PluginLoader::default();
        loader
            .register(Arc::new(Scheme {
                name: "appstream",
                scheme: "appstream://",
            }))
            .unwrap();
        loader
            .register(Arc::new(Scheme {
                name: "snap",
                scheme: "snap://",
            }))
            .unwrap();
        loader.setup().await.unwrap();
        loader
    }

    #[tokio::test]
    async fn test_url_to_app() {
        let loader = loader().await;
        let job = UrlToAppJob::new("snap://zeus", RefineFlags::ICON);
        loader.job_process(&job, CancellationToken::new()).await.unwrap();

        let list = job.result_list().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.index(0).unwrap().id().as_deref(), Some("zeus"));
    }

    #[tokio::test]
    async fn test_unhandled_url() {
        let loader = loader().await;
        let job = UrlToAppJob::new("https://example.com", RefineFlags::empty());
        let err = loader
            .job_process(&job, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PluginError::NotSupported(_)));

        let job = FileToAppJob::new("/tmp/zeus.rpm", RefineFlags::empty());
        assert!(loader
            .job_process(&job, CancellationToken::new())
            .await
            .is_err());
    }
}
