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

//! Jobs
//!
//! A job wraps one high-level operation. It is run exactly once, through
//! [`PluginLoader::job_process`](crate::loader::PluginLoader::job_process)
//! or [`PluginJob::run`], and signals completion exactly once whether it
//! succeeded or failed. Results are only stored on success.

mod launch;
mod list_apps;
mod list_categories;
mod lookup;
mod manage;
mod refine;
mod refresh_metadata;

pub use launch::LaunchJob;
pub use list_apps::ListAppsJob;
pub use list_categories::ListCategoriesJob;
pub use lookup::{FileToAppJob, UrlToAppJob};
pub use manage::{InstallAppsJob, UninstallAppsJob};
pub use refine::RefineJob;
pub use refresh_metadata::RefreshMetadataJob;

use crate::events;
use crate::loader::PluginLoader;
use crate::plugin::PluginContext;
use appcenter_core::{PluginError, PluginEvent, PluginResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Bookkeeping shared by every job
#[derive(Debug)]
pub struct JobState {
    id: Uuid,
    started: AtomicBool,
    completed: watch::Sender<bool>,
    events: Mutex<Vec<PluginEvent>>,
    error: Mutex<Option<PluginError>>,
    timeout: Option<Duration>,
}

impl JobState {
    pub fn new() -> Self {
        let (completed, _) = watch::channel(false);
        Self {
            id: Uuid::new_v4(),
            started: AtomicBool::new(false),
            completed,
            events: Mutex::new(Vec::new()),
            error: Mutex::new(None),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn begin(&self) -> PluginResult<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(PluginError::Failed(format!("job {} already run", self.id)));
        }
        Ok(())
    }

    fn finish(&self, events: Vec<PluginEvent>, result: &PluginResult<()>) {
        self.events.lock().extend(events);
        if let Err(e) = result {
            *self.error.lock() = Some(e.clone());
        }
        self.completed.send_replace(true);
    }

    /// Complete a job that never got to run.
    ///
    /// Returns the error to report, or the run-once failure if the job
    /// had already started.
    pub(crate) fn abandon(&self, error: PluginError) -> PluginError {
        if let Err(e) = self.begin() {
            return e;
        }
        tracing::debug!(job = %self.id, error = %error, "job abandoned before running");
        self.finish(Vec::new(), &Err(error.clone()));
        error
    }

    pub fn is_completed(&self) -> bool {
        *self.completed.borrow()
    }

    /// Wait until the job has completed
    pub async fn completed(&self) {
        let mut rx = self.completed.subscribe();
        // The sender lives in self, so this only returns once set
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn events(&self) -> Vec<PluginEvent> {
        self.events.lock().clone()
    }

    /// The terminal error, if the job failed
    pub fn error(&self) -> Option<PluginError> {
        self.error.lock().clone()
    }
}

impl Default for JobState {
    fn default() -> Self {
        Self::new()
    }
}

/// A unit of work processed by the loader
#[async_trait]
pub trait PluginJob: Send + Sync {
    fn state(&self) -> &JobState;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Interactive jobs skip the background queue
    fn is_interactive(&self) -> bool {
        false
    }

    /// The operation itself
    async fn execute(&self, loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()>;

    /// Run the job once, with the job's timeout or the loader default.
    ///
    /// A timeout cancels `cancellable` and fails with `TimedOut`.
    async fn run(&self, loader: &PluginLoader, cancellable: CancellationToken) -> PluginResult<()> {
        let state = self.state();
        state.begin()?;

        let (sink, mut stream) = events::channel();
        let ctx = PluginContext::new(cancellable.clone(), sink)
            .with_interactive(self.is_interactive());
        let started = Instant::now();
        tracing::debug!(job = %state.id(), kind = self.name(), "running job");

        let timeout = state.timeout().or_else(|| loader.config().job_timeout());
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.execute(loader, &ctx)).await {
                Ok(result) => result,
                Err(_) => {
                    cancellable.cancel();
                    Err(PluginError::TimedOut(format!(
                        "{} did not complete within {} ms",
                        self.name(),
                        limit.as_millis()
                    )))
                }
            },
            None => self.execute(loader, &ctx).await,
        };
        drop(ctx);

        state.finish(stream.drain(), &result);
        match &result {
            Ok(()) => tracing::debug!(
                job = %state.id(),
                kind = self.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "job finished"
            ),
            Err(e) => tracing::debug!(
                job = %state.id(),
                kind = self.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %e,
                "job failed"
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appcenter_core::LoaderConfig;

    struct Sleepy {
        state: JobState,
        sleep: Duration,
    }

    #[async_trait]
    impl PluginJob for Sleepy {
        fn state(&self) -> &JobState {
            &self.state
        }

        fn name(&self) -> &'static str {
            "sleepy"
        }

        async fn execute(&self, _loader: &PluginLoader, ctx: &PluginContext) -> PluginResult<()> {
            ctx.emit(PluginEvent::builder().with_plugin("sleepy").build());
            tokio::select! {
                _ = tokio::time::sleep(self.sleep) => Ok(()),
                _ = ctx.cancellable().cancelled() => Err(PluginError::cancelled()),
            }
        }
    }

    #[tokio::test]
    async fn test_run_once_and_signal() {
        let loader = PluginLoader::default();
        let job = Sleepy {
            state: JobState::new(),
            sleep: Duration::from_millis(1),
        };

        job.run(&loader, CancellationToken::new()).await.unwrap();
        assert!(job.state().is_completed());
        job.state().completed().await;
        assert_eq!(job.state().events().len(), 1);

        let err = job.run(&loader, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, PluginError::Failed(_)));
    }

    #[tokio::test]
    async fn test_timeout_cancels() {
        let loader = PluginLoader::new(LoaderConfig {
            job_timeout_ms: Some(20),
            ..Default::default()
        });
        let job = Sleepy {
            state: JobState::new(),
            sleep: Duration::from_secs(30),
        };
        let token = CancellationToken::new();

        let err = job.run(&loader, token.clone()).await.unwrap_err();
        assert!(matches!(err, PluginError::TimedOut(_)));
        assert!(token.is_cancelled());
        assert!(job.state().is_completed());
        assert!(matches!(job.state().error(), Some(PluginError::TimedOut(_))));
    }

    #[tokio::test]
    async fn test_job_timeout_overrides_loader() {
        let loader = PluginLoader::default();
        let job = Sleepy {
            state: JobState::new().with_timeout(Duration::from_millis(10)),
            sleep: Duration::from_secs(30),
        };
        assert!(job.run(&loader, CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_job_process_collects_events() {
        let loader = PluginLoader::new(LoaderConfig {
            max_background_jobs: 1,
            ..Default::default()
        });
        let job = Sleepy {
            state: JobState::new(),
            sleep: Duration::from_millis(1),
        };
        loader.job_process(&job, CancellationToken::new()).await.unwrap();
        assert_eq!(loader.events().len(), 1);
    }
}
