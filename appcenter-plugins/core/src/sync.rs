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

//! Blocking wrappers for callers without a runtime
//!
//! Each call builds a private single-threaded runtime, drives the future to
//! completion and tears the runtime down again. Calling these from inside a
//! running tokio runtime panics.

use crate::job::PluginJob;
use crate::loader::PluginLoader;
use appcenter_core::{PluginError, PluginResult};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Drive a future to completion on a fresh current-thread runtime
pub fn block_on<F, T>(future: F) -> PluginResult<T>
where
    F: Future<Output = PluginResult<T>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PluginError::Failed(format!("failed to create runtime: {}", e)))?;
    runtime.block_on(future)
}

/// Blocking [`PluginLoader::setup`]
pub fn setup_sync(loader: &PluginLoader) -> PluginResult<()> {
    block_on(loader.setup())
}

/// Blocking [`PluginLoader::job_process`]
pub fn job_process_sync(
    loader: &PluginLoader,
    job: &dyn PluginJob,
    cancellable: CancellationToken,
) -> PluginResult<()> {
    block_on(loader.job_process(job, cancellable))
}
