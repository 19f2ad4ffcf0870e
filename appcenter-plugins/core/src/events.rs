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

//! Event plumbing between plugins and jobs
//!
//! Every job owns one channel. The sending half travels through every
//! plugin call (including recursive refines); the job drains the receiving
//! half when it finishes.

use appcenter_core::PluginEvent;
use tokio::sync::mpsc;

/// Create a connected sink and stream
pub fn channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventStream { rx })
}

/// Sending half, cheap to clone
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<PluginEvent>,
}

impl EventSink {
    /// A sink whose events go nowhere
    pub fn discard() -> Self {
        channel().0
    }

    pub fn emit(&self, event: PluginEvent) {
        tracing::debug!(event_id = %event.unique_id(), "Plugin event: {}", event);
        if self.tx.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }
}

/// Receiving half, owned by the job
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<PluginEvent>,
}

impl EventStream {
    /// Take every event sent so far
    pub fn drain(&mut self) -> Vec<PluginEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}
