// Copyright (c) 2026 Skyglow
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//     http://www.apache.org/licenses/LICENSE-2.0
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Notifications for external indexers.

use crate::core::types::{ObservationId, RequestId, H256};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Ledger notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    /// New observation stored.
    ObservationSubmitted {
        /// Observation.
        id: ObservationId,
        /// Submission time, ms since UNIX epoch.
        time_ms: u64,
    },
    /// Reveal dispatched to the oracle.
    DecryptionRequested {
        /// Observation.
        id: ObservationId,
        /// Correlation token.
        request_id: RequestId,
    },
    /// Reveal written back.
    ObservationDecrypted {
        /// Observation.
        id: ObservationId,
    },
    /// A region sum changed.
    RegionUpdated {
        /// SHA-256 of the region code.
        region_hash: H256,
    },
    /// A pending reveal outlived its TTL and was dropped.
    RevealExpired {
        /// Observation.
        id: ObservationId,
        /// Correlation token that is no longer accepted.
        request_id: RequestId,
    },
}

/// Notification hook.
pub trait EventSink: Send + Sync {
    /// Called after a transaction has fully applied.
    fn emit(&self, event: LedgerEvent);
}

/// Drops every notification.
#[derive(Clone, Debug, Default)]
pub struct NoopEvents;

impl EventSink for NoopEvents {
    fn emit(&self, _event: LedgerEvent) {}
}

/// Forwards notifications to a tokio channel. Once the receiver is gone,
/// notifications are dropped with a debug log.
#[derive(Clone, Debug)]
pub struct ChannelEvents(pub mpsc::UnboundedSender<LedgerEvent>);

impl EventSink for ChannelEvents {
    fn emit(&self, event: LedgerEvent) {
        if let Err(e) = self.0.send(event) {
            debug!(event = ?e.0, "event channel closed; notification dropped");
        }
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct RecordingEvents {
    events: Mutex<Vec<LedgerEvent>>,
}

impl RecordingEvents {
    /// Snapshot of what was emitted so far.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl EventSink for RecordingEvents {
    fn emit(&self, event: LedgerEvent) {
        if let Ok(mut g) = self.events.lock() {
            g.push(event);
        }
    }
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn emit(&self, event: LedgerEvent) {
        (**self).emit(event)
    }
}
