// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Supervisor: one connection manager per active configuration, all running
// concurrently on their own tasks.
//
// Sessions share nothing.  The supervisor's view of them is a status board
// folded from the same status events every session emits, which it forwards
// unchanged to the external status sink.
//
// The configuration set is read at the start of each `run`.  Adding, removing
// or deactivating a connection takes effect on the next run.
//
// Sessions are owned by the `run` future: dropping it aborts every session.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use propslink_core::config::ConnectionConfig;
use propslink_core::error::Result;
use propslink_core::types::{ConnectionId, ConnectionRuntimeState, ConnectionStatus, StatusEvent};

use crate::backoff::BackoffPolicy;
use crate::manager::{Collaborators, ConnectionManager};
use crate::traits::{ConnectionSource, StatusSink};

/// A configured connection and its last-known runtime state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub id: ConnectionId,
    pub name: String,
    pub server_url: String,
    pub runtime: ConnectionRuntimeState,
}

/// Last-known state per connection, kept current from status events.
pub struct StatusBoard {
    inner: Arc<dyn StatusSink>,
    entries: Mutex<BTreeMap<ConnectionId, ConnectionSummary>>,
}

impl StatusBoard {
    pub fn new(inner: Arc<dyn StatusSink>) -> Self {
        Self {
            inner,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    fn register(&self, config: &ConnectionConfig) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                config.id,
                ConnectionSummary {
                    id: config.id,
                    name: config.name.clone(),
                    server_url: config.ws_url(),
                    runtime: ConnectionRuntimeState::new(config.id),
                },
            );
        }
    }

    /// All registered connections, ordered by id.
    pub fn snapshot(&self) -> Vec<ConnectionSummary> {
        self.entries
            .lock()
            .map(|e| e.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: ConnectionId) -> Option<ConnectionSummary> {
        self.entries.lock().ok().and_then(|e| e.get(&id).cloned())
    }
}

impl StatusSink for StatusBoard {
    fn on_status_change(&self, event: &StatusEvent) {
        if let Ok(mut entries) = self.entries.lock() {
            if let Some(entry) = entries.get_mut(&event.connection_id) {
                entry.runtime.apply(event);
            }
        }
        self.inner.on_status_change(event);
    }
}

/// Runs every active connection concurrently.
pub struct Supervisor {
    source: Arc<dyn ConnectionSource>,
    collaborators: Collaborators,
    board: Arc<StatusBoard>,
    backoff: BackoffPolicy,
    cancel: CancellationToken,
}

impl Supervisor {
    /// `collaborators.status` is wrapped so the supervisor can track status;
    /// it still receives every event.
    pub fn new(
        source: Arc<dyn ConnectionSource>,
        mut collaborators: Collaborators,
        backoff: BackoffPolicy,
        cancel: CancellationToken,
    ) -> Self {
        let board = Arc::new(StatusBoard::new(Arc::clone(&collaborators.status)));
        collaborators.status = board.clone();
        Self {
            source,
            collaborators,
            board,
            backoff,
            cancel,
        }
    }

    /// Configured connections and their last-known status.
    pub fn connections(&self) -> Vec<ConnectionSummary> {
        self.board.snapshot()
    }

    /// Stop every session.  Pending backoff waits return at once.
    pub fn stop(&self) {
        info!("stopping all connections");
        self.cancel.cancel();
    }

    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start one manager per active configuration and wait for all of them.
    ///
    /// Managers only return when stopped, so in practice this runs until
    /// [`Supervisor::stop`] is called.  Each call starts from a fresh status
    /// board; after `stop` the sessions of a later call end at once.
    #[instrument(skip_all)]
    pub async fn run(&self) -> Result<()> {
        let configs = self.source.list_active_connections()?;
        self.board.clear();
        let mut sessions = JoinSet::new();
        let mut owners = HashMap::new();

        for config in configs.into_iter().filter(|c| c.is_active) {
            if self.board.get(config.id).is_some() {
                warn!(connection_id = %config.id, "duplicate connection id, skipping");
                continue;
            }
            self.board.register(&config);

            let mut manager = ConnectionManager::new(
                &config,
                self.collaborators.clone(),
                self.backoff,
                self.cancel.child_token(),
            );
            let id = manager.id();
            info!(connection_id = %id, server = %config.ws_url(), "starting connection");

            let handle = sessions.spawn(async move { manager.run().await });
            owners.insert(handle.id(), id);
        }

        if sessions.is_empty() {
            warn!("no active connections configured");
            return Ok(());
        }
        info!(count = sessions.len(), "supervising connections");

        while let Some(joined) = sessions.join_next_with_id().await {
            match joined {
                Ok((task, ())) => {
                    if let Some(id) = owners.get(&task) {
                        info!(connection_id = %id, "connection stopped");
                    }
                }
                Err(e) => {
                    let Some(&id) = owners.get(&e.id()) else {
                        error!(error = %e, "unknown session task failed");
                        continue;
                    };
                    error!(connection_id = %id, error = %e, "connection task crashed");
                    self.board.on_status_change(&StatusEvent {
                        connection_id: id,
                        status: ConnectionStatus::Error,
                        timestamp: None,
                        error: Some(format!("session task crashed: {e}")),
                        retry_count: 0,
                    });
                }
            }
        }

        info!("all connections stopped");
        Ok(())
    }
}
