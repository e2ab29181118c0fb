// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON-file configuration store.
//
// Holds the agent configuration in memory and writes it back as pretty JSON
// whenever a session rotates a token, changes status or finishes a job.  It
// serves the session engine as connection source, status sink, token sink,
// job sink and printer roster.
//
// Sinks cannot fail towards the session, so a failed write is logged and the
// in-memory copy stays authoritative until the next successful write.  Sinks
// are called from session tasks; on a multi-threaded runtime the write runs
// under `block_in_place` so other tasks move to another worker.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, error, info};

use propslink_core::config::{AgentConfig, ConnectionConfig};
use propslink_core::error::Result;
use propslink_core::types::{
    ConnectionId, ConnectionRuntimeState, JobOutcome, JobRecord, PrinterInfo, StatusEvent,
};
use propslink_session::traits::{ConnectionSource, JobSink, PrinterRoster, StatusSink, TokenSink};

/// Number of finished jobs kept in the configuration file.
pub const RECENT_JOBS_LIMIT: usize = 50;

pub struct ConfigStore {
    path: PathBuf,
    config: Mutex<AgentConfig>,
}

impl ConfigStore {
    /// Load the configuration at `path`, writing defaults if the file does
    /// not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = match std::fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no configuration found, writing defaults");
                let config = AgentConfig::default();
                persist_config(&path, &config)?;
                config
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            connections = config.connections.len(),
            printers = config.printers.len(),
            "configuration loaded"
        );
        Ok(Self {
            path,
            config: Mutex::new(config),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> AgentConfig {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, AgentConfig> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` and write the result back to disk.
    fn update(&self, change: impl FnOnce(&mut AgentConfig)) -> Result<()> {
        let mut config = self.lock();
        change(&mut config);
        off_worker(|| persist_config(&self.path, &config))
    }
}

/// Run blocking file I/O without stalling the tasks queued on this worker.
fn off_worker<T>(io: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(io)
        }
        _ => io(),
    }
}

impl ConnectionSource for ConfigStore {
    fn list_active_connections(&self) -> Result<Vec<ConnectionConfig>> {
        let config = self.lock();
        Ok(config
            .connections
            .iter()
            .filter(|c| c.is_active)
            .map(|c| ConnectionConfig {
                client_name: config.client_name_for(c),
                ..c.clone()
            })
            .collect())
    }
}

impl TokenSink for ConfigStore {
    fn on_token_rotated(&self, connection_id: ConnectionId, token: &str) {
        let result = self.update(|config| {
            if let Some(connection) = config.connection_mut(connection_id) {
                connection.pairing_token = Some(token.to_string());
            }
        });
        match result {
            Ok(()) => info!(connection_id = %connection_id, "pairing token saved"),
            Err(e) => error!(connection_id = %connection_id, error = %e, "failed to save pairing token"),
        }
    }
}

impl StatusSink for ConfigStore {
    fn on_status_change(&self, event: &StatusEvent) {
        let result = self.update(|config| {
            match config
                .runtime
                .iter_mut()
                .find(|r| r.connection_id == event.connection_id)
            {
                Some(state) => state.apply(event),
                None => {
                    let mut state = ConnectionRuntimeState::new(event.connection_id);
                    state.apply(event);
                    config.runtime.push(state);
                }
            }
        });
        match result {
            Ok(()) => debug!(connection_id = %event.connection_id, status = %event.status, "status saved"),
            Err(e) => error!(connection_id = %event.connection_id, error = %e, "failed to save status"),
        }
    }
}

impl JobSink for ConfigStore {
    fn on_job_outcome(&self, connection_id: ConnectionId, outcome: &JobOutcome) {
        let result = self.update(|config| {
            config
                .recent_jobs
                .push(JobRecord::new(connection_id, outcome, Utc::now()));
            let excess = config.recent_jobs.len().saturating_sub(RECENT_JOBS_LIMIT);
            config.recent_jobs.drain(..excess);
        });
        if let Err(e) = result {
            error!(connection_id = %connection_id, job_id = %outcome.job_id, error = %e, "failed to save job outcome");
        }
    }
}

impl PrinterRoster for ConfigStore {
    fn current_printers(&self) -> Vec<PrinterInfo> {
        let config = self.lock();
        config
            .printers
            .iter()
            .map(|p| {
                let mut info = p.info();
                if info.templates.is_empty() {
                    info.templates.extend(config.default_template.iter().cloned());
                }
                info
            })
            .collect()
    }
}

fn persist_config(path: &Path, config: &AgentConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    // Never leave a half-written file in place.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
