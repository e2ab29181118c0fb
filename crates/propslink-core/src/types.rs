// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the propslink print agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a configured server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Externally visible status of one server connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    /// Waiting for an operator on the server to approve this client.
    Pairing,
    /// Token sent, waiting for `auth_result`.
    Authenticating,
    Connected,
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Pairing => "pairing",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status change reported by a connection's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub connection_id: ConnectionId,
    pub status: ConnectionStatus,
    /// Set when the status is `Connected`.
    pub timestamp: Option<DateTime<Utc>>,
    /// Most recent error text, if the transition was caused by a failure.
    pub error: Option<String>,
    pub retry_count: u32,
}

/// Last-known state of a connection, as assembled from its status events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRuntimeState {
    pub connection_id: ConnectionId,
    pub status: ConnectionStatus,
    pub last_connected: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub retry_count: u32,
}

impl ConnectionRuntimeState {
    pub fn new(connection_id: ConnectionId) -> Self {
        Self {
            connection_id,
            status: ConnectionStatus::Disconnected,
            last_connected: None,
            last_error: None,
            retry_count: 0,
        }
    }

    /// Fold a status event into this state.
    pub fn apply(&mut self, event: &StatusEvent) {
        self.status = event.status;
        self.retry_count = event.retry_count;
        if event.status == ConnectionStatus::Connected {
            self.last_connected = event.timestamp.or(self.last_connected);
            self.last_error = None;
        }
        if event.error.is_some() {
            self.last_error = event.error.clone();
        }
    }
}

/// A printer as advertised to the server during authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterInfo {
    pub id: String,
    pub name: String,
    pub status: String,
    /// Names of label templates this printer can render.
    pub templates: Vec<String>,
}

/// One label print request pushed by a server.
///
/// Lives only for the duration of a single dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    pub job_id: String,
    pub printer_id: String,
    pub barcode: String,
    pub asset_name: String,
    pub category_name: String,
    pub quantity: u32,
    pub department_name: Option<String>,
    pub site_short_name: Option<String>,
    /// Overrides the QR payload, which otherwise defaults to the barcode.
    pub qr_content: Option<String>,
    pub location_name: Option<String>,
    pub location_description: Option<String>,
    pub location_categories: Option<String>,
    pub location_departments: Option<String>,
}

impl JobRequest {
    /// A request carrying only the mandatory fields, quantity 1.
    pub fn new(
        job_id: impl Into<String>,
        printer_id: impl Into<String>,
        barcode: impl Into<String>,
        asset_name: impl Into<String>,
        category_name: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            printer_id: printer_id.into(),
            barcode: barcode.into(),
            asset_name: asset_name.into(),
            category_name: category_name.into(),
            quantity: 1,
            department_name: None,
            site_short_name: None,
            qr_content: None,
            location_name: None,
            location_description: None,
            location_categories: None,
            location_departments: None,
        }
    }

    /// Content to encode in the label's QR code.
    pub fn qr_payload(&self) -> &str {
        self.qr_content
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.barcode)
    }
}

/// Terminal status of a dispatched job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Result of one dispatch, as reported back to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn completed(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Completed,
            error: None,
        }
    }

    /// A failed outcome.  The error text is never empty.
    pub fn failed(job_id: impl Into<String>, error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            "print job failed".to_string()
        } else {
            error
        };
        Self {
            job_id: job_id.into(),
            status: JobStatus::Failed,
            error: Some(error),
        }
    }
}

/// A finished job, as kept in the agent's job history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub connection_id: ConnectionId,
    pub job_id: String,
    pub status: JobStatus,
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(connection_id: ConnectionId, outcome: &JobOutcome, finished_at: DateTime<Utc>) -> Self {
        Self {
            connection_id,
            job_id: outcome.job_id.clone(),
            status: outcome.status,
            error: outcome.error.clone(),
            finished_at,
        }
    }
}
