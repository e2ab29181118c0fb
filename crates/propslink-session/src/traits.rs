// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator interfaces consumed by the session engine.
//
// The engine owns no storage, no renderer and no socket code of its own; each
// of those is injected through one of these traits.  Sinks are invoked
// synchronously from the owning session, in the order events happen.

use async_trait::async_trait;

use propslink_core::config::ConnectionConfig;
use propslink_core::error::{JobError, Result, TransportError};
use propslink_core::types::{ConnectionId, JobOutcome, JobRequest, PrinterInfo, StatusEvent};

/// Source of connection configurations.
pub trait ConnectionSource: Send + Sync {
    /// All configurations whose active flag is set.
    fn list_active_connections(&self) -> Result<Vec<ConnectionConfig>>;
}

/// Receives every connection status change.
pub trait StatusSink: Send + Sync {
    fn on_status_change(&self, event: &StatusEvent);
}

/// Receives every token rotation.  Called before the new token is used.
pub trait TokenSink: Send + Sync {
    fn on_token_rotated(&self, connection_id: ConnectionId, token: &str);
}

/// Receives the outcome of every dispatched job, once its status has been
/// sent to the server.
pub trait JobSink: Send + Sync {
    fn on_job_outcome(&self, connection_id: ConnectionId, outcome: &JobOutcome);
}

/// Snapshot of local printers, advertised at authentication time.
pub trait PrinterRoster: Send + Sync {
    fn current_printers(&self) -> Vec<PrinterInfo>;
}

/// The render/print pipeline.
#[async_trait]
pub trait JobPipeline: Send + Sync {
    /// Render the job and transmit it to its printer.
    async fn render_and_send(&self, job: &JobRequest) -> std::result::Result<(), JobError>;
}

/// A persistent, message-oriented connection carrying text frames.
#[async_trait]
pub trait Transport: Send {
    async fn send_text(&mut self, text: String) -> std::result::Result<(), TransportError>;

    /// Next inbound text frame.  `None` once the peer has closed.
    async fn next_text(&mut self) -> Option<std::result::Result<String, TransportError>>;

    /// Close the connection.  Errors are ignored; the session is over anyway.
    async fn close(&mut self);
}

/// Opens transports.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> std::result::Result<Box<dyn Transport>, TransportError>;
}
