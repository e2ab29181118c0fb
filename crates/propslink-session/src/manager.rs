// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connection manager: owns one server session end to end.
//
// Connect, pair or authenticate, serve print jobs, and when the session ends
// for any reason wait out the backoff and start again.  Only a stop request
// ends the loop; server-initiated disconnects and failures always reconnect.
//
// The token, status and retry counter live here and nowhere else.  Other
// components learn about them only through the injected sinks, which are
// called inline so that, for example, a rotated token is handed to the token
// sink before the message that depends on it goes out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use propslink_core::config::{ConnectionConfig, DEFAULT_CLIENT_NAME};
use propslink_core::error::{AuthError, TransportError};
use propslink_core::types::{ConnectionId, ConnectionStatus, StatusEvent};

use crate::backoff::{self, BackoffPolicy};
use crate::codec::{self, ServerMessage};
use crate::dispatch::JobDispatcher;
use crate::machine::{SessionState, Trigger, transition};
use crate::traits::{Connector, JobPipeline, JobSink, PrinterRoster, StatusSink, TokenSink, Transport};

/// External collaborators a session needs.  Shared by every manager the
/// supervisor spawns.
#[derive(Clone)]
pub struct Collaborators {
    pub connector: Arc<dyn Connector>,
    pub roster: Arc<dyn PrinterRoster>,
    pub status: Arc<dyn StatusSink>,
    pub tokens: Arc<dyn TokenSink>,
    pub jobs: Arc<dyn JobSink>,
    pub pipeline: Arc<dyn JobPipeline>,
}

/// How a live session ended.
enum SessionEnd {
    /// The session failed; state is `Error`.
    Failed,
    /// Transport gone or server asked us to leave; state is `Disconnected`.
    Lost,
    /// Stop requested.
    Stopped,
}

/// Drives one server connection.
pub struct ConnectionManager {
    id: ConnectionId,
    url: String,
    client_name: String,
    token: Option<String>,
    state: SessionState,
    retry_count: u32,
    last_connected: Option<DateTime<Utc>>,
    last_error: Option<String>,
    collaborators: Collaborators,
    dispatcher: JobDispatcher,
    backoff: BackoffPolicy,
    cancel: CancellationToken,
}

impl ConnectionManager {
    pub fn new(
        config: &ConnectionConfig,
        collaborators: Collaborators,
        backoff: BackoffPolicy,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: config.id,
            url: config.ws_url(),
            client_name: if config.client_name.is_empty() {
                DEFAULT_CLIENT_NAME.to_string()
            } else {
                config.client_name.clone()
            },
            token: config.pairing_token.clone().filter(|t| !t.is_empty()),
            state: SessionState::Disconnected,
            retry_count: 0,
            last_connected: None,
            last_error: None,
            dispatcher: JobDispatcher::new(Arc::clone(&collaborators.pipeline)),
            collaborators,
            backoff,
            cancel,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Handle to stop this manager from another task.
    pub fn stop_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Connect, serve and reconnect until stopped.
    #[instrument(skip_all, fields(connection_id = %self.id))]
    pub async fn run(&mut self) {
        info!(url = %self.url, "connection manager started");

        while !self.cancel.is_cancelled() {
            self.apply(Trigger::Dial);
            let connected_before = self.last_connected;

            let end = self.attempt().await;
            if matches!(end, SessionEnd::Stopped) || self.cancel.is_cancelled() {
                break;
            }

            let delay = self.backoff.delay(self.retry_count);
            if self.last_connected == connected_before {
                self.retry_count = self.retry_count.saturating_add(1);
            }
            info!(
                delay_ms = delay.as_millis() as u64,
                retry_count = self.retry_count,
                state = %self.state.status(),
                "reconnecting after delay"
            );

            if !backoff::wait(delay, &self.cancel).await {
                break;
            }
            if matches!(end, SessionEnd::Failed) {
                self.apply(Trigger::BackoffElapsed);
            }
        }

        self.enter(SessionState::Disconnected);
        info!("connection manager stopped");
    }

    /// One connection attempt, from dial to the end of the session.
    async fn attempt(&mut self) -> SessionEnd {
        let connect = self.collaborators.connector.connect(&self.url);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SessionEnd::Stopped,
            result = connect => result,
        };

        let mut transport = match result {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.last_error = Some(e.to_string());
                self.apply(Trigger::TransportLost);
                return SessionEnd::Lost;
            }
        };

        let end = match self.serve(transport.as_mut()).await {
            Ok(end) => end,
            Err(e) => {
                warn!(error = %e, "connection lost");
                self.last_error = Some(e.to_string());
                self.apply(Trigger::TransportLost);
                SessionEnd::Lost
            }
        };
        transport.close().await;
        end
    }

    /// Run the handshake and message loop on an open transport.
    async fn serve(&mut self, transport: &mut dyn Transport) -> Result<SessionEnd, TransportError> {
        let opened = match self.token {
            Some(_) => Trigger::OpenedWithToken,
            None => Trigger::OpenedUnpaired,
        };
        match self.token.clone() {
            Some(token) => self.send_authenticate(transport, &token).await?,
            None => {
                transport
                    .send_text(codec::encode_pairing_request(&self.client_name))
                    .await?
            }
        }
        self.apply(opened);

        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("stop requested, closing session");
                    return Ok(SessionEnd::Stopped);
                }
                frame = transport.next_text() => frame,
            };

            let raw = match frame {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => return Err(e),
                None => return Err(TransportError::Closed),
            };

            if let Some(end) = self.handle_frame(&raw, transport).await? {
                return Ok(end);
            }
        }
    }

    /// Apply one inbound frame.  Returns `Some` when the session is over.
    async fn handle_frame(
        &mut self,
        raw: &str,
        transport: &mut dyn Transport,
    ) -> Result<Option<SessionEnd>, TransportError> {
        let message = match codec::decode(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, state = %self.state.status(), "protocol error");
                let Some(next) = transition(self.state, Trigger::DecodeFailed) else {
                    return Ok(None);
                };
                if next == SessionState::Error {
                    return Ok(Some(self.fail(e.to_string())));
                }
                return Ok(None);
            }
        };

        let Some(next) = transition(self.state, Trigger::from(&message)) else {
            warn!(
                kind = message.kind(),
                state = %self.state.status(),
                "ignoring message not valid in this state"
            );
            return Ok(None);
        };

        match message {
            ServerMessage::PairingPending { client_id, message } => {
                info!(client_id = %client_id, detail = %message, "pairing pending approval");
            }

            ServerMessage::PairingApproved { token, server_name } => {
                info!(server = %server_name, "paired successfully");
                self.rotate_token(token.clone());
                self.send_authenticate(transport, &token).await?;
                self.enter(next);
            }

            ServerMessage::PairingDenied => {
                error!("pairing denied");
                return Ok(Some(self.fail(AuthError::PairingDenied.to_string())));
            }

            ServerMessage::AuthResult { success: true, server_name, new_token, .. } => {
                info!(server = %server_name, rotated = new_token.is_some(), "authenticated");
                if let Some(token) = new_token {
                    self.rotate_token(token);
                }
                self.enter(next);
            }

            ServerMessage::AuthResult { success: false, message, .. } => {
                let reason = message.unwrap_or_else(|| "unknown error".into());
                error!(reason = %reason, "authentication failed");
                return Ok(Some(self.fail(AuthError::Rejected(reason).to_string())));
            }

            ServerMessage::Print(job) => {
                // Only transport errors matter to the session.
                let outcome = self.dispatcher.dispatch(job, transport).await?;
                self.collaborators.jobs.on_job_outcome(self.id, &outcome);
            }

            ServerMessage::Error { code, message } => {
                error!(code = %code, detail = %message, "server reported error");
                return Ok(Some(self.fail(AuthError::Server { code, message }.to_string())));
            }

            ServerMessage::ForceDisconnect { reason } => {
                let reason = reason.unwrap_or_default();
                warn!(reason = %reason, "force disconnected by server");
                self.last_error = Some(if reason.is_empty() {
                    "disconnected by server".to_string()
                } else {
                    format!("disconnected by server: {reason}")
                });
                self.enter(next);
                return Ok(Some(SessionEnd::Lost));
            }
        }
        Ok(None)
    }

    async fn send_authenticate(
        &mut self,
        transport: &mut dyn Transport,
        token: &str,
    ) -> Result<(), TransportError> {
        let printers = self.collaborators.roster.current_printers();
        debug!(printers = printers.len(), "sending authenticate");
        transport
            .send_text(codec::encode_authenticate(token, &self.client_name, &printers))
            .await
    }

    /// Replace the held token and report it.  Must precede any use of it.
    fn rotate_token(&mut self, token: String) {
        self.collaborators.tokens.on_token_rotated(self.id, &token);
        self.token = Some(token);
        info!("token rotated");
    }

    fn fail(&mut self, reason: String) -> SessionEnd {
        self.last_error = Some(reason);
        self.enter(SessionState::Error);
        SessionEnd::Failed
    }

    /// Feed a trigger that carries no message through the table.
    fn apply(&mut self, trigger: Trigger) {
        match transition(self.state, trigger) {
            Some(next) => self.enter(next),
            None => debug!(?trigger, state = %self.state.status(), "trigger ignored"),
        }
    }

    fn enter(&mut self, next: SessionState) {
        if next == self.state {
            return;
        }
        debug!(from = %self.state.status(), to = %next.status(), "state change");
        self.state = next;

        let mut timestamp = None;
        if next == SessionState::Connected {
            let now = Utc::now();
            self.retry_count = 0;
            self.last_connected = Some(now);
            self.last_error = None;
            timestamp = Some(now);
        }

        let error = match next.status() {
            ConnectionStatus::Error | ConnectionStatus::Disconnected => self.last_error.clone(),
            _ => None,
        };

        self.collaborators.status.on_status_change(&StatusEvent {
            connection_id: self.id,
            status: next.status(),
            timestamp,
            error,
            retry_count: self.retry_count,
        });
    }
}
