// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted fakes for session tests: a transport that yields a fixed sequence
// of frames and then closes, a connector that hands those out in order, and
// recording collaborators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use propslink_core::config::ConnectionConfig;
use propslink_core::error::{JobError, Result, TransportError};
use propslink_core::types::{
    ConnectionId, ConnectionStatus, JobOutcome, JobRequest, PrinterInfo, StatusEvent,
};

use crate::traits::{
    ConnectionSource, Connector, JobPipeline, JobSink, PrinterRoster, StatusSink, TokenSink,
    Transport,
};

/// Outbound frames shared between a transport and the test that owns it.
pub type SentLog = Arc<Mutex<Vec<String>>>;

pub enum Frame {
    Text(String),
    Fail(String),
}

/// A transport that plays back `frames`, then reports the peer closed.
pub struct ScriptedTransport {
    frames: VecDeque<Frame>,
    sent: SentLog,
    fail_sends: bool,
}

impl ScriptedTransport {
    pub fn new(frames: Vec<&str>) -> Self {
        Self {
            frames: frames.into_iter().map(|f| Frame::Text(f.to_string())).collect(),
            sent: SentLog::default(),
            fail_sends: false,
        }
    }

    pub fn with_frames(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            sent: SentLog::default(),
            fail_sends: false,
        }
    }

    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    fn log_to(mut self, sent: SentLog) -> Self {
        self.sent = sent;
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> std::result::Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::Send("scripted send failure".into()));
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_text(&mut self) -> Option<std::result::Result<String, TransportError>> {
        match self.frames.pop_front()? {
            Frame::Text(text) => Some(Ok(text)),
            Frame::Fail(detail) => Some(Err(TransportError::Receive(detail))),
        }
    }

    async fn close(&mut self) {}
}

/// Hands out one scripted session per `connect`.  Once the script runs out
/// it cancels `stop` and refuses, so the manager under test winds down.
pub struct ScriptedConnector {
    sessions: Mutex<VecDeque<std::result::Result<ScriptedTransport, TransportError>>>,
    sent: SentLog,
    connects: Mutex<u32>,
    stop: CancellationToken,
}

impl ScriptedConnector {
    pub fn new(
        sessions: Vec<std::result::Result<ScriptedTransport, TransportError>>,
        stop: CancellationToken,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(sessions.into()),
            sent: SentLog::default(),
            connects: Mutex::new(0),
            stop,
        })
    }

    /// Every frame sent on every session, in order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// The shared outbound log, for collaborators that record into it too.
    pub fn journal(&self) -> SentLog {
        Arc::clone(&self.sent)
    }

    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.sent()
            .iter()
            .map(|s| serde_json::from_str(s).unwrap())
            .collect()
    }

    pub fn connects(&self) -> u32 {
        *self.connects.lock().unwrap()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self, url: &str) -> std::result::Result<Box<dyn Transport>, TransportError> {
        *self.connects.lock().unwrap() += 1;
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(Ok(transport)) => Ok(Box::new(transport.log_to(Arc::clone(&self.sent)))),
            Some(Err(e)) => Err(e),
            None => {
                self.stop.cancel();
                Err(TransportError::Connect {
                    url: url.to_string(),
                    detail: "script exhausted".into(),
                })
            }
        }
    }
}

/// Records every job handed to it and succeeds.
#[derive(Default)]
pub struct RecordingPipeline {
    jobs: Mutex<Vec<JobRequest>>,
}

impl RecordingPipeline {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn jobs(&self) -> Vec<JobRequest> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobPipeline for RecordingPipeline {
    async fn render_and_send(&self, job: &JobRequest) -> std::result::Result<(), JobError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

/// Always fails with a transmit error.
pub struct FailingPipeline(pub String);

#[async_trait]
impl JobPipeline for FailingPipeline {
    async fn render_and_send(&self, _job: &JobRequest) -> std::result::Result<(), JobError> {
        Err(JobError::Transmit(self.0.clone()))
    }
}

pub struct PanickingPipeline;

/// Requests a stop while the job is being rendered, then completes it.
#[derive(Default)]
pub struct StoppingPipeline {
    stop: Mutex<Option<CancellationToken>>,
    finished: Mutex<Vec<String>>,
}

impl StoppingPipeline {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn stop_on_render(&self, stop: CancellationToken) {
        *self.stop.lock().unwrap() = Some(stop);
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobPipeline for StoppingPipeline {
    async fn render_and_send(&self, job: &JobRequest) -> std::result::Result<(), JobError> {
        let stop = self.stop.lock().unwrap().clone();
        if let Some(stop) = stop {
            stop.cancel();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.finished.lock().unwrap().push(job.job_id.clone());
        Ok(())
    }
}

#[async_trait]
impl JobPipeline for PanickingPipeline {
    async fn render_and_send(&self, _job: &JobRequest) -> std::result::Result<(), JobError> {
        panic!("renderer blew up");
    }
}

/// Records status, token and job events; serves a one-printer roster.
#[derive(Default)]
pub struct RecordingSinks {
    statuses: Mutex<Vec<StatusEvent>>,
    tokens: Mutex<Vec<(ConnectionId, String)>>,
    outcomes: Mutex<Vec<(ConnectionId, JobOutcome)>>,
    journal: Option<SentLog>,
}

impl RecordingSinks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Also writes `token:<value>` into `journal` on every rotation, so the
    /// rotation can be ordered against outbound frames.
    pub fn journaling(journal: SentLog) -> Arc<Self> {
        Arc::new(Self {
            journal: Some(journal),
            ..Self::default()
        })
    }

    pub fn outcomes(&self) -> Vec<(ConnectionId, JobOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<ConnectionStatus> {
        self.statuses.lock().unwrap().iter().map(|e| e.status).collect()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<(ConnectionId, String)> {
        self.tokens.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingSinks {
    fn on_status_change(&self, event: &StatusEvent) {
        self.statuses.lock().unwrap().push(event.clone());
    }
}

impl TokenSink for RecordingSinks {
    fn on_token_rotated(&self, connection_id: ConnectionId, token: &str) {
        self.tokens.lock().unwrap().push((connection_id, token.to_string()));
        if let Some(journal) = &self.journal {
            journal.lock().unwrap().push(format!("token:{token}"));
        }
    }
}

impl JobSink for RecordingSinks {
    fn on_job_outcome(&self, connection_id: ConnectionId, outcome: &JobOutcome) {
        self.outcomes.lock().unwrap().push((connection_id, outcome.clone()));
    }
}

impl PrinterRoster for RecordingSinks {
    fn current_printers(&self) -> Vec<PrinterInfo> {
        vec![PrinterInfo {
            id: "1".into(),
            name: "Zebra".into(),
            status: "online".into(),
            templates: vec!["Square".into()],
        }]
    }
}

/// A fixed list of configurations.
pub struct StaticSource(pub Vec<ConnectionConfig>);

impl ConnectionSource for StaticSource {
    fn list_active_connections(&self) -> Result<Vec<ConnectionConfig>> {
        Ok(self.0.iter().filter(|c| c.is_active).cloned().collect())
    }
}
