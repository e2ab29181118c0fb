// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Agent configuration: server connections and local printers.

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, ConnectionRuntimeState, JobRecord, PrinterInfo};

/// Path every print-service WebSocket endpoint is mounted under.
pub const WS_PATH: &str = "/ws/print-service/";

/// Name the agent identifies itself with when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "PROPS Print Client";

/// Default raw TCP port (HP JetDirect).
pub const DEFAULT_RAW_PORT: u16 = 9100;

/// One remote job-dispatch server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub id: ConnectionId,
    /// Label for display.
    #[serde(default)]
    pub name: String,
    /// Server address as entered; see [`normalize_server_url`].
    pub server_url: String,
    /// Long-lived token obtained by pairing.  `None` until paired.
    #[serde(default)]
    pub pairing_token: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Name this client presents to the server.  Empty means the agent-wide
    /// [`AgentConfig::client_name`].
    #[serde(default)]
    pub client_name: String,
}

impl ConnectionConfig {
    pub fn new(id: u64, server_url: impl Into<String>) -> Self {
        Self {
            id: ConnectionId(id),
            name: String::new(),
            server_url: server_url.into(),
            pairing_token: None,
            is_active: true,
            client_name: default_client_name(),
        }
    }

    /// The WebSocket URL to dial for this connection.
    pub fn ws_url(&self) -> String {
        normalize_server_url(&self.server_url)
    }

    pub fn is_paired(&self) -> bool {
        self.pairing_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// How bytes reach a local printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PrinterKind {
    /// Raw TCP socket (JetDirect).
    Raw {
        host: String,
        #[serde(default = "default_raw_port")]
        port: u16,
    },
    /// No hardware: rendered labels are written to a spool directory.
    Virtual { spool_dir: std::path::PathBuf },
}

/// A local label printer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub id: String,
    pub name: String,
    pub kind: PrinterKind,
    /// Template used for this printer; falls back to the agent default.
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl PrinterConfig {
    /// Roster entry advertised to servers at authentication time.
    pub fn info(&self) -> PrinterInfo {
        PrinterInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            status: if self.is_active { "online" } else { "offline" }.to_string(),
            templates: self.template.iter().cloned().collect(),
        }
    }
}

/// Persistent agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub client_name: String,
    pub connections: Vec<ConnectionConfig>,
    pub printers: Vec<PrinterConfig>,
    /// Template used when a printer has none of its own.
    pub default_template: Option<String>,
    pub connect_timeout_secs: u64,
    /// Length of one backoff unit; the reconnect delay is `2^n` units.
    pub backoff_unit_ms: u64,
    /// Last-known state per connection, written back while the agent runs.
    pub runtime: Vec<ConnectionRuntimeState>,
    /// Most recent job outcomes, newest last.
    pub recent_jobs: Vec<JobRecord>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            connections: Vec::new(),
            printers: Vec::new(),
            default_template: None,
            connect_timeout_secs: 10,
            backoff_unit_ms: 1000,
            runtime: Vec::new(),
            recent_jobs: Vec::new(),
        }
    }
}

impl AgentConfig {
    pub fn printer(&self, id: &str) -> Option<&PrinterConfig> {
        self.printers.iter().find(|p| p.id == id)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut ConnectionConfig> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    /// The client name a connection presents, falling back to the agent's.
    pub fn client_name_for(&self, connection: &ConnectionConfig) -> String {
        if connection.client_name.is_empty() {
            self.client_name.clone()
        } else {
            connection.client_name.clone()
        }
    }
}

/// Normalise a configured server address to a print-service WebSocket URL.
///
/// `ws://`/`wss://` URLs that already end in [`WS_PATH`] are kept.  Otherwise
/// the host and port are extracted and the path replaced: `http` maps to `ws`,
/// every other scheme (and a bare hostname) maps to `wss`.
pub fn normalize_server_url(raw: &str) -> String {
    let url = raw.trim();

    if (url.starts_with("ws://") || url.starts_with("wss://")) && url.ends_with(WS_PATH) {
        return url.to_string();
    }

    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => {
            let ws = if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("ws") {
                "ws"
            } else {
                "wss"
            };
            (ws, rest)
        }
        None => ("wss", url),
    };

    let authority = rest.split('/').next().unwrap_or_default();
    // Drop any userinfo.
    let authority = authority.rsplit('@').next().unwrap_or(authority);
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) if !port.is_empty() => (host, Some(port)),
        Some((host, _)) => (host, None),
        None => (authority, None),
    };

    match port {
        Some(port) => format!("{scheme}://{host}:{port}{WS_PATH}"),
        None => format!("{scheme}://{host}{WS_PATH}"),
    }
}

fn default_true() -> bool {
    true
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

fn default_raw_port() -> u16 {
    DEFAULT_RAW_PORT
}
