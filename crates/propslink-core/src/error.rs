// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for propslink.
//
// Each concern (wire decoding, transport, authentication, job pipeline) has its
// own enum so the session engine can route it: protocol, transport and auth
// errors turn into connection status transitions, job errors turn into a
// failed `print_status` report.

use thiserror::Error;

/// Decode-time failure.  Never partially applied: a message either decodes
/// completely or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("missing 'type' field in message")]
    MissingType,

    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),
}

/// Failure of the message-oriented connection to a server.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connect to {url} failed: {detail}")]
    Connect { url: String, detail: String },

    #[error("connect to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("connection closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),
}

/// The server refused to let this client in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("authentication rejected: {0}")]
    Rejected(String),

    #[error("pairing denied by server")]
    PairingDenied,

    #[error("server error {code}: {message}")]
    Server { code: String, message: String },
}

/// Failure of the render/print pipeline for a single job.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("render failed: {0}")]
    Render(String),

    #[error("transmit failed: {0}")]
    Transmit(String),

    #[error("printer {0} not found")]
    UnknownPrinter(String),

    #[error("no template available for printer {0}")]
    NoTemplate(String),
}

/// Top-level error type for all propslink operations.
#[derive(Debug, Error)]
pub enum PropslinkError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PropslinkError>;
