// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// propslink session engine: keeps authenticated WebSocket sessions with
// remote job-dispatch servers, turns pushed `print` messages into calls to
// the local render/print pipeline, and reports outcomes back.  Storage,
// rendering and printer I/O are injected through the traits in `traits`.

pub mod backoff;
pub mod codec;
pub mod dispatch;
pub mod machine;
pub mod manager;
pub mod supervisor;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

pub use backoff::BackoffPolicy;
pub use codec::ServerMessage;
pub use dispatch::JobDispatcher;
pub use machine::SessionState;
pub use manager::{Collaborators, ConnectionManager};
pub use supervisor::{ConnectionSummary, Supervisor};
pub use transport::WsConnector;
