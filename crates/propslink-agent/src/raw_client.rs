// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP print client (JetDirect, port 9100).
//
// Opens a socket to the printer and writes the rendered label.  There is no
// reply to wait for: a label printer acknowledges nothing on this port, so a
// clean write and shutdown is the whole job.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use propslink_core::error::JobError;

/// Timeout for each raw TCP step (connect, write, shutdown).
const RAW_TIMEOUT_SECS: u64 = 8;

/// Write size per chunk.
const CHUNK_SIZE: usize = 8192;

/// Send label bytes to a printer via raw TCP.
pub async fn send_raw(host: &str, port: u16, label: &[u8]) -> Result<(), JobError> {
    send_raw_with_timeout(host, port, label, Duration::from_secs(RAW_TIMEOUT_SECS)).await
}

pub(crate) async fn send_raw_with_timeout(
    host: &str,
    port: u16,
    label: &[u8],
    limit: Duration,
) -> Result<(), JobError> {
    let addr = format!("{host}:{port}");
    info!(addr = %addr, total = label.len(), "connecting via raw TCP");

    let mut stream = tokio::time::timeout(limit, TcpStream::connect(&addr))
        .await
        .map_err(|_| {
            JobError::Transmit(format!(
                "connection to {addr} timed out after {}s",
                limit.as_secs()
            ))
        })?
        .map_err(|e| JobError::Transmit(format!("failed to connect to {addr}: {e}")))?;

    let mut sent = 0;
    for chunk in label.chunks(CHUNK_SIZE) {
        tokio::time::timeout(limit, stream.write_all(chunk))
            .await
            .map_err(|_| JobError::Transmit(format!("write to {addr} timed out at byte {sent}")))?
            .map_err(|e| JobError::Transmit(format!("write to {addr} failed at byte {sent}: {e}")))?;
        sent += chunk.len();
        debug!(sent, total = label.len(), "raw TCP progress");
    }

    tokio::time::timeout(limit, async {
        stream.flush().await?;
        stream.shutdown().await
    })
    .await
    .map_err(|_| JobError::Transmit(format!("shutdown of {addr} timed out")))?
    .map_err(|e| JobError::Transmit(format!("shutdown of {addr} failed: {e}")))?;

    info!(addr = %addr, total = label.len(), "label sent");
    Ok(())
}
