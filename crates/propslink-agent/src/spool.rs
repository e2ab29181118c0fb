// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Virtual printer: rendered labels are written to a spool directory as
// `{job_id}_{barcode}_{timestamp}.zpl`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use propslink_core::error::JobError;
use propslink_core::types::JobRequest;

/// Write `label` into `spool_dir` and return the file written.
pub async fn write_label(spool_dir: &Path, job: &JobRequest, label: &[u8]) -> Result<PathBuf, JobError> {
    tokio::fs::create_dir_all(spool_dir)
        .await
        .map_err(|e| JobError::Transmit(format!("cannot create spool directory {}: {e}", spool_dir.display())))?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let name = format!(
        "{}_{}_{timestamp}.zpl",
        file_component(&job.job_id),
        file_component(&job.barcode)
    );
    let path = spool_dir.join(name);

    tokio::fs::write(&path, label)
        .await
        .map_err(|e| JobError::Transmit(format!("cannot write {}: {e}", path.display())))?;

    info!(job_id = %job.job_id, path = %path.display(), "label spooled");
    Ok(path)
}

/// Keep server-supplied text from escaping the spool directory.
fn file_component(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect()
}
