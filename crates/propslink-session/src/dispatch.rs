// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatch boundary.
//
// Turns one inbound `print` message into exactly one `print_ack` followed by
// exactly one `print_status` on the same transport.  Pipeline failures,
// panics included, stop here and become a failed status; only a failure to
// write to the transport escapes, because then the session itself is gone.

use std::sync::Arc;

use tracing::{error, info, instrument};

use propslink_core::error::{JobError, TransportError};
use propslink_core::types::{JobOutcome, JobRequest};

use crate::codec;
use crate::traits::{JobPipeline, Transport};

/// Bridges `print` messages to the render/print pipeline.
#[derive(Clone)]
pub struct JobDispatcher {
    pipeline: Arc<dyn JobPipeline>,
}

impl JobDispatcher {
    pub fn new(pipeline: Arc<dyn JobPipeline>) -> Self {
        Self { pipeline }
    }

    /// Acknowledge, run the pipeline, report the outcome.
    #[instrument(skip_all, fields(job_id = %job.job_id, printer_id = %job.printer_id))]
    pub async fn dispatch(
        &self,
        job: JobRequest,
        transport: &mut dyn Transport,
    ) -> Result<JobOutcome, TransportError> {
        transport
            .send_text(codec::encode_print_ack(&job.job_id))
            .await?;
        info!(barcode = %job.barcode, quantity = job.quantity, "print job received");

        let outcome = match self.run_pipeline(&job).await {
            Ok(()) => {
                info!("print job completed");
                JobOutcome::completed(&job.job_id)
            }
            Err(e) => {
                error!(error = %e, "print job failed");
                JobOutcome::failed(&job.job_id, e.to_string())
            }
        };

        transport
            .send_text(codec::encode_print_status(
                &outcome.job_id,
                outcome.status,
                outcome.error.as_deref(),
            ))
            .await?;
        Ok(outcome)
    }

    /// Run the pipeline on its own task so a panic cannot unwind into the
    /// session loop.
    async fn run_pipeline(&self, job: &JobRequest) -> Result<(), JobError> {
        let pipeline = Arc::clone(&self.pipeline);
        let job = job.clone();
        tokio::spawn(async move { pipeline.render_and_send(&job).await })
            .await
            .unwrap_or_else(|join_err| {
                Err(JobError::Render(format!("print pipeline aborted: {join_err}")))
            })
    }
}
