// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label pipeline: resolve the printer and template for a job, render the
// label, and hand it to the printer's transport.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, instrument};

use propslink_core::config::PrinterKind;
use propslink_core::error::JobError;
use propslink_core::types::JobRequest;
use propslink_session::traits::JobPipeline;

use crate::services::store::ConfigStore;
use crate::{label, raw_client, spool};

pub struct LabelPipeline {
    store: Arc<ConfigStore>,
}

impl LabelPipeline {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobPipeline for LabelPipeline {
    #[instrument(skip_all, fields(job_id = %job.job_id, printer_id = %job.printer_id))]
    async fn render_and_send(&self, job: &JobRequest) -> Result<(), JobError> {
        let config = self.store.config();
        let printer = config
            .printer(&job.printer_id)
            .filter(|p| p.is_active)
            .ok_or_else(|| JobError::UnknownPrinter(job.printer_id.clone()))?;
        let template = printer
            .template
            .as_deref()
            .or(config.default_template.as_deref())
            .ok_or_else(|| JobError::NoTemplate(printer.id.clone()))?;

        let bytes = label::render(template, job)?;
        info!(printer = %printer.name, template, size = bytes.len(), "label rendered");

        match &printer.kind {
            PrinterKind::Raw { host, port } => raw_client::send_raw(host, *port, &bytes).await,
            PrinterKind::Virtual { spool_dir } => spool::write_label(spool_dir, job, &bytes).await.map(|_| ()),
        }
    }
}
