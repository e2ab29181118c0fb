// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Propslink print agent.
//
// Entry point. Initialises logging, loads the configuration, wires the session
// engine to the config store and label pipeline, and runs every configured
// connection until Ctrl-C.

mod label;
mod pipeline;
mod raw_client;
mod services;
mod spool;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use propslink_core::error::Result;
use propslink_session::{BackoffPolicy, Collaborators, Supervisor, WsConnector};

use pipeline::LabelPipeline;
use services::data_dir;
use services::store::ConfigStore;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "propslink agent starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "agent failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let store = Arc::new(ConfigStore::open(data_dir::config_path())?);
    let config = store.config();
    tracing::info!(path = %store.path().display(), "using configuration");

    let collaborators = Collaborators {
        connector: Arc::new(WsConnector::new(Duration::from_secs(config.connect_timeout_secs))),
        roster: store.clone(),
        status: store.clone(),
        tokens: store.clone(),
        jobs: store.clone(),
        pipeline: Arc::new(LabelPipeline::new(store.clone())),
    };
    let supervisor = Supervisor::new(
        store.clone(),
        collaborators,
        BackoffPolicy::new(Duration::from_millis(config.backoff_unit_ms)),
        CancellationToken::new(),
    );

    let stop = supervisor.stop_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, shutting down");
                stop.cancel();
            }
            Err(e) => tracing::error!(error = %e, "cannot listen for Ctrl-C"),
        }
    });

    supervisor.run().await
}
