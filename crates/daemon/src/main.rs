// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `crackagentd` — binary entrypoint. Parses the CLI, resolves local
//! configuration, and drives an [`agent_daemon::AgentController`] through
//! startup and the main loop, matching the teacher's `cli/src/main.rs`
//! shape: a thin `main` that prints and exits on `run()`'s error, with the
//! actual work living in a fallible `async fn run() -> anyhow::Result<()>`.

use agent_api::{ApiClient, ErrorReporter, HttpApiClient};
use agent_core::AgentState;
use agent_daemon::cli::{Cli, Command, RunArgs};
use agent_daemon::{config::LocalConfig, controller::AgentController, logging, pid_file};
use agent_platform::{Platform, SystemPlatform};
use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run(RunArgs {
        url: None,
        token: None,
        data_path: None,
        hashcat_path: None,
        use_native_hashcat: false,
        force_benchmark_run: false,
        debug: false,
        extra_debug: false,
    })) {
        Command::Version => {
            println!("crackagentd {VERSION}");
            Ok(())
        }
        Command::Run(args) => run_agent(args, false).await,
        Command::Update(args) => run_agent(args, true).await,
    }
}

async fn run_agent(args: RunArgs, update_only: bool) -> Result<()> {
    let config = LocalConfig::resolve(&args).context("resolving local configuration")?;
    config
        .persist()
        .context("persisting resolved configuration")?;

    let log_path = config.data_path.join("logs").join("agent.log");
    logging::rotate_log_if_needed(&log_path);
    let _guard = logging::setup(&log_path, config.debug, config.extra_debug)
        .context("setting up logging")?;

    info!(version = VERSION, "crackagentd starting");

    let base_url = url::Url::parse(&config.url).context("invalid control plane url")?;
    let api: Arc<dyn ApiClient> = Arc::new(HttpApiClient::new(base_url, config.token.clone()));
    let platform = Arc::new(SystemPlatform);
    let state = Arc::new(AgentState::new(
        config.token.clone(),
        config.url.clone(),
        config.data_path.clone(),
    ));
    let reporter = Arc::new(ErrorReporter::new(
        api.clone(),
        platform.host_info().os,
        VERSION.to_string(),
    ));

    let controller = Arc::new(AgentController::new(
        api,
        platform,
        state.clone(),
        reporter,
        config.use_native_hashcat,
        config.hashcat_path.clone(),
        config.force_benchmark_run,
    ));

    let cancel = CancellationToken::new();
    if let Err(e) = controller.startup(&cancel).await {
        pid_file::release(&state.paths.pid_file);
        return Err(e).context("agent startup failed");
    }

    if update_only {
        info!("update-only run complete");
        pid_file::release(&state.paths.pid_file);
        return Ok(());
    }

    if let Err(e) = controller.publish_agent_metadata(&cancel).await {
        info!(error = %e, "publish_agent_metadata failed; continuing without it");
    }

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "could not install SIGTERM handler");
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
        }
        signal_cancel.cancel();
    });

    controller.run(cancel).await.context("agent loop exited with an error")?;
    info!("crackagentd exiting cleanly");
    Ok(())
}
