// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line surface (§6 "CLI (agent process)"). Flags map 1:1 to
//! configuration keys; `run` is the default subcommand.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "crackagentd", version, about = "Distributed password-cracking agent")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register, benchmark, and poll for tasks until signalled to stop (default).
    Run(RunArgs),
    /// Check for and apply a cracker update, then exit.
    Update(RunArgs),
    /// Print the agent's version and exit.
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Control plane base URL.
    #[arg(long)]
    pub url: Option<String>,

    /// API bearer token.
    #[arg(long)]
    pub token: Option<String>,

    /// Root directory for downloaded resources, caches, and the PID file.
    #[arg(long = "data-path")]
    pub data_path: Option<PathBuf>,

    /// Path to a pre-installed hashcat binary (implies `--use-native-hashcat`).
    #[arg(long = "hashcat-path")]
    pub hashcat_path: Option<PathBuf>,

    /// Use a hashcat binary already present on this host instead of letting
    /// the control plane manage an installation under `data_path`.
    #[arg(long = "use-native-hashcat")]
    pub use_native_hashcat: bool,

    /// Re-run the benchmark even if a submitted cache entry exists.
    #[arg(long = "force-benchmark-run")]
    pub force_benchmark_run: bool,

    /// Enable debug-level logging.
    #[arg(long)]
    pub debug: bool,

    /// Enable extra diagnostic logging (implies `--debug`).
    #[arg(long = "extra-debug")]
    pub extra_debug: bool,
}
