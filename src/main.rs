//! # cross-validate — Demonstration Harness (§4.8)
//!
//! Stands in for the hosted computation: reads configuration (flags override environment),
//! calls `init`, drives a sequence of synthetic fingerprints through `validate`, then
//! `cleanup`s. Run `N` copies of this binary (one per terminal, or under a process
//! supervisor) to manually exercise the protocol end to end; the integration tests in
//! `tests/` spawn it the same way.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use xval::checkpoint::{pre_checkpoint, resume};
use xval::config::{Config, TransportKind};
use xval::participant::Participant;

#[derive(Parser)]
#[command(name = "cross-validate", about = "Cross-instance synchronized validation demo harness")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run this instance: register, validate each given fingerprint in order, then shut down.
    Run(RunArgs),
    /// Run a few sync points, exercise the pre-checkpoint/resume hooks, then continue.
    CheckpointDemo(RunArgs),
}

#[derive(Args, Clone)]
struct RunArgs {
    /// This process's participant id in [0, num_instances).
    #[arg(long, env = "CROSS_VALIDATION_INSTANCE_ID")]
    instance_id: u32,

    /// Total participant count.
    #[arg(long, env = "CROSS_VALIDATION_NUM_INSTANCES")]
    num_instances: u32,

    /// Coordinator bind/connect address.
    #[arg(long, env = "CROSS_VALIDATION_SERVER_ADDR", default_value = "127.0.0.1")]
    server_addr: String,

    /// Coordinator port.
    #[arg(long, env = "CROSS_VALIDATION_SERVER_PORT", default_value_t = 5000)]
    server_port: u16,

    /// "tcp" or "unix".
    #[arg(long, default_value = "tcp")]
    transport: String,

    /// AF_UNIX rendezvous path; defaults to a path derived from the port.
    #[arg(long)]
    socket_path: Option<PathBuf>,

    /// Fingerprint to submit at each sync point, one `--fingerprint` flag per point, in order.
    #[arg(long = "fingerprint")]
    fingerprints: Vec<String>,

    /// Log mismatches instead of aborting the process on one.
    #[arg(long, default_value_t = false)]
    log_only: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<Config> {
        let transport: TransportKind = self.transport.parse()?;
        let socket_path = self
            .socket_path
            .unwrap_or_else(|| xval::transport::default_socket_path(self.server_port));
        Ok(Config::new(
            self.instance_id,
            self.num_instances,
            self.server_addr,
            self.server_port,
            transport,
            socket_path,
        )?)
    }
}

fn init_logging() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_target(false).init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::CheckpointDemo(args) => checkpoint_demo(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let log_only = args.log_only;
    let fingerprints = args.fingerprints.clone();
    let cfg = args.into_config().context("invalid configuration")?;
    let mut participant = Participant::init(cfg).await.context("init failed")?;

    for (i, fingerprint) in fingerprints.iter().enumerate() {
        let label = format!("sync-{i}");
        if log_only {
            participant.validate_logged(&label, fingerprint).await?;
        } else {
            participant.validate(&label, fingerprint).await?;
        }
    }

    participant.shutdown().await?;
    Ok(())
}

async fn checkpoint_demo(args: RunArgs) -> Result<()> {
    let fingerprints = args.fingerprints.clone();
    let cfg = args.clone().into_config().context("invalid configuration")?;
    let mut participant = Participant::init(cfg.clone()).await.context("init failed")?;

    let mid = fingerprints.len() / 2;
    for (i, fingerprint) in fingerprints[..mid].iter().enumerate() {
        participant
            .validate(&format!("pre-checkpoint-{i}"), fingerprint)
            .await?;
    }

    let saved = pre_checkpoint(&mut participant).await;
    let mut participant = resume(saved, cfg).await.context("resume failed")?;

    for (i, fingerprint) in fingerprints[mid..].iter().enumerate() {
        participant
            .validate(&format!("post-resume-{i}"), fingerprint)
            .await?;
    }

    participant.shutdown().await?;
    Ok(())
}
