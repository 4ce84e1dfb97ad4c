//! # Configuration — Environment-Driven Setup
//!
//! Read once at [`crate::participant::Participant::init`] and validated before any socket is
//! opened (§4.6). Mirrors the source platform's convention of falling back through an
//! environment variable when a CLI flag is absent, but the library surface itself never
//! depends on a command-line parser — only the demonstration harness (`src/main.rs`) layers
//! `clap` on top via `#[arg(env = "...")]`.

use crate::error::{CrossValidationError, Result};
use std::path::PathBuf;

/// Hard upper bound on participant count, matching the reference's compile-time constant.
pub const MAX_INSTANCES: u32 = 4;

pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Tcp,
    Unix,
}

impl std::str::FromStr for TransportKind {
    type Err = CrossValidationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(TransportKind::Tcp),
            "unix" => Ok(TransportKind::Unix),
            other => Err(CrossValidationError::Config(format!(
                "unknown transport {other:?}, expected \"tcp\" or \"unix\""
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub instance_id: u32,
    pub num_instances: u32,
    pub server_addr: String,
    pub server_port: u16,
    pub transport: TransportKind,
    pub socket_path: PathBuf,
}

impl Config {
    /// Read and validate configuration from the `CROSS_VALIDATION_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let instance_id = read_u32("CROSS_VALIDATION_INSTANCE_ID")?;
        let num_instances = read_u32("CROSS_VALIDATION_NUM_INSTANCES")?;
        let server_addr = std::env::var("CROSS_VALIDATION_SERVER_ADDR")
            .unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string());
        let server_port = match std::env::var("CROSS_VALIDATION_SERVER_PORT") {
            Ok(v) => v
                .parse()
                .map_err(|_| CrossValidationError::Config(format!("invalid port {v:?}")))?,
            Err(_) => DEFAULT_SERVER_PORT,
        };
        let transport = match std::env::var("CROSS_VALIDATION_TRANSPORT") {
            Ok(v) => v.parse()?,
            Err(_) => TransportKind::default(),
        };
        let socket_path = std::env::var("CROSS_VALIDATION_SOCKET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(format!("/tmp/cross_validation_{server_port}.sock")));

        Self::new(
            instance_id,
            num_instances,
            server_addr,
            server_port,
            transport,
            socket_path,
        )
    }

    pub fn new(
        instance_id: u32,
        num_instances: u32,
        server_addr: String,
        server_port: u16,
        transport: TransportKind,
        socket_path: PathBuf,
    ) -> Result<Self> {
        if num_instances == 0 || num_instances > MAX_INSTANCES {
            return Err(CrossValidationError::Config(format!(
                "num_instances {num_instances} out of range [1, {MAX_INSTANCES}]"
            )));
        }
        if instance_id >= num_instances {
            return Err(CrossValidationError::Config(format!(
                "instance_id {instance_id} out of range [0, {num_instances})"
            )));
        }
        Ok(Config {
            instance_id,
            num_instances,
            server_addr,
            server_port,
            transport,
            socket_path,
        })
    }

    pub fn is_coordinator(&self) -> bool {
        self.instance_id == 0
    }
}

fn read_u32(key: &str) -> Result<u32> {
    let raw = std::env::var(key)
        .map_err(|_| CrossValidationError::Config(format!("{key} is required")))?;
    raw.parse()
        .map_err(|_| CrossValidationError::Config(format!("{key}={raw:?} is not an integer")))
}
