//! # Participant Client — State Machine (§4.3)
//!
//! ```text
//! INIT → CONNECTING → REGISTERED → {IDLE ⇄ AWAITING_RESULT} → SHUT_DOWN
//!                                        ↘ on mismatch → ABORT
//! ```
//!
//! `validate_checked` computes the round's outcome as a plain value and never aborts the
//! process; the public [`Participant::validate`] / [`Participant::validate_logged`] wrappers
//! are the only places that translate a mismatch into a process abort, so the state machine
//! itself stays fully testable (§4.3 key decision, §4.7).

use crate::checkpoint::CheckpointFlag;
use crate::config::Config;
use crate::coordinator;
use crate::error::{CrossValidationError, Result};
use crate::transport::Stream;
use crate::wire::{Message, MessageType};
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Total deadline for a `validate` round awaiting VALIDATION_RESULT (§4.3).
pub const VALIDATE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Init,
    Registered,
    ShutDown,
}

/// Outcome of a single `validate` round, surfaced to the caller without ever aborting the
/// process on its own (§4.3). Distinct from [`crate::rendezvous::ValidationOutcome`], which
/// is the coordinator-side barrier result; this type additionally carries the peer
/// fingerprint for logging and the "checkpoint in progress" no-op case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoundResult {
    Match,
    Mismatch { local: String, peer: String },
    TimedOut,
    /// Validation disabled or a checkpoint is in progress; no message was sent (§4.5).
    Skipped,
}

struct HostedCoordinator {
    cancel: CancellationToken,
    join: tokio::task::JoinHandle<()>,
}

pub struct Participant {
    cfg: Config,
    stream: Stream,
    coordinator: Option<HostedCoordinator>,
    sync_counter: u64,
    checkpoint_flag: CheckpointFlag,
    validation_enabled: bool,
    state: State,
}

impl Participant {
    /// Establish this participant's connection to the coordinator, spawning the coordinator
    /// task first when `instance_id == 0` (§4.3).
    pub async fn init(cfg: Config) -> Result<Self> {
        Self::init_with_flag(cfg, CheckpointFlag::new()).await
    }

    pub(crate) async fn init_with_flag(cfg: Config, checkpoint_flag: CheckpointFlag) -> Result<Self> {
        let coordinator = if cfg.is_coordinator() {
            let cancel = CancellationToken::new();
            let run_cfg = cfg.clone();
            let run_cancel = cancel.clone();
            let join = tokio::spawn(async move {
                if let Err(e) = coordinator::run(run_cfg, run_cancel).await {
                    error!(error = %e, "coordinator task exited with error");
                }
            });
            Some(HostedCoordinator { cancel, join })
        } else {
            None
        };

        let mut stream = Stream::connect(&cfg).await?;
        Message::register(cfg.instance_id as i32)
            .write(&mut stream)
            .await?;
        info!(instance_id = cfg.instance_id, "registered with coordinator");

        Ok(Participant {
            cfg,
            stream,
            coordinator,
            sync_counter: 0,
            checkpoint_flag,
            validation_enabled: true,
            state: State::Registered,
        })
    }

    pub fn instance_id(&self) -> u32 {
        self.cfg.instance_id
    }

    /// Run one barrier round and return its outcome without aborting the process (§4.3).
    pub async fn validate_checked(&mut self, label: &str, fingerprint: &str) -> Result<RoundResult> {
        if !self.validation_enabled || self.checkpoint_flag.is_set() {
            return Ok(RoundResult::Skipped);
        }
        if self.state != State::Registered {
            return Err(CrossValidationError::Config(
                "validate called outside the Registered state".into(),
            ));
        }

        self.sync_counter += 1;
        let sync_point = self.sync_counter;

        Message::sync_point(self.cfg.instance_id as i32, sync_point, fingerprint.to_string())
            .write(&mut self.stream)
            .await?;

        match timeout(VALIDATE_TIMEOUT, Message::read(&mut self.stream)).await {
            Ok(Ok(msg)) if msg.msg_type == MessageType::ValidationResult => {
                if msg.validation_passed {
                    info!(label, sync_point, "MATCH");
                    Ok(RoundResult::Match)
                } else {
                    warn!(label, sync_point, peer = %msg.mismatch_details, "MISMATCH");
                    Ok(RoundResult::Mismatch {
                        local: fingerprint.to_string(),
                        peer: msg.mismatch_details,
                    })
                }
            }
            Ok(Ok(other)) => Err(CrossValidationError::Transport(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("expected VALIDATION_RESULT, got {:?}", other.msg_type),
            ))),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => {
                warn!(label, sync_point, "timed out awaiting validation result");
                Ok(RoundResult::TimedOut)
            }
        }
    }

    /// Run a barrier round; abort the process on mismatch (I5). This is the entry point a
    /// hosted computation calls in its normal, fail-fast path.
    pub async fn validate(&mut self, label: &str, fingerprint: &str) -> Result<()> {
        if let RoundResult::Mismatch { local, peer } = self.validate_checked(label, fingerprint).await? {
            error!(label, local = %local, peer = %peer, "MISMATCH");
            error!("ASSERTION FAILED: cross-instance validation mismatch");
            std::process::exit(1);
        }
        Ok(())
    }

    /// Run a barrier round; log a mismatch but never abort the process.
    pub async fn validate_logged(&mut self, label: &str, fingerprint: &str) -> Result<()> {
        if let RoundResult::Mismatch { local, peer } = self.validate_checked(label, fingerprint).await? {
            error!(label, local = %local, peer = %peer, "MISMATCH (logged only, not aborting)");
        }
        Ok(())
    }

    /// Idempotent teardown: best-effort SHUTDOWN, close the socket, and if this instance
    /// hosts the coordinator, cancel and join its task (P5, P7).
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.state == State::ShutDown {
            return Ok(());
        }
        let _ = Message::shutdown(self.cfg.instance_id as i32)
            .write(&mut self.stream)
            .await;
        self.close_for_checkpoint().await;
        self.state = State::ShutDown;
        Ok(())
    }

    /// Hard close used by the checkpoint hook: no SHUTDOWN handshake, just sockets and the
    /// coordinator task (§4.5, P5).
    pub(crate) async fn close_for_checkpoint(&mut self) {
        let _ = tokio::io::AsyncWriteExt::shutdown(&mut self.stream).await;
        if let Some(host) = self.coordinator.take() {
            host.cancel.cancel();
            let _ = host.join.await;
        }
    }

    pub(crate) fn checkpoint_flag(&self) -> CheckpointFlag {
        self.checkpoint_flag.clone()
    }

    pub(crate) fn cfg(&self) -> &Config {
        &self.cfg
    }
}
