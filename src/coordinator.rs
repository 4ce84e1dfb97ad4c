//! # Coordinator Server — Barrier + Broadcast (§4.4)
//!
//! Runs as one async task inside the instance-0 process. A small pool of per-connection
//! reader tasks forward decoded [`Message`]s onto a single channel so that the rendezvous
//! slot and registration table are only ever touched from this one task — the async
//! equivalent of the reference's single-threaded readiness-multiplexing loop, without
//! needing a lock.

use crate::config::Config;
use crate::error::Result;
use crate::rendezvous::{compare_round, RendezvousSlot, SlotState, ValidationOutcome};
use crate::transport::{Listener, Stream};
use crate::wire::{Message, MessageType};
use std::collections::HashMap;
use tokio::io::{split, AsyncWriteExt, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

enum CoordEvent {
    Registered {
        instance_id: i32,
        write_half: WriteHalf<Stream>,
    },
    Message {
        instance_id: i32,
        msg: Message,
    },
    Disconnected {
        instance_id: i32,
    },
}

/// Drives the registration window, the operating loop, and teardown. Returns once
/// `cancel` fires or an unrecoverable transport error occurs. On a fingerprint
/// mismatch this function aborts the process (I5) after broadcasting the result —
/// callers that need the outcome without a process abort should use
/// [`crate::rendezvous::compare_round`] directly, as the unit tests do.
pub async fn run(cfg: Config, cancel: CancellationToken) -> Result<()> {
    let listener = Listener::bind(&cfg).await?;
    let n = cfg.num_instances as usize;
    let (tx, mut rx) = mpsc::channel::<CoordEvent>(32);
    let mut registration: HashMap<i32, WriteHalf<Stream>> = HashMap::new();
    let mut slot = RendezvousSlot::new();
    let mut connection_tasks: Vec<JoinHandle<()>> = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("coordinator cancelled, tearing down");
                break;
            }
            accepted = listener.accept(), if registration.len() < n => {
                match accepted {
                    Ok(stream) => {
                        let tx = tx.clone();
                        let conn_cancel = cancel.clone();
                        connection_tasks.push(tokio::spawn(handle_connection(stream, tx, conn_cancel)));
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            Some(event) = rx.recv() => {
                match event {
                    CoordEvent::Registered { instance_id, write_half } => {
                        if registration.len() >= n || registration.contains_key(&instance_id) {
                            warn!(instance_id, "registration beyond N or duplicate, dropping");
                        } else {
                            info!(instance_id, registered = registration.len() + 1, n, "participant registered");
                            registration.insert(instance_id, write_half);
                        }
                    }
                    CoordEvent::Message { instance_id, msg } => {
                        match msg.msg_type {
                            MessageType::SyncPoint => {
                                let state = slot.submit(msg.sync_point, instance_id, msg.fingerprint, n);
                                if let SlotState::Complete(arrivals) = state {
                                    let outcome = compare_round(msg.sync_point, &arrivals);
                                    broadcast(&mut registration, msg.sync_point, &arrivals, &outcome).await;
                                    if let ValidationOutcome::Mismatch { details } = &outcome {
                                        error!(sync_point = msg.sync_point, %details, "MISMATCH");
                                        error!("ASSERTION FAILED: cross-instance validation mismatch");
                                        std::process::exit(1);
                                    } else {
                                        info!(sync_point = msg.sync_point, "MATCH");
                                    }
                                }
                            }
                            MessageType::Shutdown => {
                                info!(instance_id, "participant shutting down, keeping connection open for round completion");
                            }
                            MessageType::Register | MessageType::ValidationResult => {
                                warn!(instance_id, "unexpected message type in operating loop, dropping");
                            }
                        }
                    }
                    CoordEvent::Disconnected { instance_id } => {
                        warn!(instance_id, "participant connection closed");
                    }
                }
            }
        }
    }

    // Cancel already fired: every spawned reader task's select! will observe it on its next
    // iteration, so joining them here bounds teardown without leaking a task or a half-open
    // read side (§4.4 "close all endpoints", P5).
    for task in connection_tasks {
        let _ = task.await;
    }
    for (instance_id, mut write_half) in registration.drain() {
        if let Err(e) = write_half.shutdown().await {
            warn!(instance_id, error = %e, "error closing registered connection");
        }
    }
    listener.unbind(&cfg);
    Ok(())
}

async fn handle_connection(mut stream: Stream, tx: mpsc::Sender<CoordEvent>, cancel: CancellationToken) {
    let register = tokio::select! {
        _ = cancel.cancelled() => return,
        result = Message::read(&mut stream) => match result {
            Ok(m) if m.msg_type == MessageType::Register => m,
            Ok(_) => {
                warn!("first message from new connection was not REGISTER, dropping");
                return;
            }
            Err(e) => {
                warn!(error = %e, "failed to read REGISTER");
                return;
            }
        },
    };
    let instance_id = register.instance_id;
    let (mut read_half, write_half) = split(stream);
    if tx
        .send(CoordEvent::Registered {
            instance_id,
            write_half,
        })
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            result = Message::read(&mut read_half) => match result {
                Ok(msg) => {
                    if tx.send(CoordEvent::Message { instance_id, msg }).await.is_err() {
                        break;
                    }
                }
                Err(_) => {
                    let _ = tx.send(CoordEvent::Disconnected { instance_id }).await;
                    break;
                }
            },
        }
    }
}

/// Broadcast a round's result to every registered participant (I4). For `N == 2` each
/// recipient's `mismatch_details` carries the *other* participant's fingerprint so it can
/// reproduce the comparison locally without another round trip (§4.1).
async fn broadcast(
    registration: &mut HashMap<i32, WriteHalf<Stream>>,
    sync_point: u64,
    arrivals: &[(i32, String)],
    outcome: &ValidationOutcome,
) {
    let passed = matches!(outcome, ValidationOutcome::Match);
    for (instance_id, write_half) in registration.iter_mut() {
        let details = if passed {
            String::new()
        } else if arrivals.len() == 2 {
            arrivals
                .iter()
                .find(|(id, _)| id != instance_id)
                .map(|(_, fp)| fp.clone())
                .unwrap_or_default()
        } else if let ValidationOutcome::Mismatch { details } = outcome {
            details.clone()
        } else {
            String::new()
        };
        let msg = Message::validation_result(sync_point, passed, details);
        if let Err(e) = msg.write(write_half).await {
            warn!(instance_id, error = %e, "broadcast send failed");
        }
    }
}
