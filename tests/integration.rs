//! End-to-end protocol scenarios (§8), run against real loopback TCP connections: an
//! in-process coordinator (hosted by "instance 0") and one or more participant clients.
//! Mirrors the source project's `tests/` integration-test layout.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU16, Ordering};
use xval::checkpoint::{pre_checkpoint, resume};
use xval::config::{Config, TransportKind};
use xval::participant::{Participant, RoundResult};

static NEXT_PORT: AtomicU16 = AtomicU16::new(19000);

fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

fn cfg(instance_id: u32, num_instances: u32, port: u16) -> Config {
    Config::new(
        instance_id,
        num_instances,
        "127.0.0.1".to_string(),
        port,
        TransportKind::Tcp,
        PathBuf::from("/tmp/unused.sock"),
    )
    .unwrap()
}

/// Scenario 1 + 2: happy path and a tolerant numeric match both resolve as a match.
#[tokio::test]
async fn happy_path_and_tolerant_match() {
    let port = next_port();
    let (mut p0, mut p1) = tokio::join!(
        Participant::init(cfg(0, 2, port)),
        Participant::init(cfg(1, 2, port)),
    );
    let mut p0 = p0.unwrap();
    let mut p1 = p1.unwrap();

    let (r0, r1) = tokio::join!(
        p0.validate_checked("A", "energy=100.0 step=1"),
        p1.validate_checked("A", "energy=100.0 step=1"),
    );
    assert_eq!(r0.unwrap(), RoundResult::Match);
    assert_eq!(r1.unwrap(), RoundResult::Match);

    let (r0, r1) = tokio::join!(
        p0.validate_checked("B", "energy=1.0000000001"),
        p1.validate_checked("B", "energy=1.0"),
    );
    assert_eq!(r0.unwrap(), RoundResult::Match);
    assert_eq!(r1.unwrap(), RoundResult::Match);

    p0.shutdown().await.unwrap();
    p1.shutdown().await.unwrap();
}

/// Scenario 3: a numeric mismatch beyond epsilon is reported to both participants, each
/// carrying the other's fingerprint, without either side invoking a process abort (the
/// abort path itself lives only in `Participant::validate`, exercised separately via the
/// CLI harness subprocess tests).
#[tokio::test]
async fn numeric_mismatch_reported_to_both_sides() {
    let port = next_port();
    let (mut p0, mut p1) = tokio::join!(
        Participant::init(cfg(0, 2, port)),
        Participant::init(cfg(1, 2, port)),
    );
    let mut p0 = p0.unwrap();
    let mut p1 = p1.unwrap();

    let (r0, r1) = tokio::join!(
        p0.validate_checked("A", "energy=1.0"),
        p1.validate_checked("A", "energy=1.001"),
    );

    match r0.unwrap() {
        RoundResult::Mismatch { local, peer } => {
            assert_eq!(local, "energy=1.0");
            assert_eq!(peer, "energy=1.001");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
    match r1.unwrap() {
        RoundResult::Mismatch { local, peer } => {
            assert_eq!(local, "energy=1.001");
            assert_eq!(peer, "energy=1.0");
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

/// Scenario 4: a late participant still resolves the barrier within the deadline.
#[tokio::test]
async fn late_participant_still_resolves() {
    let port = next_port();
    let (mut p0, mut p1) = tokio::join!(
        Participant::init(cfg(0, 2, port)),
        Participant::init(cfg(1, 2, port)),
    );
    let mut p0 = p0.unwrap();
    let mut p1 = p1.unwrap();

    let late = async {
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        p1.validate_checked("A", "energy=1.0").await
    };
    let (r0, r1) = tokio::join!(p0.validate_checked("A", "energy=1.0"), late);
    assert_eq!(r0.unwrap(), RoundResult::Match);
    assert_eq!(r1.unwrap(), RoundResult::Match);
}

/// Scenario 5: a lost participant causes the other to time out, without asserting.
#[tokio::test]
async fn lost_participant_times_out_without_aborting() {
    let port = next_port();
    let (mut p0, p1) = tokio::join!(
        Participant::init(cfg(0, 2, port)),
        Participant::init(cfg(1, 2, port)),
    );
    let mut p0 = p0.unwrap();
    let _p1 = p1.unwrap(); // registers, but never submits

    let result = p0.validate_checked("A", "energy=1.0").await.unwrap();
    assert_eq!(result, RoundResult::TimedOut);
}

/// Scenario 6: pre-checkpoint/resume tears down and rebuilds the whole topology; the
/// sync-point counter on both sides restarts, and a fresh barrier round still succeeds.
#[tokio::test]
async fn checkpoint_then_resume_rebuilds_topology() {
    let port = next_port();
    let (p0, p1) = tokio::join!(
        Participant::init(cfg(0, 2, port)),
        Participant::init(cfg(1, 2, port)),
    );
    let mut p0 = p0.unwrap();
    let mut p1 = p1.unwrap();

    let (r0, r1) = tokio::join!(
        p0.validate_checked("pre", "energy=1.0"),
        p1.validate_checked("pre", "energy=1.0"),
    );
    assert_eq!(r0.unwrap(), RoundResult::Match);
    assert_eq!(r1.unwrap(), RoundResult::Match);

    let port2 = next_port();
    let (saved0, saved1) = tokio::join!(pre_checkpoint(&mut p0), pre_checkpoint(&mut p1));

    let (p0, p1) = tokio::join!(
        resume(saved0, cfg(0, 2, port2)),
        resume(saved1, cfg(1, 2, port2)),
    );
    let mut p0 = p0.unwrap();
    let mut p1 = p1.unwrap();

    let (r0, r1) = tokio::join!(
        p0.validate_checked("post", "energy=2.0"),
        p1.validate_checked("post", "energy=2.0"),
    );
    assert_eq!(r0.unwrap(), RoundResult::Match);
    assert_eq!(r1.unwrap(), RoundResult::Match);
}

/// N == 1: every sync point is trivially a match; the broadcast is to the lone participant.
#[tokio::test]
async fn single_participant_trivially_matches() {
    let port = next_port();
    let mut p0 = Participant::init(cfg(0, 1, port)).await.unwrap();
    let result = p0.validate_checked("solo", "energy=42.0").await.unwrap();
    assert_eq!(result, RoundResult::Match);
}
