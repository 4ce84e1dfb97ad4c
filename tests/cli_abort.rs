//! Process-level tests for (P4): after a fingerprint mismatch, every participant process
//! exits with a nonzero status. These drive the real `cross-validate` binary as separate OS
//! processes (exactly how the protocol is deployed), so the abort path in
//! `Participant::validate` can be exercised without killing the test harness itself.

use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU16, Ordering};

static NEXT_PORT: AtomicU16 = AtomicU16::new(29000);

fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::Relaxed)
}

fn binary() -> &'static str {
    env!("CARGO_BIN_EXE_cross-validate")
}

fn spawn(instance_id: u32, num_instances: u32, port: u16, fingerprints: &[&str]) -> std::process::Child {
    let mut cmd = Command::new(binary());
    cmd.arg("run")
        .arg("--instance-id")
        .arg(instance_id.to_string())
        .arg("--num-instances")
        .arg(num_instances.to_string())
        .arg("--server-port")
        .arg(port.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    for fp in fingerprints {
        cmd.arg("--fingerprint").arg(fp);
    }
    cmd.spawn().expect("failed to spawn cross-validate")
}

#[test]
fn matching_fingerprints_both_exit_zero() {
    let port = next_port();
    let mut c0 = spawn(0, 2, port, &["energy=1.0"]);
    let mut c1 = spawn(1, 2, port, &["energy=1.0"]);

    let s0 = c0.wait().unwrap();
    let s1 = c1.wait().unwrap();
    assert!(s0.success(), "instance 0 should exit cleanly on a match");
    assert!(s1.success(), "instance 1 should exit cleanly on a match");
}

#[test]
fn mismatched_fingerprints_both_exit_nonzero() {
    let port = next_port();
    let mut c0 = spawn(0, 2, port, &["energy=1.0"]);
    let mut c1 = spawn(1, 2, port, &["energy=1.001"]);

    let s0 = c0.wait().unwrap();
    let s1 = c1.wait().unwrap();
    assert!(!s0.success(), "instance 0 should abort on a mismatch");
    assert!(!s1.success(), "instance 1 should abort on a mismatch");
}
