//! # xval — Cross-Instance Synchronized Validation Coordinator
//!
//! A small distributed rendezvous library used to verify, at runtime, that two or more
//! replicated copies of a deterministic computation reach identical intermediate states at
//! well-defined *sync points*. At each sync point every participant submits a compact
//! textual *fingerprint* of its local state; the coordinator waits until all participants
//! have arrived, compares their fingerprints with a numeric tolerance, and either
//! acknowledges a match or fails the validation with a detailed mismatch report.
//!
//! This crate is the validation protocol itself — the connection lifecycle, the
//! barrier-style rendezvous, the tolerant fingerprint comparator, and the
//! checkpoint-aware teardown/reinit hook. It does not compute fingerprints and performs no
//! scientific computation of its own; the caller (the hosted computation) owns both.
//!
//! ## Module Organization
//!
//! - [`config`] — environment-driven setup, validated before any socket opens.
//! - [`wire`] — the fixed-layout protocol record shared by every message type.
//! - [`fingerprint`] — the tolerant token-wise comparator.
//! - [`transport`] — TCP/Unix stream abstraction shared by coordinator and client.
//! - [`rendezvous`] — the coordinator-side barrier slot and round comparison.
//! - [`coordinator`] — the server event loop run inside instance 0.
//! - [`participant`] — the client state machine consumed by the hosted computation.
//! - [`checkpoint`] — the pre-checkpoint/resume/restart lifecycle hooks.
//! - [`error`] — the typed error taxonomy.
//!
//! ## Precondition
//!
//! All participants must call `validate` the same number of times in the same program
//! order; the sync-point id is each participant's local call ordinal, not anything carried
//! on the wire from the hosted computation's own logical state (§9 of the design notes).

pub mod checkpoint;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fingerprint;
pub mod participant;
pub mod rendezvous;
pub mod transport;
pub mod wire;

pub use config::{Config, TransportKind, MAX_INSTANCES};
pub use error::{CrossValidationError, Result};
pub use participant::{Participant, RoundResult};
