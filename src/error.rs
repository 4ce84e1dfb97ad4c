//! Error taxonomy for the validation core (§4.7, §7 of the design).
//!
//! Transient transport conditions (`EINTR`, `WouldBlock`, partial reads/writes) are retried
//! inside [`crate::transport`] and never surface here. A fingerprint mismatch is *not* a
//! variant of this type — it is a [`crate::rendezvous::ValidationOutcome`] value, kept
//! distinct so tests can observe a mismatch without triggering a process abort.

#[derive(thiserror::Error, Debug)]
pub enum CrossValidationError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("connect attempts exhausted after {attempts} tries")]
    ConnectExhausted { attempts: u32 },
}

pub type Result<T> = std::result::Result<T, CrossValidationError>;
