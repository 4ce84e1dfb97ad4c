//! # Wire Message — Fixed-Layout Protocol Record (§4.1)
//!
//! One record type carries all coordinator/participant communication. The layout is fixed
//! width: both peers read and write exactly [`Message::WIRE_SIZE`] bytes, so framing never
//! needs a length prefix beyond the two internal variable-length fields. Partial reads/writes,
//! `EINTR`, and `WouldBlock` are the normal case for a raw socket; `tokio::io::AsyncReadExt::
//! read_exact` / `AsyncWriteExt::write_all` absorb all of that looping for us, so no retry logic
//! appears here.

use crate::error::{CrossValidationError, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Maximum fingerprint payload, matching the reference's 255-byte bound.
pub const FINGERPRINT_CAP: usize = 255;
/// Maximum mismatch-details payload (human-readable string or peer fingerprint echo).
pub const MISMATCH_CAP: usize = 512;

const TYPE_LEN: usize = 1;
const INSTANCE_ID_LEN: usize = 4;
const SYNC_POINT_LEN: usize = 8;
const FP_LEN_PREFIX: usize = 2;
const PASSED_LEN: usize = 1;
const MISMATCH_LEN_PREFIX: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Register = 0,
    SyncPoint = 1,
    ValidationResult = 2,
    Shutdown = 3,
}

impl MessageType {
    fn from_u8(b: u8) -> Result<Self> {
        match b {
            0 => Ok(MessageType::Register),
            1 => Ok(MessageType::SyncPoint),
            2 => Ok(MessageType::ValidationResult),
            3 => Ok(MessageType::Shutdown),
            other => Err(CrossValidationError::Transport(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown wire message type {other}"),
            ))),
        }
    }
}

/// The coordinator's own id, used in the `instance_id` field when it is the sender.
pub const COORDINATOR_SENTINEL: i32 = -1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub msg_type: MessageType,
    pub instance_id: i32,
    pub sync_point: u64,
    pub fingerprint: String,
    pub validation_passed: bool,
    pub mismatch_details: String,
}

impl Message {
    pub const WIRE_SIZE: usize = TYPE_LEN
        + INSTANCE_ID_LEN
        + SYNC_POINT_LEN
        + FP_LEN_PREFIX
        + FINGERPRINT_CAP
        + PASSED_LEN
        + MISMATCH_LEN_PREFIX
        + MISMATCH_CAP;

    pub fn register(instance_id: i32) -> Self {
        Message {
            msg_type: MessageType::Register,
            instance_id,
            sync_point: 0,
            fingerprint: String::new(),
            validation_passed: false,
            mismatch_details: String::new(),
        }
    }

    pub fn sync_point(instance_id: i32, sync_point: u64, fingerprint: String) -> Self {
        Message {
            msg_type: MessageType::SyncPoint,
            instance_id,
            sync_point,
            fingerprint,
            validation_passed: false,
            mismatch_details: String::new(),
        }
    }

    pub fn validation_result(
        sync_point: u64,
        validation_passed: bool,
        mismatch_details: String,
    ) -> Self {
        Message {
            msg_type: MessageType::ValidationResult,
            instance_id: COORDINATOR_SENTINEL,
            sync_point,
            fingerprint: String::new(),
            validation_passed,
            mismatch_details,
        }
    }

    pub fn shutdown(instance_id: i32) -> Self {
        Message {
            msg_type: MessageType::Shutdown,
            instance_id,
            sync_point: 0,
            fingerprint: String::new(),
            validation_passed: false,
            mismatch_details: String::new(),
        }
    }

    pub(crate) fn to_bytes(&self) -> Result<[u8; Message::WIRE_SIZE]> {
        let mut buf = [0u8; Message::WIRE_SIZE];
        let mut off = 0;

        buf[off] = self.msg_type as u8;
        off += TYPE_LEN;

        buf[off..off + INSTANCE_ID_LEN].copy_from_slice(&self.instance_id.to_be_bytes());
        off += INSTANCE_ID_LEN;

        buf[off..off + SYNC_POINT_LEN].copy_from_slice(&self.sync_point.to_be_bytes());
        off += SYNC_POINT_LEN;

        off = write_field(&mut buf, off, self.fingerprint.as_bytes(), FINGERPRINT_CAP, "fingerprint")?;

        buf[off] = self.validation_passed as u8;
        off += PASSED_LEN;

        write_field(
            &mut buf,
            off,
            self.mismatch_details.as_bytes(),
            MISMATCH_CAP,
            "mismatch_details",
        )?;

        Ok(buf)
    }

    pub(crate) fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut off = 0;
        let msg_type = MessageType::from_u8(buf[off])?;
        off += TYPE_LEN;

        let instance_id = i32::from_be_bytes(buf[off..off + INSTANCE_ID_LEN].try_into().unwrap());
        off += INSTANCE_ID_LEN;

        let sync_point = u64::from_be_bytes(buf[off..off + SYNC_POINT_LEN].try_into().unwrap());
        off += SYNC_POINT_LEN;

        let (fingerprint, new_off) = read_field(buf, off, FINGERPRINT_CAP)?;
        off = new_off;

        let validation_passed = buf[off] != 0;
        off += PASSED_LEN;

        let (mismatch_details, _) = read_field(buf, off, MISMATCH_CAP)?;

        Ok(Message {
            msg_type,
            instance_id,
            sync_point,
            fingerprint,
            validation_passed,
            mismatch_details,
        })
    }

    pub async fn write<W: tokio::io::AsyncWrite + Unpin>(&self, w: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        w.write_all(&bytes).await?;
        Ok(())
    }

    pub async fn read<R: tokio::io::AsyncRead + Unpin>(r: &mut R) -> Result<Self> {
        let mut buf = [0u8; Message::WIRE_SIZE];
        r.read_exact(&mut buf).await?;
        Message::from_bytes(&buf)
    }
}

fn write_field(
    buf: &mut [u8],
    off: usize,
    data: &[u8],
    cap: usize,
    field_name: &str,
) -> Result<usize> {
    if data.len() > cap {
        return Err(CrossValidationError::Config(format!(
            "{field_name} length {} exceeds cap {cap}",
            data.len()
        )));
    }
    buf[off..off + 2].copy_from_slice(&(data.len() as u16).to_be_bytes());
    buf[off + 2..off + 2 + data.len()].copy_from_slice(data);
    Ok(off + 2 + cap)
}

fn read_field(buf: &[u8], off: usize, cap: usize) -> Result<(String, usize)> {
    let len = u16::from_be_bytes(buf[off..off + 2].try_into().unwrap()) as usize;
    let len = len.min(cap);
    let s = String::from_utf8_lossy(&buf[off + 2..off + 2 + len]).into_owned();
    Ok((s, off + 2 + cap))
}
