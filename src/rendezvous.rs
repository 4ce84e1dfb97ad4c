//! # Rendezvous Slot — Coordinator-Side Barrier State (§3, §4.4)
//!
//! Exactly one slot is live at a time (I1). It accumulates `(instance_id, fingerprint)`
//! arrivals for the current sync point (I2) and is reset whenever a submission arrives for a
//! sync-point id different from the live one — a consequence of the reference's assumption
//! that every participant walks the same sequence of sync-point ids in lockstep (§9).

use crate::fingerprint::fingerprints_match;

/// Outcome of a completed barrier round, independent of how a caller chooses to act on it.
/// Kept distinct from [`crate::error::CrossValidationError`] so a mismatch can be observed by
/// tests without a process abort (§4.3, §4.7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationOutcome {
    Match,
    Mismatch { details: String },
}

/// What happened to a single SYNC_POINT submission.
pub enum SlotState {
    /// Fewer than `n` distinct participants have arrived for this sync point so far.
    Accumulating { arrived: usize },
    /// The `n`th distinct participant arrived; the round is complete.
    Complete(Vec<(i32, String)>),
}

#[derive(Default)]
pub struct RendezvousSlot {
    sync_point: Option<u64>,
    arrivals: Vec<(i32, String)>,
}

impl RendezvousSlot {
    pub fn new() -> Self {
        RendezvousSlot::default()
    }

    /// Feed a SYNC_POINT submission into the slot (I1, I2).
    ///
    /// A submission whose `sync_point` differs from the live one starts a fresh round,
    /// discarding any partial accumulation — see the out-of-order caveat in §9.
    pub fn submit(&mut self, sync_point: u64, instance_id: i32, fingerprint: String, n: usize) -> SlotState {
        if self.sync_point != Some(sync_point) {
            self.sync_point = Some(sync_point);
            self.arrivals.clear();
        }
        if !self.arrivals.iter().any(|(id, _)| *id == instance_id) {
            self.arrivals.push((instance_id, fingerprint));
        }
        if self.arrivals.len() >= n {
            SlotState::Complete(std::mem::take(&mut self.arrivals))
        } else {
            SlotState::Accumulating {
                arrived: self.arrivals.len(),
            }
        }
    }

    pub fn current_sync_point(&self) -> Option<u64> {
        self.sync_point
    }
}

/// Compare all arrivals for a completed round against the first participant's fingerprint
/// (arrival order), per §4.4. Returns the first failing pair, if any.
pub fn compare_round(sync_point: u64, arrivals: &[(i32, String)]) -> ValidationOutcome {
    if arrivals.is_empty() {
        return ValidationOutcome::Match;
    }
    let (first_id, first_fp) = &arrivals[0];
    for (other_id, other_fp) in &arrivals[1..] {
        if !fingerprints_match(first_fp, other_fp) {
            return ValidationOutcome::Mismatch {
                details: format!(
                    "Sync point {sync_point}: Instance {first_id}='{first_fp}' vs Instance {other_id}='{other_fp}'"
                ),
            };
        }
    }
    ValidationOutcome::Match
}
