//! Slot conflict checking.
//!
//! A candidate slot may be granted on a date only if it is neither already
//! present nor overlapping any slot booked on that same date.

use serde::Serialize;
use thiserror::Error;

use crate::slot::Slot;

/// Why a candidate slot cannot be granted.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotConflict {
    /// The exact slot is already booked.
    #[error("time slot {slot} is already booked")]
    DuplicateSlot {
        /// The requested slot.
        slot: Slot,
    },

    /// The slot overlaps an existing booking.
    #[error("time slot {candidate} overlaps with existing booking {existing}")]
    Overlap {
        /// The requested slot.
        candidate: Slot,
        /// The booked slot it collides with.
        existing: Slot,
    },
}

impl SlotConflict {
    /// Stable machine-readable name of the conflict kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DuplicateSlot { .. } => "duplicate_slot",
            Self::Overlap { .. } => "overlap",
        }
    }
}

/// Check `candidate` against the slots already booked on one date.
///
/// Exact duplicates are reported before overlaps. Entries that do not parse
/// as slots only take part in the duplicate check.
///
/// # Errors
///
/// Returns [`SlotConflict::DuplicateSlot`] or [`SlotConflict::Overlap`] (with
/// the first offending existing slot).
pub fn check_slot<S: AsRef<str>>(existing: &[S], candidate: &Slot) -> Result<(), SlotConflict> {
    let canonical = candidate.to_string();
    if existing.iter().any(|s| s.as_ref().trim() == canonical) {
        return Err(SlotConflict::DuplicateSlot { slot: *candidate });
    }

    let overlapping = existing
        .iter()
        .filter_map(|s| s.as_ref().parse::<Slot>().ok())
        .find(|booked| candidate.overlaps(booked));

    match overlapping {
        Some(existing) => Err(SlotConflict::Overlap {
            candidate: *candidate,
            existing,
        }),
        None => Ok(()),
    }
}
