//! Per-venue availability ledger.
//!
//! The ledger maps a calendar date (`YYYY-MM-DD`) to the ordered set of slots
//! already granted on that date. It is the only shared mutable resource in
//! the system and every mutation of a venue's availability goes through the
//! methods here.
//!
//! # Invariants
//!
//! - Every date key present has a non-empty slot list.
//! - Slot lists are sorted ascending and contain no duplicates.
//!
//! Both hold for any value built through this module, including values
//! deserialized from storage (see [`AvailabilityLedger::from_entries`]).
//!
//! Keys and slot strings are kept verbatim when they cannot be parsed, so
//! legacy records never make a read fail.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::conflict::{SlotConflict, check_slot};
use crate::slot::Slot;

/// Persisted shape of a ledger: date key to slot strings.
pub type LedgerEntries = BTreeMap<String, Vec<String>>;

/// Format a date the way ledger keys are written.
#[must_use]
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Booked slots of one venue, grouped by date.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LedgerEntries", into = "LedgerEntries")]
pub struct AvailabilityLedger {
    entries: LedgerEntries,
}

impl AvailabilityLedger {
    /// An empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a ledger from raw stored entries, restoring the invariants.
    ///
    /// Keys that parse as dates are rewritten as `YYYY-MM-DD`, merging any
    /// lists that land on the same day. Parseable slots are rewritten in
    /// canonical form, each list is sorted and deduplicated, and dates with
    /// no slots are dropped.
    #[must_use]
    pub fn from_entries(entries: LedgerEntries) -> Self {
        let mut merged = LedgerEntries::new();
        for (key, slots) in entries {
            let key = parse_date_key(&key).map_or(key, date_key);
            merged
                .entry(key)
                .or_default()
                .extend(slots.into_iter().map(canonical_slot).filter(|slot| !slot.is_empty()));
        }
        merged.retain(|_, slots| {
            slots.sort();
            slots.dedup();
            !slots.is_empty()
        });
        Self { entries: merged }
    }

    /// True iff no date keys remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of booked slots across all dates.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Date keys in ascending order.
    pub fn dates(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Slots booked on `date`, sorted ascending.
    #[must_use]
    pub fn slots_on(&self, date: NaiveDate) -> &[String] {
        self.entries
            .get(&date_key(date))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Whether `slot` is booked on `date`.
    #[must_use]
    pub fn contains(&self, date: NaiveDate, slot: &Slot) -> bool {
        let canonical = slot.to_string();
        self.slots_on(date).iter().any(|s| *s == canonical)
    }

    /// Borrow the raw entries.
    #[must_use]
    pub const fn entries(&self) -> &LedgerEntries {
        &self.entries
    }

    /// Check whether `candidate` may be granted on `date`.
    ///
    /// # Errors
    ///
    /// Returns the [`SlotConflict`] found against the slots already booked on
    /// that date. Other dates are never consulted.
    pub fn check(&self, date: NaiveDate, candidate: &Slot) -> Result<(), SlotConflict> {
        check_slot(self.slots_on(date), candidate)
    }

    /// Remove every date strictly before `today`.
    ///
    /// Keys are compared as dates. A key that is not a date falls back to a
    /// string comparison with `today` in `YYYY-MM-DD` form.
    ///
    /// Returns `true` when anything was removed, which is the caller's cue to
    /// persist the ledger.
    pub fn prune_expired(&mut self, today: NaiveDate) -> bool {
        let today_key = date_key(today);
        let before = self.entries.len();
        self.entries
            .retain(|key, _| !is_expired(key, today, &today_key));
        self.entries.len() != before
    }

    /// Insert `slot` on `date`, keeping the date's list sorted.
    ///
    /// Callers run [`check`](Self::check) first; inserting a slot that is
    /// already present leaves the ledger unchanged.
    pub fn add_slot(&mut self, date: NaiveDate, slot: &Slot) {
        let canonical = slot.to_string();
        let slots = self.entries.entry(date_key(date)).or_default();
        if !slots.contains(&canonical) {
            slots.push(canonical);
            slots.sort();
        }
    }

    /// Remove `slot` from `date`, dropping the date once it has no slots.
    ///
    /// Removing an absent slot is a no-op. Returns whether a slot was removed.
    pub fn remove_slot(&mut self, date: NaiveDate, slot: &Slot) -> bool {
        let key = date_key(date);
        let Some(slots) = self.entries.get_mut(&key) else {
            return false;
        };
        let canonical = slot.to_string();
        let before = slots.len();
        slots.retain(|s| *s != canonical);
        let removed = slots.len() != before;
        if slots.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }
}

fn canonical_slot(raw: String) -> String {
    raw.parse::<Slot>()
        .map_or_else(|_| raw.trim().to_string(), |slot| slot.to_string())
}

fn is_expired(key: &str, today: NaiveDate, today_key: &str) -> bool {
    parse_date_key(key).map_or_else(|| key < today_key, |date| date < today)
}

/// Accepts plain dates and full RFC 3339 timestamps.
fn parse_date_key(key: &str) -> Option<NaiveDate> {
    let key = key.trim();
    NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(key).ok().map(|dt| dt.date_naive()))
}

impl From<LedgerEntries> for AvailabilityLedger {
    fn from(entries: LedgerEntries) -> Self {
        Self::from_entries(entries)
    }
}

impl From<AvailabilityLedger> for LedgerEntries {
    fn from(ledger: AvailabilityLedger) -> Self {
        ledger.entries
    }
}
