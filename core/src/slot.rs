//! Time-of-day slots.
//!
//! A [`Slot`] is a half-open interval `[start, end)` on a single calendar day,
//! written on the wire and in the availability ledger as `HH:MM-HH:MM`
//! (zero-padded, 24-hour clock).
//!
//! Internally every time is a minute-of-day integer, so overlap checks never
//! depend on string formatting. The canonical string form is only produced at
//! the boundary ([`Display`](std::fmt::Display), serde).

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::ledger::AvailabilityLedger;

/// Errors produced when parsing slot times or slot intervals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotParseError {
    /// The value is not a zero-padded `HH:MM` time.
    #[error("invalid time '{0}': expected zero-padded HH:MM")]
    InvalidTime(String),

    /// The value is not a `HH:MM-HH:MM` interval.
    #[error("invalid time slot '{0}': expected HH:MM-HH:MM")]
    InvalidSlot(String),

    /// The interval does not end after it starts.
    #[error("time slot must end after it starts ({start}-{end})")]
    EmptyInterval {
        /// Start of the rejected interval.
        start: SlotTime,
        /// End of the rejected interval.
        end: SlotTime,
    },
}

// ============================================================================
// SlotTime
// ============================================================================

/// A time of day with minute precision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u16);

impl SlotTime {
    /// Minutes in one day.
    pub const MINUTES_PER_DAY: u16 = 24 * 60;

    /// Create a time from a minute-of-day value.
    ///
    /// # Errors
    ///
    /// Returns [`SlotParseError::InvalidTime`] when `minutes` is not below
    /// [`Self::MINUTES_PER_DAY`].
    pub fn from_minutes(minutes: u16) -> Result<Self, SlotParseError> {
        if minutes < Self::MINUTES_PER_DAY {
            Ok(Self(minutes))
        } else {
            Err(SlotParseError::InvalidTime(minutes.to_string()))
        }
    }

    /// Create a time from hours and minutes, if both are in range.
    #[must_use]
    pub const fn from_hm(hour: u16, minute: u16) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour * 60 + minute))
        } else {
            None
        }
    }

    /// Minutes since midnight.
    #[must_use]
    pub const fn minutes(self) -> u16 {
        self.0
    }

    /// Hour component (0-23).
    #[must_use]
    pub const fn hour(self) -> u16 {
        self.0 / 60
    }

    /// Minute component (0-59).
    #[must_use]
    pub const fn minute(self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for SlotTime {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SlotParseError::InvalidTime(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let [h1, h2, m1, m2] = digits.map(|d| u16::from(d - b'0'));
        Self::from_hm(h1 * 10 + h2, m1 * 10 + m2).ok_or_else(invalid)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Slot
// ============================================================================

/// A half-open `[start, end)` interval within one day.
///
/// Ordering is by `(start, end)`, which matches the lexicographic order of the
/// canonical `HH:MM-HH:MM` strings.
///
/// # Example
///
/// ```
/// use venue_booking_core::slot::Slot;
///
/// let morning: Slot = "09:00-12:00".parse().unwrap();
/// let lunch: Slot = "12:00-13:00".parse().unwrap();
/// assert!(!morning.overlaps(&lunch));
/// assert_eq!(morning.to_string(), "09:00-12:00");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    start: SlotTime,
    end: SlotTime,
}

impl Slot {
    /// Create a slot.
    ///
    /// # Errors
    ///
    /// Returns [`SlotParseError::EmptyInterval`] unless `start < end`.
    pub const fn new(start: SlotTime, end: SlotTime) -> Result<Self, SlotParseError> {
        if start.0 < end.0 {
            Ok(Self { start, end })
        } else {
            Err(SlotParseError::EmptyInterval { start, end })
        }
    }

    /// Build a slot from minute-of-day bounds known to be valid.
    const fn fixed(start: u16, end: u16) -> Self {
        Self {
            start: SlotTime(start),
            end: SlotTime(end),
        }
    }

    /// Inclusive start.
    #[must_use]
    pub const fn start(&self) -> SlotTime {
        self.start
    }

    /// Exclusive end.
    #[must_use]
    pub const fn end(&self) -> SlotTime {
        self.end
    }

    /// Length of the slot in minutes.
    #[must_use]
    pub const fn duration_minutes(&self) -> u16 {
        self.end.0 - self.start.0
    }

    /// Half-open overlap: `self.start < other.end && self.end > other.start`.
    ///
    /// Slots that only touch at a boundary do not overlap.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start.0 < other.end.0 && self.end.0 > other.start.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for Slot {
    type Err = SlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| SlotParseError::InvalidSlot(s.to_string()))?;
        let start: SlotTime = start
            .trim()
            .parse()
            .map_err(|_| SlotParseError::InvalidSlot(s.to_string()))?;
        let end: SlotTime = end
            .trim()
            .parse()
            .map_err(|_| SlotParseError::InvalidSlot(s.to_string()))?;
        Self::new(start, end)
    }
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SlotCatalog
// ============================================================================

/// The slots a venue offers on any given day.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotCatalog(Vec<Slot>);

impl SlotCatalog {
    /// Morning, lunch and afternoon blocks.
    pub const DEFAULT_SLOTS: [Slot; 3] = [
        Slot::fixed(9 * 60, 12 * 60),
        Slot::fixed(12 * 60, 13 * 60),
        Slot::fixed(14 * 60, 16 * 60),
    ];

    /// Create a catalog; slots are sorted and deduplicated.
    #[must_use]
    pub fn new(mut slots: Vec<Slot>) -> Self {
        slots.sort_unstable();
        slots.dedup();
        Self(slots)
    }

    /// All offered slots in chronological order.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.0
    }

    /// Whether `slot` is one of the offered slots.
    #[must_use]
    pub fn offers(&self, slot: &Slot) -> bool {
        self.0.binary_search(slot).is_ok()
    }

    /// Catalog slots that could still be granted on `date` given `ledger`.
    #[must_use]
    pub fn free_slots(&self, ledger: &AvailabilityLedger, date: NaiveDate) -> Vec<Slot> {
        self.0
            .iter()
            .filter(|slot| ledger.check(date, slot).is_ok())
            .copied()
            .collect()
    }
}

impl Default for SlotCatalog {
    fn default() -> Self {
        Self(Self::DEFAULT_SLOTS.to_vec())
    }
}

impl FromStr for SlotCatalog {
    type Err = SlotParseError;

    /// Parse a comma-separated list such as `09:00-12:00,14:00-16:00`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let slots = s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Slot>, _>>()?;
        if slots.is_empty() {
            return Err(SlotParseError::InvalidSlot(s.to_string()));
        }
        Ok(Self::new(slots))
    }
}
