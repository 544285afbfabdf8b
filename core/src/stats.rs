//! Administrator dashboard figures.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::types::{Booking, BookingStatus, Venue, VenueId};

/// Approved-booking count for one venue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueBookingCount {
    /// Venue id.
    pub venue_id: VenueId,
    /// Venue name.
    pub venue_name: String,
    /// Approved bookings referencing the venue.
    pub approved: usize,
}

/// Summary shown on the administrator dashboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Number of venues.
    pub total_venues: usize,
    /// Bookings awaiting review.
    pub pending_approvals: usize,
    /// Approved bookings dated today or later.
    pub upcoming_approved: usize,
    /// All bookings ever submitted.
    pub total_bookings: usize,
    /// Approved bookings per existing venue, busiest first.
    pub approved_per_venue: Vec<VenueBookingCount>,
}

impl DashboardStats {
    /// Compute the figures from full venue and booking listings.
    #[must_use]
    pub fn compute(venues: &[Venue], bookings: &[Booking], today: NaiveDate) -> Self {
        let mut approved_by_venue: HashMap<VenueId, usize> = HashMap::new();
        let mut pending_approvals = 0;
        let mut upcoming_approved = 0;

        for booking in bookings {
            match booking.status {
                BookingStatus::Pending => pending_approvals += 1,
                BookingStatus::Approved => {
                    *approved_by_venue.entry(booking.venue_id).or_default() += 1;
                    if booking.date >= today {
                        upcoming_approved += 1;
                    }
                }
                BookingStatus::Rejected => {}
            }
        }

        let mut approved_per_venue: Vec<VenueBookingCount> = venues
            .iter()
            .map(|venue| VenueBookingCount {
                venue_id: venue.id,
                venue_name: venue.name.clone(),
                approved: approved_by_venue.get(&venue.id).copied().unwrap_or(0),
            })
            .collect();
        approved_per_venue.sort_by(|a, b| {
            b.approved
                .cmp(&a.approved)
                .then_with(|| a.venue_name.cmp(&b.venue_name))
        });

        Self {
            total_venues: venues.len(),
            pending_approvals,
            upcoming_approved,
            total_bookings: bookings.len(),
            approved_per_venue,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{BookingId, UserId};
    use chrono::Utc;

    fn booking(venue: &Venue, day: u32, status: BookingStatus) -> Booking {
        Booking {
            id: BookingId::new(),
            venue_id: venue.id,
            venue_name: venue.name.clone(),
            user_id: UserId::new("u"),
            user_email: "u@example.com".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            slot: "09:00-12:00".parse().unwrap(),
            purpose: "Talk".into(),
            attachment_url: None,
            status,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    #[test]
    fn counts_pending_upcoming_and_per_venue() {
        let hall = Venue::builder("Hall", 10).build(Utc::now());
        let annex = Venue::builder("Annex", 10).build(Utc::now());
        let bookings = vec![
            booking(&hall, 1, BookingStatus::Approved),
            booking(&hall, 10, BookingStatus::Approved),
            booking(&annex, 12, BookingStatus::Pending),
            booking(&annex, 12, BookingStatus::Rejected),
        ];

        let stats = DashboardStats::compute(
            &[annex.clone(), hall.clone()],
            &bookings,
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        );

        assert_eq!(stats.total_venues, 2);
        assert_eq!(stats.total_bookings, 4);
        assert_eq!(stats.pending_approvals, 1);
        assert_eq!(stats.upcoming_approved, 1);
        assert_eq!(stats.approved_per_venue[0].venue_id, hall.id);
        assert_eq!(stats.approved_per_venue[0].approved, 2);
        assert_eq!(stats.approved_per_venue[1].approved, 0);
    }
}
