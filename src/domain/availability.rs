//! Spot availability predicates
//!
//! Pure functions shared by reservation creation, booking creation and the
//! immediate-start path. Repositories call them inside the same database
//! transaction that performs the subsequent insert, so the check and the
//! write commit together.

use chrono::{DateTime, Utc};

use super::station::ChargingSpot;

/// Half-open time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `end <= other.start || start >= other.end` is the non-overlap condition.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }

    pub fn is_well_formed(&self) -> bool {
        self.end > self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Anything that holds a spot for a time window (reservations, bookings).
pub trait SlotHolder {
    fn window(&self) -> TimeWindow;

    /// Whether this record still blocks the window (i.e. is not terminal).
    fn holds_slot(&self) -> bool;
}

/// True iff none of `existing` that still hold their slot overlaps `requested`.
pub fn is_slot_available<'a, H, I>(existing: I, requested: &TimeWindow) -> bool
where
    H: SlotHolder + 'a,
    I: IntoIterator<Item = &'a H>,
{
    existing
        .into_iter()
        .filter(|h| h.holds_slot())
        .all(|h| !h.window().overlaps(requested))
}

/// True iff none of `existing` that still hold their slot covers `instant`.
pub fn is_free_at<'a, H, I>(existing: I, instant: DateTime<Utc>) -> bool
where
    H: SlotHolder + 'a,
    I: IntoIterator<Item = &'a H>,
{
    existing
        .into_iter()
        .filter(|h| h.holds_slot())
        .all(|h| !h.window().contains(instant))
}

/// True iff the spot is Available and has no session in progress.
pub fn can_start_immediately(spot: &ChargingSpot, in_progress_sessions: usize) -> bool {
    spot.is_available() && in_progress_sessions == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::station::SpotStatus;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap()
    }

    struct Hold {
        window: TimeWindow,
        live: bool,
    }

    impl SlotHolder for Hold {
        fn window(&self) -> TimeWindow {
            self.window
        }
        fn holds_slot(&self) -> bool {
            self.live
        }
    }

    #[test]
    fn half_open_boundary_does_not_overlap() {
        let a = TimeWindow::new(at(10), at(12));
        let b = TimeWindow::new(at(12), at(13));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn partial_overlap_is_detected_both_ways() {
        let a = TimeWindow::new(at(10), at(12));
        let b = TimeWindow::new(at(11), at(13));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn containment_overlaps() {
        let outer = TimeWindow::new(at(9), at(15));
        let inner = TimeWindow::new(at(10), at(11));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn terminal_holders_are_ignored() {
        let existing = vec![
            Hold {
                window: TimeWindow::new(at(10), at(12)),
                live: false,
            },
            Hold {
                window: TimeWindow::new(at(14), at(16)),
                live: true,
            },
        ];
        assert!(is_slot_available(&existing, &TimeWindow::new(at(11), at(13))));
        assert!(!is_slot_available(&existing, &TimeWindow::new(at(15), at(17))));
    }

    #[test]
    fn empty_schedule_is_free() {
        let none: Vec<Hold> = Vec::new();
        let w = TimeWindow::new(at(1), at(1) + Duration::minutes(30));
        assert!(is_slot_available(&none, &w));
        assert!(is_free_at(&none, at(1)));
    }

    #[test]
    fn walk_in_instant_respects_half_open_holds() {
        let existing = vec![
            Hold {
                window: TimeWindow::new(at(10), at(12)),
                live: true,
            },
            Hold {
                window: TimeWindow::new(at(13), at(14)),
                live: false,
            },
        ];
        assert!(!is_free_at(&existing, at(10)));
        assert!(!is_free_at(&existing, at(11)));
        assert!(is_free_at(&existing, at(12)));
        assert!(is_free_at(&existing, at(13)));
        assert!(is_free_at(&existing, at(9)));
    }

    #[test]
    fn immediate_start_requires_available_and_idle() {
        let mut spot = ChargingSpot::new(Uuid::new_v4(), "A-01", 3500.0);
        assert!(can_start_immediately(&spot, 0));
        assert!(!can_start_immediately(&spot, 1));
        spot.status = SpotStatus::Maintenance;
        assert!(!can_start_immediately(&spot, 0));
    }

    #[test]
    fn inverted_window_is_not_well_formed() {
        assert!(!TimeWindow::new(at(12), at(10)).is_well_formed());
        assert!(!TimeWindow::new(at(10), at(10)).is_well_formed());
        assert!(TimeWindow::new(at(10), at(11)).is_well_formed());
    }
}
