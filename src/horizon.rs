//! Horizon classification: bucketing obligations into display groups.
//!
//! This is the single bucketing implementation — every presentation surface
//! (CLI listing, HTTP `/horizon`) consumes [`classify`] rather than deriving
//! its own grouping. The evaluation instant is an explicit parameter.
//!
//! Day boundaries are computed from local-midnight-anchored dates, not raw
//! ±24h offsets: 23:59 today and 00:05 tomorrow land in different buckets.
//! The two-hour "now" window is checked before the today boundary, so an
//! obligation due shortly after local midnight still counts as "now".

use std::fmt;

use chrono::{DateTime, Days, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::obligation::{Obligation, Status};

/// Width of the "now" window in hours.
const NOW_WINDOW_HOURS: i64 = 2;

/// Days covered by the "this week" horizon, counted from today's midnight.
const WEEK_WINDOW_DAYS: u64 = 7;

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// One of the five display horizons, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    Missed,
    Now,
    Today,
    ThisWeek,
    Later,
}

impl Horizon {
    /// Human-facing heading.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Missed => "Missed",
            Self::Now => "Now",
            Self::Today => "Today",
            Self::ThisWeek => "This Week",
            Self::Later => "Later",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.heading())
    }
}

/// Bucket for a single obligation, or `None` for completed ones.
///
/// Rules are evaluated in priority order: a `missed` status wins regardless of
/// due-date recency, a past due instant is defensively re-bucketed as missed
/// even if the sweep has not run, and the two-hour window beats the today
/// boundary.
pub fn bucket_for(now: DateTime<FixedOffset>, obligation: &Obligation) -> Option<Horizon> {
    if obligation.status == Status::Missed {
        return Some(Horizon::Missed);
    }
    if obligation.status == Status::Done {
        return None;
    }

    let Some(due) = obligation.due_at else {
        return Some(Horizon::Later);
    };
    if due < now {
        return Some(Horizon::Missed);
    }

    if due - now < chrono::Duration::hours(NOW_WINDOW_HOURS) {
        return Some(Horizon::Now);
    }

    // Civil comparison in the observer's offset: a due date stored in another
    // offset is viewed through the evaluation instant's local calendar.
    let today: NaiveDate = now.naive_local().date();
    let due_date: NaiveDate = due.with_timezone(now.offset()).naive_local().date();

    if due_date < today + Days::new(1) {
        Some(Horizon::Today)
    } else if due_date < today + Days::new(WEEK_WINDOW_DAYS) {
        Some(Horizon::ThisWeek)
    } else {
        Some(Horizon::Later)
    }
}

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// The five ordered display sequences produced by [`classify`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HorizonView {
    pub missed: Vec<Obligation>,
    pub now: Vec<Obligation>,
    pub today: Vec<Obligation>,
    pub this_week: Vec<Obligation>,
    pub later: Vec<Obligation>,
}

impl HorizonView {
    /// Buckets in display order with their headings.
    pub fn sections(&self) -> [(Horizon, &[Obligation]); 5] {
        [
            (Horizon::Missed, self.missed.as_slice()),
            (Horizon::Now, self.now.as_slice()),
            (Horizon::Today, self.today.as_slice()),
            (Horizon::ThisWeek, self.this_week.as_slice()),
            (Horizon::Later, self.later.as_slice()),
        ]
    }

    /// Total obligations across all buckets.
    pub fn len(&self) -> usize {
        self.sections().iter().map(|(_, items)| items.len()).sum()
    }

    /// Whether every bucket is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, bucket: Horizon, obligation: Obligation) {
        match bucket {
            Horizon::Missed => self.missed.push(obligation),
            Horizon::Now => self.now.push(obligation),
            Horizon::Today => self.today.push(obligation),
            Horizon::ThisWeek => self.this_week.push(obligation),
            Horizon::Later => self.later.push(obligation),
        }
    }

    fn sort_buckets(&mut self) {
        for bucket in [
            &mut self.missed,
            &mut self.now,
            &mut self.today,
            &mut self.this_week,
            &mut self.later,
        ] {
            // Due ascending, undated last, id order for ties.
            bucket.sort_by_key(|o| (o.due_at.is_none(), o.due_at, o.id));
        }
    }
}

/// Partition a (post-sweep) obligation snapshot into the five horizons.
///
/// Every pending or missed obligation lands in exactly one bucket; done ones
/// are excluded. Within each bucket obligations sort by due instant ascending,
/// with undated obligations after all dated ones.
pub fn classify(now: DateTime<FixedOffset>, obligations: &[Obligation]) -> HorizonView {
    let mut view = HorizonView::default();
    for obligation in obligations {
        if let Some(bucket) = bucket_for(now, obligation) {
            view.push(bucket, obligation.clone());
        }
    }
    view.sort_buckets();
    view
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obligation::ObligationId;
    use chrono::Duration;

    fn instant(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn obligation(id: u64, due: Option<DateTime<FixedOffset>>, status: Status) -> Obligation {
        Obligation {
            id: ObligationId::new(id),
            title: format!("obligation {id}"),
            due_at: due,
            estimated_minutes: None,
            urgency: None,
            status,
            created_at: instant("2026-08-01T08:00:00+02:00"),
        }
    }

    // Thursday, mid-afternoon.
    fn eval_instant() -> DateTime<FixedOffset> {
        instant("2026-08-06T15:00:00+02:00")
    }

    #[test]
    fn status_rules_dominate() {
        let now = eval_instant();
        // missed status wins even with a future due date (manual edge).
        let future = obligation(1, Some(now + Duration::hours(50)), Status::Missed);
        assert_eq!(bucket_for(now, &future), Some(Horizon::Missed));

        let done = obligation(2, Some(now + Duration::minutes(30)), Status::Done);
        assert_eq!(bucket_for(now, &done), None);

        let undated = obligation(3, None, Status::Pending);
        assert_eq!(bucket_for(now, &undated), Some(Horizon::Later));
    }

    #[test]
    fn unswept_overdue_is_defensively_missed() {
        let now = eval_instant();
        let o = obligation(1, Some(now - Duration::minutes(1)), Status::Pending);
        assert_eq!(bucket_for(now, &o), Some(Horizon::Missed));
    }

    #[test]
    fn ninety_minutes_out_is_now() {
        let now = eval_instant();
        let o = obligation(1, Some(now + Duration::minutes(90)), Status::Pending);
        assert_eq!(bucket_for(now, &o), Some(Horizon::Now));
    }

    #[test]
    fn now_window_beats_today_boundary_after_midnight() {
        // 23:30 local; due 00:45 next day = 75 minutes out. The two-hour rule
        // is checked first, so this is Now even though the civil date is
        // tomorrow.
        let now = instant("2026-08-06T23:30:00+02:00");
        let o = obligation(
            1,
            Some(instant("2026-08-07T00:45:00+02:00")),
            Status::Pending,
        );
        assert_eq!(bucket_for(now, &o), Some(Horizon::Now));
    }

    #[test]
    fn late_tonight_vs_early_tomorrow() {
        let now = instant("2026-08-06T12:00:00+02:00");
        // 23:59 tonight: today.
        let tonight = obligation(
            1,
            Some(instant("2026-08-06T23:59:00+02:00")),
            Status::Pending,
        );
        // 09:05 tomorrow: outside both the 2h window and today's midnight.
        let tomorrow = obligation(
            2,
            Some(instant("2026-08-07T09:05:00+02:00")),
            Status::Pending,
        );
        assert_eq!(bucket_for(now, &tonight), Some(Horizon::Today));
        assert_eq!(bucket_for(now, &tomorrow), Some(Horizon::ThisWeek));
    }

    #[test]
    fn t_plus_25h_scenario() {
        // T = Thursday 15:00. T+30min is Now; T+25h lands Friday 16:00,
        // before midnight seven days out: this week.
        let now = eval_instant();
        let near = obligation(1, Some(now + Duration::minutes(30)), Status::Pending);
        let far = obligation(2, Some(now + Duration::hours(25)), Status::Pending);
        assert_eq!(bucket_for(now, &near), Some(Horizon::Now));
        assert_eq!(bucket_for(now, &far), Some(Horizon::ThisWeek));
    }

    #[test]
    fn week_boundary_is_midnight_anchored() {
        let now = eval_instant(); // Thu Aug 6
        // Aug 12 23:00 — within 7 days of today's midnight.
        let inside = obligation(
            1,
            Some(instant("2026-08-12T23:00:00+02:00")),
            Status::Pending,
        );
        // Aug 13 01:00 — the seventh midnight has passed.
        let outside = obligation(
            2,
            Some(instant("2026-08-13T01:00:00+02:00")),
            Status::Pending,
        );
        assert_eq!(bucket_for(now, &inside), Some(Horizon::ThisWeek));
        assert_eq!(bucket_for(now, &outside), Some(Horizon::Later));
    }

    #[test]
    fn due_in_foreign_offset_is_viewed_locally() {
        // Due stored as 20:00Z; observer at +02:00 sees 22:00 local, same
        // civil day: today (outside the 2h window).
        let now = instant("2026-08-06T12:00:00+02:00");
        let o = obligation(1, Some(instant("2026-08-06T20:00:00Z")), Status::Pending);
        assert_eq!(bucket_for(now, &o), Some(Horizon::Today));
    }

    #[test]
    fn classification_is_complete_and_disjoint() {
        let now = eval_instant();
        let items = vec![
            obligation(1, Some(now - Duration::hours(3)), Status::Missed),
            obligation(2, Some(now + Duration::minutes(45)), Status::Pending),
            obligation(3, Some(now + Duration::hours(6)), Status::Pending),
            obligation(4, Some(now + Duration::hours(60)), Status::Pending),
            obligation(5, Some(now + Duration::days(30)), Status::Pending),
            obligation(6, None, Status::Pending),
            obligation(7, Some(now + Duration::hours(1)), Status::Done),
        ];
        let view = classify(now, &items);

        // Every non-done obligation appears exactly once; done in none.
        assert_eq!(view.len(), 6);
        let mut seen: Vec<u64> = view
            .sections()
            .iter()
            .flat_map(|(_, items)| items.iter().map(|o| o.id.get()))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);

        assert_eq!(view.missed.len(), 1);
        assert_eq!(view.now.len(), 1);
        assert_eq!(view.today.len(), 1);
        assert_eq!(view.this_week.len(), 1);
        assert_eq!(view.later.len(), 2);
    }

    #[test]
    fn bucket_ordering_due_ascending_undated_last() {
        let now = eval_instant();
        let items = vec![
            obligation(1, None, Status::Pending),
            obligation(2, Some(now + Duration::days(30)), Status::Pending),
            obligation(3, Some(now + Duration::days(20)), Status::Pending),
            obligation(4, None, Status::Pending),
        ];
        let view = classify(now, &items);
        let later_ids: Vec<u64> = view.later.iter().map(|o| o.id.get()).collect();
        // Dated ascending first, then undated in id order.
        assert_eq!(later_ids, vec![3, 2, 1, 4]);
    }
}
