//! The obligation record and its status lifecycle.
//!
//! An obligation is a free-text task with an optional due instant. Status moves
//! through `pending` → `done`/`missed`; `done` is sticky with respect to time
//! (the missed-sweep never overwrites it), and `missed` is only reachable while
//! a past due instant is present. Timestamps carry an explicit UTC offset and
//! serialize as RFC 3339, so a round-trip through the API or the flat file
//! never reinterprets them through a different offset.

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Identifier
// ---------------------------------------------------------------------------

/// Opaque obligation identifier. Assigned at creation, monotonically
/// increasing for the lifetime of a store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObligationId(u64);

impl ObligationId {
    /// Wrap a raw id value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObligationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of an obligation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Open, not yet due (or undated).
    Pending,
    /// Explicitly completed. Never auto-overwritten by the sweep.
    Done,
    /// Due instant has passed without completion.
    Missed,
}

impl Status {
    /// Serialize to a short label.
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Missed => "missed",
        }
    }

    /// Parse from label (case-insensitive).
    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "done" => Some(Self::Done),
            "missed" => Some(Self::Missed),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// How urgently the obligation was phrased at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Immediate,
    Normal,
}

impl Urgency {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Normal => "normal",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "immediate" => Some(Self::Immediate),
            "normal" => Some(Self::Normal),
            _ => None,
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

// ---------------------------------------------------------------------------
// Obligation
// ---------------------------------------------------------------------------

/// A tracked obligation. The sole persistent entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obligation {
    /// Unique identifier, immutable after creation.
    pub id: ObligationId,
    /// Non-empty display title.
    pub title: String,
    /// Optional due instant, with explicit UTC offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<FixedOffset>>,
    /// Optional estimated duration in minutes (positive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Optional urgency hint from extraction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
    /// Lifecycle status.
    pub status: Status,
    /// Creation instant, immutable.
    pub created_at: DateTime<FixedOffset>,
}

impl Obligation {
    /// Whether the due instant is present and strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<FixedOffset>) -> bool {
        self.due_at.is_some_and(|due| due < now)
    }

    /// The missed-sweep step: a pending obligation whose due instant has
    /// passed becomes missed. Returns whether the status changed. `done` is
    /// never touched, and an undated obligation can never become missed.
    pub fn apply_sweep(&mut self, now: DateTime<FixedOffset>) -> bool {
        if self.status == Status::Pending && self.is_overdue(now) {
            self.status = Status::Missed;
            true
        } else {
            false
        }
    }

    /// Flip completion: `done` returns to `pending` (the next sweep re-derives
    /// `missed` if the due date is still past); anything else becomes `done`.
    pub fn toggle(&mut self) -> Status {
        self.status = match self.status {
            Status::Done => Status::Pending,
            Status::Pending | Status::Missed => Status::Done,
        };
        self.status
    }
}

/// Status implied by a due-date edit, per the lifecycle table.
///
/// `done` is left alone. Otherwise: a future or absent due instant lands on
/// `pending`, a past one on `missed`. An explicitly cleared due date and one
/// that was never set are indistinguishable here — both mean `pending`.
pub fn status_for_due(
    current: Status,
    due_at: Option<DateTime<FixedOffset>>,
    now: DateTime<FixedOffset>,
) -> Status {
    if current == Status::Done {
        return Status::Done;
    }
    match due_at {
        Some(due) if due < now => Status::Missed,
        _ => Status::Pending,
    }
}

// ---------------------------------------------------------------------------
// Draft & patch
// ---------------------------------------------------------------------------

/// Candidate obligation accepted by `add`: everything the caller may set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObligationDraft {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<Urgency>,
}

impl ObligationDraft {
    /// A draft carrying only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Reject empty titles (after trimming) and zero durations.
    pub fn validate(&self) -> StoreResult<()> {
        if self.title.trim().is_empty() {
            return Err(StoreError::EmptyTitle);
        }
        if self.estimated_minutes == Some(0) {
            return Err(StoreError::InvalidDuration { minutes: 0 });
        }
        Ok(())
    }
}

/// Partial field update. A `None` field is untouched; `Some(None)` on a
/// double-option field explicitly clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_at: Option<Option<DateTime<FixedOffset>>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_minutes: Option<Option<u32>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub urgency: Option<Option<Urgency>>,
}

impl UpdatePatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.due_at.is_none()
            && self.estimated_minutes.is_none()
            && self.urgency.is_none()
    }
}

// A present-but-null JSON field must deserialize to `Some(None)` (clear), while
// an absent field stays `None` (untouched) via `#[serde(default)]`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn obligation(due: Option<&str>, status: Status) -> Obligation {
        Obligation {
            id: ObligationId::new(1),
            title: "call the tax office".into(),
            due_at: due.map(instant),
            estimated_minutes: None,
            urgency: None,
            status,
            created_at: instant("2026-08-01T08:00:00+02:00"),
        }
    }

    #[test]
    fn sweep_promotes_overdue_pending() {
        let now = instant("2026-08-06T12:00:00+02:00");
        let mut o = obligation(Some("2026-08-06T09:00:00+02:00"), Status::Pending);
        assert!(o.apply_sweep(now));
        assert_eq!(o.status, Status::Missed);
    }

    #[test]
    fn sweep_never_touches_done() {
        let now = instant("2026-08-06T12:00:00+02:00");
        let mut o = obligation(Some("2026-08-06T09:00:00+02:00"), Status::Done);
        assert!(!o.apply_sweep(now));
        assert_eq!(o.status, Status::Done);
    }

    #[test]
    fn undated_obligation_never_missed() {
        let now = instant("2026-08-06T12:00:00+02:00");
        let mut o = obligation(None, Status::Pending);
        assert!(!o.apply_sweep(now));
        assert_eq!(o.status, Status::Pending);
    }

    #[test]
    fn toggle_cycle_from_missed_lands_on_pending() {
        let mut o = obligation(Some("2026-08-06T09:00:00+02:00"), Status::Missed);
        assert_eq!(o.toggle(), Status::Done);
        // Back from done: pending, not missed — the sweep re-derives later.
        assert_eq!(o.toggle(), Status::Pending);
    }

    #[test]
    fn due_edit_status_table() {
        let now = instant("2026-08-06T12:00:00+02:00");
        let future = Some(instant("2026-08-07T12:00:00+02:00"));
        let past = Some(instant("2026-08-05T12:00:00+02:00"));

        assert_eq!(status_for_due(Status::Pending, future, now), Status::Pending);
        assert_eq!(status_for_due(Status::Missed, future, now), Status::Pending);
        assert_eq!(status_for_due(Status::Pending, past, now), Status::Missed);
        assert_eq!(status_for_due(Status::Missed, None, now), Status::Pending);
        // done is sticky against due-date edits.
        assert_eq!(status_for_due(Status::Done, past, now), Status::Done);
        assert_eq!(status_for_due(Status::Done, None, now), Status::Done);
    }

    #[test]
    fn comparison_respects_offsets() {
        // 09:00+02:00 and 07:00Z are the same instant.
        let now = instant("2026-08-06T07:00:01Z");
        let o = obligation(Some("2026-08-06T09:00:00+02:00"), Status::Pending);
        assert!(o.is_overdue(now));

        // One second earlier it is not yet due.
        let just_before = instant("2026-08-06T06:59:59Z");
        assert!(!o.is_overdue(just_before));
    }

    #[test]
    fn draft_validation() {
        assert!(ObligationDraft::titled("  ").validate().is_err());
        assert!(ObligationDraft::titled("water the plants").validate().is_ok());
        let mut d = ObligationDraft::titled("x");
        d.estimated_minutes = Some(0);
        assert!(d.validate().is_err());
    }

    #[test]
    fn rfc3339_round_trip_keeps_offset() {
        let o = obligation(Some("2026-08-06T09:00:00+05:30"), Status::Pending);
        let json = serde_json::to_string(&o).unwrap();
        assert!(json.contains("+05:30"), "offset must be explicit: {json}");
        let back: Obligation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, o);
        assert_eq!(back.due_at.unwrap().offset().local_minus_utc(), 5 * 3600 + 1800);
    }

    #[test]
    fn patch_distinguishes_clear_from_untouched() {
        let untouched: UpdatePatch = serde_json::from_str(r#"{"title":"new"}"#).unwrap();
        assert!(untouched.due_at.is_none());

        let cleared: UpdatePatch = serde_json::from_str(r#"{"due_at":null}"#).unwrap();
        assert_eq!(cleared.due_at, Some(None));

        let set: UpdatePatch =
            serde_json::from_str(r#"{"due_at":"2026-08-06T09:00:00+02:00"}"#).unwrap();
        assert!(matches!(set.due_at, Some(Some(_))));
    }
}
