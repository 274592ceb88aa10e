//! The obligation store: source of truth for the mutable collection.
//!
//! Two backends serve the single `load_all`/`save_all` persistence contract:
//!
//! - [`FileBackend`] — a JSON flat file, read in full and rewritten in full
//! - [`MemBackend`] — in-memory, for tests and ephemeral daemon mode
//!
//! [`ObligationStore`] composes a backend with the in-memory collection and
//! enforces the status state machine. Every mutation is durable before the
//! call returns: the store builds the next collection state, saves it, and
//! only then replaces its in-memory view. A failed save therefore leaves the
//! store exactly at the last successfully persisted state.

pub mod file;
pub mod mem;

pub use file::FileBackend;
pub use mem::MemBackend;

use chrono::{DateTime, FixedOffset};

use crate::error::{StoreError, StoreResult};
use crate::obligation::{status_for_due, Obligation, ObligationDraft, ObligationId, UpdatePatch};

/// Persistence capability: full-collection replace semantics.
///
/// Swapping the backing medium must not change store or classifier code —
/// the store only ever loads everything and saves everything.
pub trait StoreBackend: Send {
    /// Load the complete persisted collection.
    fn load_all(&self) -> StoreResult<Vec<Obligation>>;

    /// Replace the complete persisted collection.
    fn save_all(&mut self, obligations: &[Obligation]) -> StoreResult<()>;
}

/// Holds the obligation collection, enforces the lifecycle state machine, and
/// derives missed transitions on read.
pub struct ObligationStore {
    backend: Box<dyn StoreBackend>,
    obligations: Vec<Obligation>,
    next_id: u64,
}

impl ObligationStore {
    /// Open a store over the given backend, loading the persisted collection.
    ///
    /// Id allocation resumes past the highest persisted id.
    pub fn open(backend: Box<dyn StoreBackend>) -> StoreResult<Self> {
        let obligations = backend.load_all()?;
        let next_id = obligations.iter().map(|o| o.id.get()).max().unwrap_or(0) + 1;
        tracing::debug!(count = obligations.len(), next_id, "obligation store opened");
        Ok(Self {
            backend,
            obligations,
            next_id,
        })
    }

    /// Number of obligations.
    pub fn len(&self) -> usize {
        self.obligations.len()
    }

    /// Whether the store holds no obligations.
    pub fn is_empty(&self) -> bool {
        self.obligations.is_empty()
    }

    /// Look up one obligation without sweeping.
    pub fn get(&self, id: ObligationId) -> Option<&Obligation> {
        self.obligations.iter().find(|o| o.id == id)
    }

    /// The current snapshot in insertion order, without sweeping.
    pub fn snapshot(&self) -> &[Obligation] {
        &self.obligations
    }

    /// Add a new obligation in `pending` status.
    pub fn add(
        &mut self,
        draft: ObligationDraft,
        now: DateTime<FixedOffset>,
    ) -> StoreResult<Obligation> {
        draft.validate()?;
        let obligation = Obligation {
            id: ObligationId::new(self.next_id),
            title: draft.title.trim().to_string(),
            due_at: draft.due_at,
            estimated_minutes: draft.estimated_minutes,
            urgency: draft.urgency,
            status: crate::obligation::Status::Pending,
            created_at: now,
        };

        let mut next = self.obligations.clone();
        next.push(obligation.clone());
        self.commit(next)?;
        self.next_id += 1;
        tracing::debug!(id = %obligation.id, title = %obligation.title, "obligation added");
        Ok(obligation)
    }

    /// List all obligations in insertion order.
    ///
    /// Runs the missed-sweep first; any pending obligation whose due instant
    /// has passed becomes `missed`, and that mutation is persisted before the
    /// listing is returned.
    pub fn list_all(&mut self, now: DateTime<FixedOffset>) -> StoreResult<&[Obligation]> {
        let mut next = self.obligations.clone();
        let mut swept = 0usize;
        for obligation in &mut next {
            if obligation.apply_sweep(now) {
                tracing::debug!(id = %obligation.id, "obligation missed");
                swept += 1;
            }
        }
        if swept > 0 {
            self.commit(next)?;
        }
        Ok(&self.obligations)
    }

    /// Apply a partial field update, re-deriving status when the due date is
    /// among the changed fields and the obligation is not `done`.
    pub fn update(
        &mut self,
        id: ObligationId,
        patch: UpdatePatch,
        now: DateTime<FixedOffset>,
    ) -> StoreResult<Obligation> {
        let index = self.index_of(id)?;
        let mut next = self.obligations.clone();
        {
            let obligation = &mut next[index];
            if let Some(title) = patch.title {
                if title.trim().is_empty() {
                    return Err(StoreError::EmptyTitle);
                }
                obligation.title = title.trim().to_string();
            }
            if let Some(minutes) = patch.estimated_minutes {
                if minutes == Some(0) {
                    return Err(StoreError::InvalidDuration { minutes: 0 });
                }
                obligation.estimated_minutes = minutes;
            }
            if let Some(urgency) = patch.urgency {
                obligation.urgency = urgency;
            }
            if let Some(due_at) = patch.due_at {
                obligation.due_at = due_at;
                obligation.status = status_for_due(obligation.status, due_at, now);
            }
        }
        let updated = next[index].clone();
        self.commit(next)?;
        tracing::debug!(id = %updated.id, status = %updated.status, "obligation updated");
        Ok(updated)
    }

    /// Flip an obligation between `done` and `pending` (`missed` toggles to
    /// `done`; `done` returns to `pending`, never directly to `missed`).
    pub fn toggle_done(&mut self, id: ObligationId) -> StoreResult<Obligation> {
        let index = self.index_of(id)?;
        let mut next = self.obligations.clone();
        next[index].toggle();
        let toggled = next[index].clone();
        self.commit(next)?;
        tracing::debug!(id = %toggled.id, status = %toggled.status, "obligation toggled");
        Ok(toggled)
    }

    /// Remove one obligation, returning it.
    pub fn delete(&mut self, id: ObligationId) -> StoreResult<Obligation> {
        let index = self.index_of(id)?;
        let mut next = self.obligations.clone();
        let removed = next.remove(index);
        self.commit(next)?;
        tracing::debug!(id = %removed.id, "obligation deleted");
        Ok(removed)
    }

    /// Remove every obligation, returning how many were removed.
    pub fn clear_all(&mut self) -> StoreResult<usize> {
        let count = self.obligations.len();
        self.commit(Vec::new())?;
        tracing::info!(count, "obligations cleared");
        Ok(count)
    }

    fn index_of(&self, id: ObligationId) -> StoreResult<usize> {
        self.obligations
            .iter()
            .position(|o| o.id == id)
            .ok_or(StoreError::NotFound { id: id.get() })
    }

    // Persist-then-swap: the in-memory view only advances when the save
    // succeeded, so a persistence failure cannot leave memory ahead of disk.
    fn commit(&mut self, next: Vec<Obligation>) -> StoreResult<()> {
        self.backend.save_all(&next)?;
        self.obligations = next;
        Ok(())
    }
}

impl std::fmt::Debug for ObligationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObligationStore")
            .field("count", &self.obligations.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obligation::Status;
    use chrono::Duration;

    fn instant(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        instant("2026-08-06T15:00:00+02:00")
    }

    fn open_mem() -> ObligationStore {
        ObligationStore::open(Box::new(MemBackend::default())).unwrap()
    }

    /// Backend whose saves always fail, for divergence tests.
    struct FailingBackend;

    impl StoreBackend for FailingBackend {
        fn load_all(&self) -> StoreResult<Vec<Obligation>> {
            Ok(Vec::new())
        }
        fn save_all(&mut self, _obligations: &[Obligation]) -> StoreResult<()> {
            Err(StoreError::Serialization {
                message: "backend rejected the write".into(),
            })
        }
    }

    #[test]
    fn add_assigns_sequential_ids_and_pending_status() {
        let mut store = open_mem();
        let first = store.add(ObligationDraft::titled("a"), now()).unwrap();
        let second = store.add(ObligationDraft::titled("b"), now()).unwrap();
        assert_eq!(first.id.get() + 1, second.id.get());
        assert_eq!(first.status, Status::Pending);
        assert_eq!(first.created_at, now());
    }

    #[test]
    fn add_rejects_empty_title() {
        let mut store = open_mem();
        assert!(matches!(
            store.add(ObligationDraft::titled("   "), now()),
            Err(StoreError::EmptyTitle)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn missing_id_is_a_not_found_signal() {
        let mut store = open_mem();
        let ghost = ObligationId::new(99);
        assert!(matches!(
            store.toggle_done(ghost),
            Err(StoreError::NotFound { id: 99 })
        ));
        assert!(matches!(
            store.delete(ghost),
            Err(StoreError::NotFound { id: 99 })
        ));
        assert!(matches!(
            store.update(ghost, UpdatePatch::default(), now()),
            Err(StoreError::NotFound { id: 99 })
        ));
    }

    #[test]
    fn list_sweeps_overdue_pending() {
        let mut store = open_mem();
        let mut draft = ObligationDraft::titled("overdue");
        draft.due_at = Some(now() - Duration::hours(1));
        let added = store.add(draft, now() - Duration::hours(2)).unwrap();
        assert_eq!(added.status, Status::Pending);

        let listed = store.list_all(now()).unwrap();
        assert_eq!(listed[0].status, Status::Missed);
    }

    #[test]
    fn sweep_skips_done_and_undated() {
        let mut store = open_mem();
        let mut dated = ObligationDraft::titled("done long ago");
        dated.due_at = Some(now() - Duration::hours(3));
        let done = store.add(dated, now() - Duration::days(1)).unwrap();
        store.toggle_done(done.id).unwrap();
        store.add(ObligationDraft::titled("undated"), now()).unwrap();

        let listed = store.list_all(now()).unwrap();
        assert_eq!(listed[0].status, Status::Done);
        assert_eq!(listed[1].status, Status::Pending);
    }

    #[test]
    fn toggle_chain_missed_done_pending() {
        let mut store = open_mem();
        let mut draft = ObligationDraft::titled("late");
        draft.due_at = Some(now() - Duration::hours(1));
        let added = store.add(draft, now() - Duration::days(1)).unwrap();
        store.list_all(now()).unwrap();
        assert_eq!(store.get(added.id).unwrap().status, Status::Missed);

        assert_eq!(store.toggle_done(added.id).unwrap().status, Status::Done);
        // Back from done lands on pending even though the due date is past.
        assert_eq!(store.toggle_done(added.id).unwrap().status, Status::Pending);
        // The next listing pass re-derives missed afresh.
        store.list_all(now()).unwrap();
        assert_eq!(store.get(added.id).unwrap().status, Status::Missed);
    }

    #[test]
    fn due_edit_rederives_status() {
        let mut store = open_mem();
        let added = store.add(ObligationDraft::titled("shifting"), now()).unwrap();

        let to_past = UpdatePatch {
            due_at: Some(Some(now() - Duration::hours(2))),
            ..Default::default()
        };
        assert_eq!(
            store.update(added.id, to_past, now()).unwrap().status,
            Status::Missed
        );

        let to_future = UpdatePatch {
            due_at: Some(Some(now() + Duration::hours(2))),
            ..Default::default()
        };
        assert_eq!(
            store.update(added.id, to_future, now()).unwrap().status,
            Status::Pending
        );

        let cleared = UpdatePatch {
            due_at: Some(None),
            ..Default::default()
        };
        let updated = store.update(added.id, cleared, now()).unwrap();
        assert_eq!(updated.status, Status::Pending);
        assert!(updated.due_at.is_none());
    }

    #[test]
    fn due_edit_never_unsticks_done() {
        let mut store = open_mem();
        let added = store.add(ObligationDraft::titled("finished"), now()).unwrap();
        store.toggle_done(added.id).unwrap();

        let to_past = UpdatePatch {
            due_at: Some(Some(now() - Duration::hours(2))),
            ..Default::default()
        };
        assert_eq!(
            store.update(added.id, to_past, now()).unwrap().status,
            Status::Done
        );
    }

    #[test]
    fn delete_and_clear() {
        let mut store = open_mem();
        let a = store.add(ObligationDraft::titled("a"), now()).unwrap();
        store.add(ObligationDraft::titled("b"), now()).unwrap();

        let removed = store.delete(a.id).unwrap();
        assert_eq!(removed.id, a.id);
        assert_eq!(store.len(), 1);

        assert_eq!(store.clear_all().unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let mut store = open_mem();
        let a = store.add(ObligationDraft::titled("a"), now()).unwrap();
        store.delete(a.id).unwrap();
        let b = store.add(ObligationDraft::titled("b"), now()).unwrap();
        assert!(b.id.get() > a.id.get());
    }

    #[test]
    fn failed_save_leaves_memory_untouched() {
        let mut store = ObligationStore::open(Box::new(FailingBackend)).unwrap();
        let result = store.add(ObligationDraft::titled("doomed"), now());
        assert!(matches!(result, Err(StoreError::Serialization { .. })));
        assert!(store.is_empty(), "a failed save must not create an obligation");
    }
}
