//! Tracker facade: top-level API for the pensum system.
//!
//! The `Tracker` owns the obligation store and exposes the full operation
//! surface consumed by the CLI and the daemon: lifecycle mutations, the
//! post-sweep horizon view, and the capture/clarify flow that turns free text
//! into committed obligations.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::PensumResult;
use crate::extract::{self, Extraction, Extractor};
use crate::horizon::{self, HorizonView};
use crate::obligation::{Obligation, ObligationDraft, ObligationId, Status, UpdatePatch};
use crate::store::{FileBackend, MemBackend, ObligationStore, StoreBackend};

/// Configuration for the tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    /// Path of the obligation collection file. `None` for memory-only mode.
    pub data_path: Option<PathBuf>,
}

/// Outcome of a capture attempt.
///
/// `NeedsClarification` is the recoverable "no confident date" outcome: the
/// obligation is not committed, and the caller re-prompts for a date phrase to
/// feed into [`Tracker::clarify`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CaptureOutcome {
    /// The obligation was committed.
    Added { obligation: Obligation },
    /// The extraction was not confident enough; nothing was committed.
    NeedsClarification { draft: ObligationDraft },
}

/// The pensum obligation tracker.
pub struct Tracker {
    store: ObligationStore,
    data_path: Option<PathBuf>,
}

impl Tracker {
    /// Create a tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> PensumResult<Self> {
        let backend: Box<dyn StoreBackend> = match &config.data_path {
            Some(path) => Box::new(FileBackend::new(path.clone())),
            None => Box::new(MemBackend::new()),
        };
        tracing::info!(
            persistent = config.data_path.is_some(),
            path = ?config.data_path,
            "initializing pensum tracker"
        );
        Ok(Self {
            store: ObligationStore::open(backend)?,
            data_path: config.data_path,
        })
    }

    /// Create a tracker over an explicit backend (tests, daemon seeding).
    pub fn with_backend(backend: Box<dyn StoreBackend>) -> PensumResult<Self> {
        Ok(Self {
            store: ObligationStore::open(backend)?,
            data_path: None,
        })
    }

    // ── Lifecycle operations ─────────────────────────────────────────

    /// Add a validated draft as a new pending obligation.
    pub fn add(
        &mut self,
        draft: ObligationDraft,
        now: DateTime<FixedOffset>,
    ) -> PensumResult<Obligation> {
        Ok(self.store.add(draft, now)?)
    }

    /// All obligations in insertion order, after the missed-sweep.
    pub fn list_all(&mut self, now: DateTime<FixedOffset>) -> PensumResult<Vec<Obligation>> {
        Ok(self.store.list_all(now)?.to_vec())
    }

    /// Apply a partial update, re-deriving status on due-date changes.
    pub fn update(
        &mut self,
        id: ObligationId,
        patch: UpdatePatch,
        now: DateTime<FixedOffset>,
    ) -> PensumResult<Obligation> {
        Ok(self.store.update(id, patch, now)?)
    }

    /// Toggle between done and pending.
    pub fn toggle_done(&mut self, id: ObligationId) -> PensumResult<Obligation> {
        Ok(self.store.toggle_done(id)?)
    }

    /// Delete one obligation.
    pub fn delete(&mut self, id: ObligationId) -> PensumResult<Obligation> {
        Ok(self.store.delete(id)?)
    }

    /// Delete everything, returning the removed count.
    pub fn clear_all(&mut self) -> PensumResult<usize> {
        Ok(self.store.clear_all()?)
    }

    /// The five display horizons over the post-sweep collection.
    pub fn horizon(&mut self, now: DateTime<FixedOffset>) -> PensumResult<HorizonView> {
        let obligations = self.store.list_all(now)?;
        Ok(horizon::classify(now, obligations))
    }

    // ── Capture flow ─────────────────────────────────────────────────

    /// Run free text through an extractor and commit the result, unless the
    /// extraction asks for clarification.
    pub fn capture_text(
        &mut self,
        extractor: &dyn Extractor,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> PensumResult<CaptureOutcome> {
        let extraction = extractor.extract(text, now)?;
        self.capture(extraction, now)
    }

    /// Commit an extraction, or hand back a draft for clarification.
    pub fn capture(
        &mut self,
        extraction: Extraction,
        now: DateTime<FixedOffset>,
    ) -> PensumResult<CaptureOutcome> {
        let draft = ObligationDraft {
            title: extraction.title,
            due_at: extraction.due_at,
            estimated_minutes: extraction.estimated_minutes,
            urgency: extraction.urgency,
        };
        if extraction.needs_clarification {
            tracing::debug!(title = %draft.title, "capture needs clarification");
            return Ok(CaptureOutcome::NeedsClarification { draft });
        }
        let obligation = self.store.add(draft, now)?;
        Ok(CaptureOutcome::Added { obligation })
    }

    /// Resolve a clarification follow-up: ground the answered date phrase and
    /// commit the draft. An unrecognized phrase hands the draft back again.
    pub fn clarify(
        &mut self,
        mut draft: ObligationDraft,
        phrase: &str,
        now: DateTime<FixedOffset>,
    ) -> PensumResult<CaptureOutcome> {
        match extract::ground_due_phrase(now, phrase) {
            Some(due) => {
                draft.due_at = Some(due);
                let obligation = self.store.add(draft, now)?;
                Ok(CaptureOutcome::Added { obligation })
            }
            None => Ok(CaptureOutcome::NeedsClarification { draft }),
        }
    }

    // ── Introspection ────────────────────────────────────────────────

    /// Summary of the tracker state.
    pub fn info(&self) -> TrackerInfo {
        let count = |status: Status| {
            self.store
                .snapshot()
                .iter()
                .filter(|o| o.status == status)
                .count()
        };
        TrackerInfo {
            total: self.store.len(),
            pending: count(Status::Pending),
            done: count(Status::Done),
            missed: count(Status::Missed),
            persistent: self.data_path.is_some(),
            data_path: self
                .data_path
                .as_ref()
                .map(|p| p.display().to_string()),
        }
    }
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("store", &self.store)
            .field("data_path", &self.data_path)
            .finish()
    }
}

/// Summary information about the tracker state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerInfo {
    pub total: usize,
    pub pending: usize,
    pub done: usize,
    pub missed: usize,
    pub persistent: bool,
    pub data_path: Option<String>,
}

impl std::fmt::Display for TrackerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "pensum tracker info")?;
        writeln!(f, "  obligations: {}", self.total)?;
        writeln!(f, "  pending:     {}", self.pending)?;
        writeln!(f, "  done:        {}", self.done)?;
        writeln!(f, "  missed:      {}", self.missed)?;
        writeln!(f, "  persistent:  {}", self.persistent)?;
        if let Some(path) = &self.data_path {
            writeln!(f, "  data file:   {path}")?;
        }
        Ok(())
    }
}
