//! In-memory backend: tests and ephemeral daemon mode.

use crate::error::StoreResult;
use crate::obligation::Obligation;
use crate::store::StoreBackend;

/// Backend that keeps the persisted collection in memory. Saves are
/// infallible; contents die with the process.
#[derive(Debug, Default)]
pub struct MemBackend {
    obligations: Vec<Obligation>,
}

impl MemBackend {
    /// Create an empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend pre-seeded with a collection.
    pub fn seeded(obligations: Vec<Obligation>) -> Self {
        Self { obligations }
    }
}

impl StoreBackend for MemBackend {
    fn load_all(&self) -> StoreResult<Vec<Obligation>> {
        Ok(self.obligations.clone())
    }

    fn save_all(&mut self, obligations: &[Obligation]) -> StoreResult<()> {
        self.obligations = obligations.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obligation::{ObligationId, Status};
    use chrono::DateTime;

    #[test]
    fn save_then_load_round_trips() {
        let obligation = Obligation {
            id: ObligationId::new(1),
            title: "return the library books".into(),
            due_at: None,
            estimated_minutes: Some(20),
            urgency: None,
            status: Status::Pending,
            created_at: DateTime::parse_from_rfc3339("2026-08-06T09:00:00+02:00").unwrap(),
        };

        let mut backend = MemBackend::new();
        backend.save_all(std::slice::from_ref(&obligation)).unwrap();
        assert_eq!(backend.load_all().unwrap(), vec![obligation]);
    }

    #[test]
    fn fresh_backend_is_empty() {
        assert!(MemBackend::new().load_all().unwrap().is_empty());
    }
}
