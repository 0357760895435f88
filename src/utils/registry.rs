use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// Tracks upload ids with a finalization task currently in flight.
///
/// This is the engine's only guard against duplicate completion signals:
/// a claim either succeeds and yields a guard, or fails because another
/// task already owns the id. The guard releases the entry on `Drop`, so
/// release happens on every exit path of the owning task, panics included.
///
/// Note there is no cross-id serialization here; two distinct ids racing
/// toward the same destination path are resolved (or not) downstream.
#[derive(Debug, Clone, Default)]
pub struct ProcessingRegistry {
    entries: Arc<DashMap<String, ProcessingEntry>>,
}

#[derive(Debug, Clone)]
pub struct ProcessingEntry {
    pub started_at: DateTime<Utc>,
}

/// RAII claim on an upload id; dropping it frees the id for later signals.
pub struct ProcessingGuard {
    id: String,
    entries: Arc<DashMap<String, ProcessingEntry>>,
}

impl ProcessingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `id` for finalization. Returns `None` when a task already holds it.
    pub fn try_claim(&self, id: &str) -> Option<ProcessingGuard> {
        use dashmap::mapref::entry::Entry;

        match self.entries.entry(id.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(ProcessingEntry {
                    started_at: Utc::now(),
                });
                Some(ProcessingGuard {
                    id: id.to_string(),
                    entries: self.entries.clone(),
                })
            }
        }
    }

    pub fn is_processing(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of finalizations currently in flight
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.entries.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_exclusive() {
        let registry = ProcessingRegistry::new();

        let guard = registry.try_claim("upload-1");
        assert!(guard.is_some());
        assert!(registry.is_processing("upload-1"));

        // Second claim for the same id collapses to a no-op
        assert!(registry.try_claim("upload-1").is_none());

        // Other ids are unaffected
        assert!(registry.try_claim("upload-2").is_some());
    }

    #[test]
    fn test_drop_releases_claim() {
        let registry = ProcessingRegistry::new();

        let guard = registry.try_claim("upload-1").unwrap();
        drop(guard);

        assert!(!registry.is_processing("upload-1"));
        assert!(registry.try_claim("upload-1").is_some());
    }

    #[test]
    fn test_release_on_panic() {
        let registry = ProcessingRegistry::new();

        // AssertUnwindSafe: the map is only observed after the unwind, and
        // the guard's Drop running during it is the behavior under test
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe({
            let registry = registry.clone();
            move || {
                let _guard = registry.try_claim("upload-1").unwrap();
                panic!("finalization blew up");
            }
        }));

        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
