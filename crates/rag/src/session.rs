use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use docmind_core::Fingerprint;
use docmind_finance::FinancialDataset;

use crate::index::MemoryIndex;

/// Everything the engine knows about one uploaded document. Constructed
/// fully before it is published to the store, so readers only ever see a
/// complete old state or a complete new one.
pub struct SessionContext {
    pub fingerprint: Fingerprint,
    pub index: MemoryIndex,
    pub finance: Option<FinancialDataset>,
    pub passage_count: usize,
}

struct StoreEntry {
    context: Arc<SessionContext>,
    last_used: u64,
}

/// Bounded session map with least-recently-used eviction and an explicit
/// close operation. The original design grew without limit; this one
/// drops the coldest session once `capacity` is reached.
pub struct SessionStore {
    capacity: usize,
    clock: Mutex<u64>,
    entries: Mutex<HashMap<String, StoreEntry>>,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            clock: Mutex::new(0),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn tick(&self) -> u64 {
        let mut clock = self.clock.lock();
        *clock += 1;
        *clock
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SessionContext>> {
        let stamp = self.tick();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(session_id)?;
        entry.last_used = stamp;
        Some(Arc::clone(&entry.context))
    }

    pub fn fingerprint(&self, session_id: &str) -> Option<Fingerprint> {
        self.entries
            .lock()
            .get(session_id)
            .map(|entry| entry.context.fingerprint.clone())
    }

    /// Publish a fully built context, replacing any previous one for the
    /// same session in a single map update. Evicts the least recently used
    /// session when the store is full.
    pub fn insert(&self, session_id: &str, context: SessionContext) -> Arc<SessionContext> {
        let stamp = self.tick();
        let context = Arc::new(context);
        let mut entries = self.entries.lock();
        if !entries.contains_key(session_id) && entries.len() >= self.capacity {
            if let Some(coldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(id, _)| id.clone())
            {
                tracing::debug!(session = %coldest, "evicting least recently used session");
                entries.remove(&coldest);
            }
        }
        entries.insert(
            session_id.to_string(),
            StoreEntry {
                context: Arc::clone(&context),
                last_used: stamp,
            },
        );
        context
    }

    pub fn close(&self, session_id: &str) -> bool {
        self.entries.lock().remove(session_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmind_core::Fingerprint;

    fn context(tag: &[u8]) -> SessionContext {
        SessionContext {
            fingerprint: Fingerprint::of_document(tag, None),
            index: MemoryIndex::new(),
            finance: None,
            passage_count: 0,
        }
    }

    #[test]
    fn get_returns_inserted_context() {
        let store = SessionStore::new(4);
        store.insert("a", context(b"a"));
        assert!(store.get("a").is_some());
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn replacing_a_session_swaps_wholesale() {
        let store = SessionStore::new(4);
        store.insert("a", context(b"one"));
        let first = store.fingerprint("a").unwrap();
        store.insert("a", context(b"two"));
        let second = store.fingerprint("a").unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn evicts_least_recently_used_at_capacity() {
        let store = SessionStore::new(2);
        store.insert("a", context(b"a"));
        store.insert("b", context(b"b"));
        store.get("a");
        store.insert("c", context(b"c"));
        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none(), "coldest session should be gone");
        assert!(store.get("c").is_some());
    }

    #[test]
    fn close_removes_the_session() {
        let store = SessionStore::new(2);
        store.insert("a", context(b"a"));
        assert!(store.close("a"));
        assert!(!store.close("a"));
        assert!(store.is_empty());
    }
}
