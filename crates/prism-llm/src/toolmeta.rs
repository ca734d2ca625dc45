//! Process-wide metadata cache for Gemini tool calls
//!
//! Gemini pairs a function response with its originating call by name, and
//! expects the call's reasoning continuation signature to be echoed on the
//! follow-up turn. The canonical model carries neither, so the decoder
//! records them here keyed by the synthesized call id, and the request
//! builder re-pairs them when the tool result comes back on a later turn.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Entries beyond this trigger a prune
const SOFT_CAP: usize = 2000;
/// Prune removes oldest entries down to this size
const PRUNE_TO: usize = 1500;

/// Metadata recorded for one Gemini tool call
#[derive(Debug, Clone)]
pub struct ToolCallMeta {
    /// Function name as declared to the provider
    pub name: String,
    /// Reasoning continuation signature attached to the call
    pub signature: Option<String>,
    /// Reasoning text that preceded the call
    pub thought: Option<String>,
    /// Insertion order, used for oldest-first pruning
    created_seq: u64,
}

/// Bounded cache of call id → call metadata
///
/// Append/prune-only and safe under concurrent access; eviction is
/// approximate insertion-order, not LRU.
#[derive(Debug, Default)]
pub struct ToolMetaCache {
    entries: DashMap<String, ToolCallMeta>,
    next_seq: AtomicU64,
}

impl ToolMetaCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Record metadata for a call id
    pub fn insert(&self, call_id: &str, name: &str, signature: Option<String>, thought: Option<String>) {
        let created_seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            call_id.to_owned(),
            ToolCallMeta {
                name: name.to_owned(),
                signature,
                thought,
                created_seq,
            },
        );

        if self.entries.len() > SOFT_CAP {
            self.prune();
        }
    }

    /// Look up metadata for a call id
    pub fn get(&self, call_id: &str) -> Option<ToolCallMeta> {
        self.entries.get(call_id).map(|entry| entry.value().clone())
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn prune(&self) {
        let mut order: Vec<(u64, String)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().created_seq, entry.key().clone()))
            .collect();
        order.sort_unstable_by_key(|(seq, _)| *seq);

        let excess = order.len().saturating_sub(PRUNE_TO);
        for (_, key) in order.into_iter().take(excess) {
            self.entries.remove(&key);
        }
    }
}

/// The process-wide cache shared by every Gemini request
pub fn global() -> &'static ToolMetaCache {
    static CACHE: OnceLock<ToolMetaCache> = OnceLock::new();
    CACHE.get_or_init(ToolMetaCache::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_metadata() {
        let cache = ToolMetaCache::new();
        cache.insert("call_1", "get_weather", Some("sig".to_owned()), Some("hmm".to_owned()));

        let meta = cache.get("call_1").unwrap();
        assert_eq!(meta.name, "get_weather");
        assert_eq!(meta.signature.as_deref(), Some("sig"));
        assert_eq!(meta.thought.as_deref(), Some("hmm"));
        assert!(cache.get("call_2").is_none());
    }

    #[test]
    fn prunes_oldest_entries_first() {
        let cache = ToolMetaCache::new();
        for i in 0..=SOFT_CAP {
            cache.insert(&format!("call_{i}"), "tool", None, None);
        }

        assert_eq!(cache.len(), PRUNE_TO);
        // The oldest entries are gone, the newest survive
        assert!(cache.get("call_0").is_none());
        assert!(cache.get(&format!("call_{SOFT_CAP}")).is_some());
    }
}
