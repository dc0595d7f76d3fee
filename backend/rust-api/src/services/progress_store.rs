use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

use super::kv_store::{lock, SharedStore};
use crate::models::progress::ProgressSnapshot;

const QUESTION_MISTAKES_KEY: &str = "calculus_game_question_mistakes";
const CONCEPT_MISTAKES_KEY: &str = "calculus_game_concept_mistakes";
const HINT_INDEX_KEY: &str = "calculus_game_hint_index";
const LESSONS_VIEWED_KEY: &str = "calculus_game_lessons_viewed";

/// Counters keyed by question or concept id; missing keys read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterMap(BTreeMap<String, u32>);

impl CounterMap {
    pub fn get(&self, key: &str) -> u32 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Adds one and returns the new value.
    pub fn increment(&mut self, key: &str) -> u32 {
        let entry = self.0.entry(key.to_string()).or_insert(0);
        *entry = entry.saturating_add(1);
        *entry
    }

    pub fn into_inner(self) -> BTreeMap<String, u32> {
        self.0
    }
}

/// Set-once flags keyed by concept id; missing keys read as false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlagMap(BTreeMap<String, bool>);

impl FlagMap {
    pub fn is_set(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    pub fn set(&mut self, key: &str) {
        self.0.insert(key.to_string(), true);
    }

    pub fn into_inner(self) -> BTreeMap<String, bool> {
        self.0
    }
}

/// Persistent learner progress: mistakes per question and concept, hint
/// reveal position per question, and which concept lessons were viewed.
///
/// Every operation is a read-modify-write against the backing store. Stored
/// values that fail to parse are treated as empty maps, and write failures
/// are logged rather than returned.
#[derive(Clone)]
pub struct ProgressStore {
    store: SharedStore,
}

impl ProgressStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn load<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        let raw = lock(&self.store).get(key);
        decode(key, raw)
    }

    /// Reads, changes and writes back one entry under a single store lock.
    fn modify<T, R>(&self, key: &str, change: impl FnOnce(&mut T) -> R) -> R
    where
        T: DeserializeOwned + Serialize + Default,
    {
        let mut store = lock(&self.store);
        let mut value: T = decode(key, store.get(key));
        let result = change(&mut value);

        match serde_json::to_string(&value) {
            Ok(encoded) => {
                if let Err(e) = store.set(key, encoded) {
                    tracing::error!("Failed to persist progress entry {}: {:#}", key, e);
                }
            }
            Err(e) => tracing::error!("Failed to encode progress entry {}: {}", key, e),
        }
        result
    }

    fn bump(&self, key: &str, id: &str) -> u32 {
        self.modify(key, |counters: &mut CounterMap| counters.increment(id))
    }

    pub fn mistakes(&self, question_id: &str) -> u32 {
        self.load::<CounterMap>(QUESTION_MISTAKES_KEY).get(question_id)
    }

    pub fn increment_mistakes(&self, question_id: &str) -> u32 {
        self.bump(QUESTION_MISTAKES_KEY, question_id)
    }

    pub fn concept_mistakes(&self, concept_id: &str) -> u32 {
        self.load::<CounterMap>(CONCEPT_MISTAKES_KEY).get(concept_id)
    }

    pub fn increment_concept_mistakes(&self, concept_id: &str) -> u32 {
        self.bump(CONCEPT_MISTAKES_KEY, concept_id)
    }

    pub fn hint_index(&self, question_id: &str) -> u32 {
        self.load::<CounterMap>(HINT_INDEX_KEY).get(question_id)
    }

    pub fn increment_hint_index(&self, question_id: &str) -> u32 {
        self.bump(HINT_INDEX_KEY, question_id)
    }

    pub fn has_viewed_lesson(&self, concept_id: &str) -> bool {
        self.load::<FlagMap>(LESSONS_VIEWED_KEY).is_set(concept_id)
    }

    pub fn mark_lesson_viewed(&self, concept_id: &str) {
        self.modify(LESSONS_VIEWED_KEY, |viewed: &mut FlagMap| viewed.set(concept_id));
    }

    /// Clears all four maps in a single store write.
    pub fn reset(&self) {
        let keys = [
            QUESTION_MISTAKES_KEY,
            CONCEPT_MISTAKES_KEY,
            HINT_INDEX_KEY,
            LESSONS_VIEWED_KEY,
        ];
        if let Err(e) = lock(&self.store).remove_all(&keys) {
            tracing::error!("Failed to reset progress: {:#}", e);
        }
        tracing::info!("Progress store reset");
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            question_mistakes: self.load::<CounterMap>(QUESTION_MISTAKES_KEY).into_inner(),
            concept_mistakes: self.load::<CounterMap>(CONCEPT_MISTAKES_KEY).into_inner(),
            hint_indices: self.load::<CounterMap>(HINT_INDEX_KEY).into_inner(),
            lessons_viewed: self.load::<FlagMap>(LESSONS_VIEWED_KEY).into_inner(),
        }
    }
}

fn decode<T: DeserializeOwned + Default>(key: &str, raw: Option<String>) -> T {
    match raw {
        Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable progress entry {}: {}", key, e);
            T::default()
        }),
        None => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::kv_store::{shared, FileStore, KeyValueStore, MemoryStore};

    fn memory_progress() -> (ProgressStore, SharedStore) {
        let store = shared(MemoryStore::default());
        (ProgressStore::new(store.clone()), store)
    }

    #[test]
    fn unseen_keys_default_to_zero_and_false() {
        let (progress, _) = memory_progress();
        assert_eq!(progress.mistakes("q1"), 0);
        assert_eq!(progress.concept_mistakes("power-rule"), 0);
        assert_eq!(progress.hint_index("q1"), 0);
        assert!(!progress.has_viewed_lesson("power-rule"));
    }

    #[test]
    fn counters_increment_independently() {
        let (progress, _) = memory_progress();
        assert_eq!(progress.increment_mistakes("q1"), 1);
        assert_eq!(progress.increment_mistakes("q1"), 2);
        progress.increment_concept_mistakes("power-rule");
        progress.increment_hint_index("q2");

        assert_eq!(progress.mistakes("q1"), 2);
        assert_eq!(progress.mistakes("q2"), 0);
        assert_eq!(progress.concept_mistakes("power-rule"), 1);
        assert_eq!(progress.hint_index("q2"), 1);
        assert_eq!(progress.hint_index("q1"), 0);
    }

    #[test]
    fn lesson_viewed_is_idempotent() {
        let (progress, _) = memory_progress();
        progress.mark_lesson_viewed("chain-rule");
        progress.mark_lesson_viewed("chain-rule");
        assert!(progress.has_viewed_lesson("chain-rule"));
        assert_eq!(progress.snapshot().lessons_viewed.len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let (progress, _) = memory_progress();
        progress.increment_mistakes("q1");
        progress.increment_concept_mistakes("c1");
        progress.increment_hint_index("q1");
        progress.mark_lesson_viewed("c1");

        progress.reset();

        assert_eq!(progress.snapshot(), ProgressSnapshot::default());
    }

    #[test]
    fn corrupt_entries_read_as_empty() {
        let (progress, store) = memory_progress();
        lock(&store)
            .set(QUESTION_MISTAKES_KEY, "definitely not json".to_string())
            .unwrap();
        lock(&store)
            .set(HINT_INDEX_KEY, "{\"q1\": -3}".to_string())
            .unwrap();

        assert_eq!(progress.mistakes("q1"), 0);
        assert_eq!(progress.hint_index("q1"), 0);
        assert_eq!(progress.increment_mistakes("q1"), 1);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        let (progress, _) = memory_progress();

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let progress = progress.clone();
                scope.spawn(move || {
                    for i in 0..200 {
                        progress.increment_mistakes("q1");
                        progress.increment_hint_index(&format!("q{}", worker));
                        progress.mark_lesson_viewed(&format!("c{}-{}", worker, i));
                    }
                });
            }
        });

        let snapshot = progress.snapshot();
        assert_eq!(progress.mistakes("q1"), 1600);
        assert_eq!(snapshot.hint_indices.values().sum::<u32>(), 1600);
        assert_eq!(snapshot.lessons_viewed.len(), 1600);
    }

    #[test]
    fn progress_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");

        let progress = ProgressStore::new(shared(FileStore::open(&path)));
        progress.increment_mistakes("q1");
        progress.mark_lesson_viewed("power-rule");

        let restarted = ProgressStore::new(shared(FileStore::open(&path)));
        assert_eq!(restarted.mistakes("q1"), 1);
        assert!(restarted.has_viewed_lesson("power-rule"));
    }
}
