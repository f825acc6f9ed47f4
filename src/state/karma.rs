//! Karma scores, persisted as a JSON map.

use super::persistence::{load_json, save_json, write_off_worker};
use crate::error::PersistError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Karma the bot starts with when there is no file yet.
const BOT_KARMA: i64 = 9999;

#[derive(Debug)]
pub struct KarmaStore {
    path: Option<PathBuf>,
    scores: Mutex<HashMap<String, i64>>,
    write_lock: Mutex<()>,
}

impl KarmaStore {
    fn defaults(bot_nick: &str) -> HashMap<String, i64> {
        HashMap::from([(bot_nick.to_lowercase(), BOT_KARMA)])
    }

    /// A store that never touches the disk.
    pub fn in_memory(bot_nick: &str) -> Self {
        Self {
            path: None,
            scores: Mutex::new(Self::defaults(bot_nick)),
            write_lock: Mutex::new(()),
        }
    }

    /// Read scores from `path`, falling back to the defaults.
    pub fn load(path: impl Into<PathBuf>, bot_nick: &str) -> Self {
        let path = path.into();
        let scores = match load_json::<HashMap<String, i64>>(&path) {
            Ok(Some(scores)) => {
                info!(path = %path.display(), entries = scores.len(), "Loaded karma");
                scores
            }
            Ok(None) => Self::defaults(bot_nick),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read karma, using defaults");
                Self::defaults(bot_nick)
            }
        };

        Self {
            path: Some(path),
            scores: Mutex::new(scores),
            write_lock: Mutex::new(()),
        }
    }

    /// Current score of `thing` (case-insensitive).
    pub fn score(&self, thing: &str) -> i64 {
        self.scores
            .lock()
            .get(&thing.to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Add `delta` to `thing` and return the new score.
    pub fn vote(&self, thing: &str, delta: i64) -> i64 {
        let mut scores = self.scores.lock();
        let score = scores.entry(thing.to_lowercase()).or_insert(0);
        *score += delta;
        *score
    }

    /// Write all scores.
    pub fn save(&self) -> Result<(), PersistError> {
        let _writing = self.write_lock.lock();
        let snapshot = self.scores.lock().clone();
        match &self.path {
            Some(path) => save_json(path, &snapshot),
            None => Ok(()),
        }
    }

    /// [`save`](Self::save) from async code.
    pub async fn save_off_worker(self: &Arc<Self>) -> Result<(), PersistError> {
        let store = Arc::clone(self);
        write_off_worker(move || store.save()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_include_bot() {
        let store = KarmaStore::in_memory("Frank");
        assert_eq!(store.score("frank"), 9999);
        assert_eq!(store.score("nothing"), 0);
    }

    #[test]
    fn test_vote_is_case_insensitive() {
        let store = KarmaStore::in_memory("frank");
        assert_eq!(store.vote("Rust", 1), 1);
        assert_eq!(store.vote("rust", 1), 2);
        assert_eq!(store.vote("RUST", -1), 1);
        assert_eq!(store.score("rUsT"), 1);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("karma.json");

        let store = KarmaStore::load(&path, "frank");
        store.vote("pizza", 1);
        store.save().unwrap();

        let reloaded = KarmaStore::load(&path, "frank");
        assert_eq!(reloaded.score("pizza"), 1);
        assert_eq!(reloaded.score("frank"), 9999);
    }

    #[tokio::test]
    async fn test_save_off_worker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("karma.json");

        let store = Arc::new(KarmaStore::load(&path, "frank"));
        store.vote("tea", -1);
        store.save_off_worker().await.unwrap();

        assert_eq!(KarmaStore::load(&path, "frank").score("tea"), -1);
    }
}
