//! Per-game persistence: high scores, last-played timestamps, and opaque
//! saved-state blobs, keyed by a game identifier. The engines stay
//! storage-agnostic; they serialize a snapshot and hand it over as JSON.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Everything remembered about one game.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub high_score: u32,
    pub last_played: Option<DateTime<Utc>>,
    pub saved_state: Option<serde_json::Value>,
}

/// A keyed store of [`GameRecord`]s. Loading an unknown id yields a fresh
/// default record rather than an error, so callers never special-case
/// first launch.
pub trait GameStore {
    fn load(&self, game_id: &str) -> GameRecord;

    /// Stores a snapshot to resume later and stamps `last_played`.
    fn save(&mut self, game_id: &str, state: serde_json::Value);

    /// Records `score` if it beats the stored high score. Returns whether
    /// a new record was set.
    fn record_high_score(&mut self, game_id: &str, score: u32) -> bool;

    /// Discards the saved state. The high score survives a reset.
    fn reset(&mut self, game_id: &str);
}

/// An in-memory [`GameStore`] that round-trips through JSON, mirroring how
/// a browser front end would keep the whole map under a single storage
/// key.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryStore {
    records: HashMap<String, GameRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> String {
        // the map serializes infallibly
        serde_json::to_string(&self.records).unwrap_or_default()
    }

    /// Restores a store from its JSON form. Corrupt input is logged and
    /// treated as an empty store so one bad blob cannot brick every game.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(records) => Self { records },
            Err(err) => {
                log::warn!("discarding corrupt store blob: {err}");
                Self::default()
            }
        }
    }

    fn entry(&mut self, game_id: &str) -> &mut GameRecord {
        self.records.entry_ref(game_id).or_default()
    }
}

impl GameStore for MemoryStore {
    fn load(&self, game_id: &str) -> GameRecord {
        self.records.get(game_id).cloned().unwrap_or_default()
    }

    fn save(&mut self, game_id: &str, state: serde_json::Value) {
        let record = self.entry(game_id);
        record.saved_state = Some(state);
        record.last_played = Some(Utc::now());
        log::debug!("saved state for {game_id}");
    }

    fn record_high_score(&mut self, game_id: &str, score: u32) -> bool {
        let record = self.entry(game_id);
        if score > record.high_score {
            log::debug!("new high score for {game_id}: {score}");
            record.high_score = score;
            true
        } else {
            false
        }
    }

    fn reset(&mut self, game_id: &str) {
        if let Some(record) = self.records.get_mut(game_id) {
            record.saved_state = None;
        }
    }
}
