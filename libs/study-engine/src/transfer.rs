//! JSON export and import of the full knowledge state.
//!
//! Import is all-or-nothing: every record must carry every field and pass
//! range checks before the target store is touched.

use crate::error::{Result, TransferError};
use crate::session::{DailyGoal, SessionStats};
use crate::store::KnowledgeStore;
use crate::types::{
    KnowledgeState, StrategyKind, CONFIDENCE_HISTORY, MAX_EASE, MAX_RATING, MIN_EASE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Portable copy of all knowledge states plus session and goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub strategy: StrategyKind,
    pub states: BTreeMap<String, KnowledgeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<DailyGoal>,
}

/// Snapshot with records kept as raw JSON until validated one by one.
#[derive(Deserialize)]
struct RawSnapshot {
    version: u32,
    exported_at: DateTime<Utc>,
    strategy: StrategyKind,
    states: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    session: Option<SessionStats>,
    #[serde(default)]
    goal: Option<DailyGoal>,
}

impl Snapshot {
    pub fn capture(store: &KnowledgeStore, strategy: StrategyKind, now: DateTime<Utc>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            exported_at: now,
            strategy,
            states: store
                .iter()
                .map(|(id, state)| (id.clone(), state.clone()))
                .collect(),
            session: None,
            goal: None,
        }
    }

    pub fn with_session(mut self, session: SessionStats) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_goal(mut self, goal: DailyGoal) -> Self {
        self.goal = Some(goal);
        self
    }

    pub fn to_store(&self) -> KnowledgeStore {
        KnowledgeStore::from_map(
            self.states
                .iter()
                .map(|(id, state)| (id.clone(), state.clone()))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }

    /// Parse and validate every record.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawSnapshot = serde_json::from_str(json)?;
        if raw.version != SNAPSHOT_VERSION {
            return Err(TransferError::UnsupportedVersion {
                found: raw.version,
                expected: SNAPSHOT_VERSION,
            });
        }

        let mut states = BTreeMap::new();
        for (id, value) in raw.states {
            let state: KnowledgeState = match serde_json::from_value(value) {
                Ok(state) => state,
                Err(e) => {
                    return Err(TransferError::MalformedRecord {
                        id,
                        reason: e.to_string(),
                    })
                }
            };
            validate_state(&id, &state)?;
            states.insert(id, state);
        }

        Ok(Self {
            version: raw.version,
            exported_at: raw.exported_at,
            strategy: raw.strategy,
            states,
            session: raw.session,
            goal: raw.goal,
        })
    }
}

/// Range checks for a record read from outside the engine.
pub fn validate_state(id: &str, state: &KnowledgeState) -> Result<()> {
    let out_of_range = |field| TransferError::OutOfRange {
        id: id.to_string(),
        field,
    };

    if state.rating > MAX_RATING {
        return Err(out_of_range("rating"));
    }
    if !(MIN_EASE..=MAX_EASE).contains(&state.ease_factor) {
        return Err(out_of_range("ease_factor"));
    }
    if state.correct_reviews > state.total_reviews {
        return Err(out_of_range("correct_reviews"));
    }
    if state.due_at < 0 {
        return Err(out_of_range("due_at"));
    }
    if state.last_answered_at < 0 {
        return Err(out_of_range("last_answered_at"));
    }
    if state.recent_confidence.len() > CONFIDENCE_HISTORY
        || state.recent_confidence.iter().any(|c| !(1..=3).contains(c))
    {
        return Err(out_of_range("recent_confidence"));
    }
    Ok(())
}

/// Replace the contents of `store` with a validated snapshot.
///
/// On any error the store is left untouched.
pub fn import_into(store: &mut KnowledgeStore, json: &str) -> Result<Snapshot> {
    let snapshot = Snapshot::from_json(json).map_err(|e| {
        warn!(error = %e, "rejected state import");
        e
    })?;
    *store = snapshot.to_store();
    Ok(snapshot)
}
