//! Reset command.

use crate::db::{HistoryRepository, SqliteRepository, StateRepository};
use anyhow::Result;

/// What a reset removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetOutcome {
    pub states: usize,
    pub answers: usize,
}

/// Clear every knowledge state, and the answer history when asked.
pub fn reset_progress(repo: &SqliteRepository, include_history: bool) -> Result<ResetOutcome> {
    let states = repo.clear_states()?;
    let answers = if include_history {
        repo.clear_history()?
    } else {
        0
    };
    tracing::info!("Reset {} states and {} answers", states, answers);
    Ok(ResetOutcome { states, answers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_engine::KnowledgeState;

    #[test]
    fn reset_clears_states_and_optionally_history() {
        let repo = SqliteRepository::open_in_memory().unwrap();
        repo.save_state("a", &KnowledgeState::default()).unwrap();
        repo.save_state("b", &KnowledgeState::default()).unwrap();

        let outcome = reset_progress(&repo, false).unwrap();
        assert_eq!(outcome, ResetOutcome { states: 2, answers: 0 });
        assert!(repo.load_states().unwrap().is_empty());
    }
}
