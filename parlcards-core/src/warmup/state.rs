//! Warmup state machine
//!
//! Idle → FetchingSharedData → FetchingPerEntity → BuildingRankings →
//! CachingCards → Complete, with Failed reachable from any stage and
//! Cancelled on cooperative shutdown.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupState {
    Idle,
    /// Politician list, session votes and vote details
    FetchingSharedData,
    /// Ballots, speeches and bills per politician
    FetchingPerEntity,
    BuildingRankings,
    CachingCards,
    Complete,
    /// Unrecoverable error; `partial` when some progress was persisted
    Failed { partial: bool },
    Cancelled,
}

impl WarmupState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WarmupState::Complete | WarmupState::Failed { .. } | WarmupState::Cancelled
        )
    }
}

/// Snapshot published to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupStatus {
    pub state: WarmupState,
    /// Entities handled in the current stage
    pub processed: usize,
    /// Entities the current stage will handle
    pub total: usize,
}

impl Default for WarmupStatus {
    fn default() -> Self {
        Self {
            state: WarmupState::Idle,
            processed: 0,
            total: 0,
        }
    }
}

/// Summary of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupReport {
    pub state: WarmupState,
    pub session: String,
    pub total_entities: usize,
    /// Entities fetched during this run
    pub fetched: usize,
    /// Entities that failed during this run
    pub failed: usize,
    pub completed_total: usize,
    pub failed_total: usize,
    pub rankings_built: bool,
    pub cards_written: usize,
    pub total_api_requests: u64,
}
