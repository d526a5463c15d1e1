//! Game events and the bounded per-arena event log

use serde::Serialize;
use std::collections::VecDeque;
use uuid::Uuid;

use super::participant::Faction;

/// Number of events an arena keeps for polling clients
pub const EVENT_LOG_CAPACITY: usize = 64;

/// Why a round ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEndReason {
    Elimination,
    TimeExpired,
    ObjectiveDetonated,
    ObjectiveDefused,
    Abandoned,
}

/// Game events (damage, kills, round flow, etc.)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum GameEvent {
    Joined {
        participant_id: Uuid,
        display_name: String,
        faction: Faction,
    },
    Left {
        participant_id: Uuid,
    },
    Hit {
        shooter_id: Uuid,
        target_id: Uuid,
        damage: f32,
    },
    Kill {
        killer_id: Uuid,
        victim_id: Uuid,
        weapon_id: String,
    },
    Respawned {
        participant_id: Uuid,
    },
    Purchased {
        participant_id: Uuid,
        weapon_id: String,
    },
    ObjectivePlanted {
        participant_id: Uuid,
    },
    ObjectiveDefused {
        participant_id: Uuid,
    },
    ObjectiveDetonated,
    RoundStarted {
        round: u32,
    },
    RoundEnded {
        round: u32,
        winner: Option<Faction>,
        reason: RoundEndReason,
    },
    MatchEnded {
        winner: Option<Faction>,
    },
}

/// Sequenced log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub tick: u64,
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: GameEvent,
}

/// Ring buffer of the most recent events
#[derive(Debug)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    capacity: usize,
    next_seq: u64,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_seq: 1,
        }
    }

    pub fn push(&mut self, tick: u64, at_ms: u64, event: GameEvent) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(EventRecord {
            seq: self.next_seq,
            tick,
            at_ms,
            event,
        });
        self.next_seq += 1;
    }

    /// Entries with a sequence number above `since` (all when `None`)
    pub fn since(&self, since: Option<u64>) -> Vec<EventRecord> {
        let floor = since.unwrap_or(0);
        self.records
            .iter()
            .filter(|r| r.seq > floor)
            .cloned()
            .collect()
    }

    /// Sequence number of the newest entry (0 when empty)
    pub fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(EVENT_LOG_CAPACITY)
    }
}
