//! Snapshot building for polling clients

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::arena::{Arena, ArenaPhase, FactionTally, MatchStatus};
use super::events::EventRecord;
use super::objective::ObjectiveState;
use super::participant::{Faction, Participant};
use super::physics::{Facing, Vec3};

/// Participant state as published in snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantView {
    pub id: Uuid,
    pub display_name: String,
    pub arena_id: String,
    pub faction: Faction,
    pub position: Vec3,
    pub velocity: Vec3,
    pub facing: Facing,
    pub health: f32,
    pub armor: f32,
    pub alive: bool,
    pub weapon_id: String,
    pub ammo: u32,
    pub currency: u32,
    pub kills: u32,
    pub deaths: u32,
    pub score: u32,
    pub round_kills: u32,
    /// Arena time of the pending respawn, while dead
    pub respawn_at: Option<u64>,
}

impl From<&Participant> for ParticipantView {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id,
            display_name: p.display_name.clone(),
            arena_id: p.arena_id.clone(),
            faction: p.faction,
            position: p.position,
            velocity: p.velocity,
            facing: p.facing,
            health: p.health,
            armor: p.armor,
            alive: p.alive,
            weapon_id: p.weapon_id.to_string(),
            ammo: p.ammo,
            currency: p.currency,
            kills: p.kills,
            deaths: p.deaths,
            score: p.score,
            round_kills: p.round_kills,
            respawn_at: p.respawn_at,
        }
    }
}

/// Objective state plus the fuse countdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectiveView {
    #[serde(flatten)]
    pub state: ObjectiveState,
    pub remaining_ms: Option<u64>,
}

/// Rules a client needs to render timers and scoreboards
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RulesSummary {
    pub min_players: usize,
    pub max_players: usize,
    pub round_duration_ms: u64,
    pub intermission_ms: u64,
    pub rounds_to_win: u32,
    pub max_rounds: u32,
    pub respawn_delay_ms: u64,
    pub objective_fuse_ms: u64,
}

/// Read-only view of one arena at a point in time
#[derive(Debug, Clone, Serialize)]
pub struct ArenaSnapshot {
    pub arena_id: String,
    pub tick: u64,
    pub phase: ArenaPhase,
    pub match_phase: MatchStatus,
    pub round: u32,
    /// Rounds won per faction
    pub scores: FactionTally,
    pub round_kills: FactionTally,
    pub round_time_remaining_ms: Option<u64>,
    pub winner: Option<Faction>,
    pub created_at: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    pub rules: RulesSummary,
    pub participants: Vec<ParticipantView>,
    pub objective: ObjectiveView,
    pub events: Vec<EventRecord>,
    pub last_event_seq: u64,
}

/// Row of the arena listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArenaSummary {
    pub arena_id: String,
    pub phase: ArenaPhase,
    pub match_phase: MatchStatus,
    pub round: u32,
    pub participants: usize,
    pub scores: FactionTally,
}

/// Builds snapshots from arena state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Full snapshot; `since` filters the event log to newer entries
    pub fn build(arena: &Arena, since: Option<u64>) -> ArenaSnapshot {
        let store = arena.participants();
        let participants: Vec<ParticipantView> = store
            .sorted_ids()
            .iter()
            .filter_map(|id| store.get(id))
            .map(ParticipantView::from)
            .collect();

        let events = arena.events_since(since);

        let rules = arena.rules();
        ArenaSnapshot {
            arena_id: arena.id().to_string(),
            tick: arena.tick_count(),
            phase: arena.phase(),
            match_phase: arena.phase().match_status(),
            round: arena.round(),
            scores: arena.scores(),
            round_kills: arena.round_kills(),
            round_time_remaining_ms: arena.round_remaining_ms(),
            winner: arena.winner(),
            created_at: arena.created_at(),
            generated_at: Utc::now(),
            rules: RulesSummary {
                min_players: rules.min_players,
                max_players: rules.max_players,
                round_duration_ms: rules.round_duration_ms,
                intermission_ms: rules.intermission_ms,
                rounds_to_win: rules.rounds_to_win,
                max_rounds: rules.max_rounds,
                respawn_delay_ms: rules.respawn_delay_ms,
                objective_fuse_ms: rules.objective_fuse_ms,
            },
            participants,
            objective: ObjectiveView {
                state: arena.objective_state(),
                remaining_ms: arena.objective_remaining_ms(),
            },
            events,
            last_event_seq: arena.last_event_seq(),
        }
    }

    pub fn summary(arena: &Arena) -> ArenaSummary {
        ArenaSummary {
            arena_id: arena.id().to_string(),
            phase: arena.phase(),
            match_phase: arena.phase().match_status(),
            round: arena.round(),
            participants: arena.participants().len(),
            scores: arena.scores(),
        }
    }
}
