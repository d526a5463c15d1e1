//! Arena state and the round/match tick engine
//!
//! An [`Arena`] is plain synchronous state driven by millisecond timestamps.
//! The worker task in [`super::engine`] owns it and feeds it commands and
//! ticks; tests drive it directly with a fake clock.

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ArenaRules;

use super::combat::CombatResolver;
use super::events::{EventLog, EventRecord, GameEvent, RoundEndReason};
use super::intent::{FireReport, Intent, IntentOutcome, IntentRejection};
use super::objective::{Objective, ObjectiveState};
use super::participant::{Faction, Participant};
use super::physics::{spawn_point, Facing, Vec3};
use super::store::ParticipantStore;
use super::timers::{TimerKind, TimerQueue};

/// Longest display name kept
pub const MAX_NAME_LEN: usize = 24;

/// Arena phase. Round sub-phases cycle; everything else only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaPhase {
    WaitingForPlayers,
    RoundActive,
    RoundEnded,
    MatchEnded,
}

/// Match-level view of the phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    Active,
    Ended,
}

impl ArenaPhase {
    pub fn match_status(self) -> MatchStatus {
        match self {
            ArenaPhase::WaitingForPlayers => MatchStatus::Waiting,
            ArenaPhase::RoundActive | ArenaPhase::RoundEnded => MatchStatus::Active,
            ArenaPhase::MatchEnded => MatchStatus::Ended,
        }
    }
}

/// Per-faction counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FactionTally {
    pub attackers: u32,
    pub defenders: u32,
}

impl FactionTally {
    pub fn get(&self, faction: Faction) -> u32 {
        match faction {
            Faction::Attackers => self.attackers,
            Faction::Defenders => self.defenders,
        }
    }

    pub fn get_mut(&mut self, faction: Faction) -> &mut u32 {
        match faction {
            Faction::Attackers => &mut self.attackers,
            Faction::Defenders => &mut self.defenders,
        }
    }

    /// Faction with the strictly higher count
    pub fn leader(&self) -> Option<Faction> {
        match self.attackers.cmp(&self.defenders) {
            std::cmp::Ordering::Greater => Some(Faction::Attackers),
            std::cmp::Ordering::Less => Some(Faction::Defenders),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Arena-level failures surfaced to callers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArenaError {
    #[error("participant {0} not found")]
    ParticipantNotFound(Uuid),

    #[error("match has ended")]
    Closed,

    #[error("arena is full")]
    Full,

    #[error("arena is no longer running")]
    Unavailable,
}

/// One simulated match instance
pub struct Arena {
    id: String,
    rules: ArenaRules,
    phase: ArenaPhase,
    round: u32,
    scores: FactionTally,
    round_kills: FactionTally,
    round_started_at: u64,
    phase_changed_at: u64,
    winner: Option<Faction>,
    tick: u64,
    now: u64,
    store: ParticipantStore,
    timers: TimerQueue,
    objective: Objective,
    events: EventLog,
    rng: ChaCha8Rng,
    created_at: DateTime<Utc>,
}

impl Arena {
    pub fn new(id: impl Into<String>, rules: ArenaRules, seed: u64) -> Self {
        Self {
            id: id.into(),
            rules,
            phase: ArenaPhase::WaitingForPlayers,
            round: 0,
            scores: FactionTally::default(),
            round_kills: FactionTally::default(),
            round_started_at: 0,
            phase_changed_at: 0,
            winner: None,
            tick: 0,
            now: 0,
            store: ParticipantStore::new(),
            timers: TimerQueue::new(),
            objective: Objective::new(),
            events: EventLog::default(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rules(&self) -> &ArenaRules {
        &self.rules
    }

    pub fn phase(&self) -> ArenaPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn scores(&self) -> FactionTally {
        self.scores
    }

    pub fn round_kills(&self) -> FactionTally {
        self.round_kills
    }

    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn participants(&self) -> &ParticipantStore {
        &self.store
    }

    pub fn objective_state(&self) -> ObjectiveState {
        self.objective.state()
    }

    /// Fuse countdown, only while a round is live
    pub fn objective_remaining_ms(&self) -> Option<u64> {
        if self.phase != ArenaPhase::RoundActive {
            return None;
        }
        self.objective.remaining_ms(self.now)
    }

    pub fn events_since(&self, since: Option<u64>) -> Vec<EventRecord> {
        self.events.since(since)
    }

    pub fn last_event_seq(&self) -> u64 {
        self.events.last_seq()
    }

    /// Time left in the active round
    pub fn round_remaining_ms(&self) -> Option<u64> {
        (self.phase == ArenaPhase::RoundActive).then(|| {
            let elapsed = self.now.saturating_sub(self.round_started_at);
            self.rules.round_duration_ms.saturating_sub(elapsed)
        })
    }

    /// Add a participant to the smaller faction at a jittered spawn point
    pub fn join(&mut self, display_name: &str, now: u64) -> Result<Participant, ArenaError> {
        self.observe(now);
        if self.phase == ArenaPhase::MatchEnded {
            return Err(ArenaError::Closed);
        }
        if self.store.len() >= self.rules.max_players {
            return Err(ArenaError::Full);
        }

        let id = Uuid::new_v4();
        let faction = self.store.balanced_faction();
        let (spawn, facing) = self.spawn_for(faction);
        let participant = Participant::new(
            id,
            sanitize_name(display_name, &id),
            self.id.clone(),
            faction,
            spawn,
            facing,
            self.rules.spawn_armor,
            self.rules.starting_currency,
            now,
        );

        self.record(GameEvent::Joined {
            participant_id: id,
            display_name: participant.display_name.clone(),
            faction,
        });
        self.store.insert(participant);

        info!(
            arena_id = %self.id,
            participant_id = %id,
            faction = ?faction,
            participants = self.store.len(),
            "Participant joined arena"
        );

        if self.phase == ArenaPhase::WaitingForPlayers && self.store.len() >= self.rules.min_players
        {
            self.start_round(now);
        }

        self.store
            .get(&id)
            .cloned()
            .ok_or(ArenaError::ParticipantNotFound(id))
    }

    /// Remove a participant. Unknown ids are a no-op; returns whether
    /// anyone was removed.
    pub fn leave(&mut self, participant_id: &Uuid, now: u64) -> bool {
        self.observe(now);
        if self.store.remove(participant_id).is_none() {
            return false;
        }

        self.timers.cancel_where(
            |k| matches!(k, TimerKind::Respawn { participant_id: id } if id == participant_id),
        );
        self.record(GameEvent::Left {
            participant_id: *participant_id,
        });
        info!(arena_id = %self.id, participant_id = %participant_id, "Participant left arena");

        if self.store.is_empty()
            && matches!(self.phase, ArenaPhase::RoundActive | ArenaPhase::RoundEnded)
        {
            info!(arena_id = %self.id, "All participants left, ending match");
            self.end_match(now, Some(RoundEndReason::Abandoned));
        }
        true
    }

    /// Apply one client intent immediately
    pub fn apply_intent(
        &mut self,
        participant_id: &Uuid,
        intent: Intent,
        now: u64,
    ) -> Result<IntentOutcome, ArenaError> {
        self.observe(now);
        if !self.store.contains(participant_id) {
            return Err(ArenaError::ParticipantNotFound(*participant_id));
        }

        let kind = intent.kind();
        let outcome = match intent {
            Intent::Move(mv) => {
                match self.frozen().and_then(|_| {
                    self.store
                        .apply_move(participant_id, &mv, &self.rules.bounds, now)
                }) {
                    Ok(position) => IntentOutcome::accepted().with_position(position),
                    Err(reason) => IntentOutcome::rejected(reason),
                }
            }
            Intent::Fire { direction } => self.fire(participant_id, direction, now),
            Intent::Purchase { weapon_id } => self.purchase(participant_id, &weapon_id, now),
            Intent::PlantObjective => IntentOutcome::from_result(self.plant(participant_id, now)),
            Intent::DefuseObjective => IntentOutcome::from_result(self.defuse(participant_id, now)),
        };

        if let Some(reason) = outcome.reason {
            debug!(
                arena_id = %self.id,
                participant_id = %participant_id,
                intent = kind,
                reason = ?reason,
                "Intent rejected"
            );
        }
        Ok(outcome)
    }

    /// Advance time-based state once
    pub fn tick(&mut self, now: u64) {
        self.observe(now);
        self.tick += 1;

        match self.phase {
            ArenaPhase::WaitingForPlayers => {
                if self.store.len() >= self.rules.min_players {
                    self.start_round(now);
                }
            }
            ArenaPhase::RoundActive | ArenaPhase::RoundEnded => {
                self.run_timers(now);
                self.recompute_scores();
                self.advance_phase(now);
            }
            ArenaPhase::MatchEnded => {}
        }
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Combat state is frozen once the match is over
    fn frozen(&self) -> Result<(), IntentRejection> {
        if self.phase == ArenaPhase::MatchEnded {
            Err(IntentRejection::PhaseClosed)
        } else {
            Ok(())
        }
    }

    fn fire(&mut self, shooter_id: &Uuid, direction: Vec3, now: u64) -> IntentOutcome {
        let (ammo, alive) = self
            .store
            .get(shooter_id)
            .map(|p| (p.ammo, p.alive))
            .unwrap_or((0, false));
        if self.phase != ArenaPhase::RoundActive {
            let reason = if alive {
                IntentRejection::PhaseClosed
            } else {
                IntentRejection::Dead
            };
            return IntentOutcome::rejected(reason).with_fire(FireReport::miss(ammo));
        }

        let report = match CombatResolver::resolve_fire(
            &mut self.store,
            shooter_id,
            direction,
            now,
            &self.rules,
            &mut self.rng,
        ) {
            Ok(report) => report,
            Err(reason) => {
                return IntentOutcome::rejected(reason).with_fire(FireReport::miss(ammo));
            }
        };

        if let Some(target_id) = report.target_id {
            self.record(GameEvent::Hit {
                shooter_id: *shooter_id,
                target_id,
                damage: report.damage,
            });
            if report.killed {
                let (weapon_id, faction) = self
                    .store
                    .get(shooter_id)
                    .map(|p| (p.weapon_id.to_string(), Some(p.faction)))
                    .unwrap_or_default();
                if let Some(faction) = faction {
                    *self.round_kills.get_mut(faction) += 1;
                }
                self.record(GameEvent::Kill {
                    killer_id: *shooter_id,
                    victim_id: target_id,
                    weapon_id,
                });
                let respawn_at = self
                    .store
                    .get(&target_id)
                    .and_then(|p| p.respawn_at)
                    .unwrap_or(now + self.rules.respawn_delay_ms);
                self.timers.schedule(
                    respawn_at,
                    TimerKind::Respawn {
                        participant_id: target_id,
                    },
                );
                info!(
                    arena_id = %self.id,
                    killer_id = %shooter_id,
                    victim_id = %target_id,
                    "Participant killed"
                );
            }
        }

        IntentOutcome::accepted().with_fire(report)
    }

    fn purchase(&mut self, participant_id: &Uuid, weapon_id: &str, now: u64) -> IntentOutcome {
        let result = self
            .frozen()
            .and_then(|_| self.store.purchase(participant_id, weapon_id, now));
        match result {
            Ok(report) => {
                self.record(GameEvent::Purchased {
                    participant_id: *participant_id,
                    weapon_id: report.weapon_id.clone(),
                });
                IntentOutcome::accepted().with_purchase(report)
            }
            Err(reason) => {
                let outcome = IntentOutcome::rejected(reason);
                match self.store.loadout(participant_id) {
                    Some(loadout) => outcome.with_purchase(loadout),
                    None => outcome,
                }
            }
        }
    }

    fn plant(&mut self, participant_id: &Uuid, now: u64) -> Result<(), IntentRejection> {
        if self.phase != ArenaPhase::RoundActive {
            return Err(IntentRejection::PhaseClosed);
        }
        let planter = self
            .store
            .get(participant_id)
            .ok_or(IntentRejection::InvalidIntent)?;
        let plant_id = self
            .objective
            .plant(planter, now, self.rules.objective_fuse_ms)?;

        self.timers.schedule(
            now + self.rules.objective_fuse_ms,
            TimerKind::ObjectiveDetonation { plant_id },
        );
        self.award_objective_points(participant_id);
        self.record(GameEvent::ObjectivePlanted {
            participant_id: *participant_id,
        });
        info!(arena_id = %self.id, participant_id = %participant_id, "Objective planted");
        Ok(())
    }

    fn defuse(&mut self, participant_id: &Uuid, now: u64) -> Result<(), IntentRejection> {
        if self.phase != ArenaPhase::RoundActive {
            return Err(IntentRejection::PhaseClosed);
        }
        let defuser = self
            .store
            .get(participant_id)
            .ok_or(IntentRejection::InvalidIntent)?;
        let plant_id = self
            .objective
            .defuse(defuser, self.rules.defuse_radius, now)?;

        self.timers.cancel_where(
            |k| matches!(k, TimerKind::ObjectiveDetonation { plant_id: id } if *id == plant_id),
        );
        self.award_objective_points(participant_id);
        self.record(GameEvent::ObjectiveDefused {
            participant_id: *participant_id,
        });
        info!(arena_id = %self.id, participant_id = %participant_id, "Objective defused");
        self.end_round(Faction::Defenders, RoundEndReason::ObjectiveDefused, now);
        Ok(())
    }

    fn award_objective_points(&mut self, participant_id: &Uuid) {
        let points = self.rules.objective_score;
        let kill_score = self.rules.kill_score;
        if let Some(p) = self.store.get_mut(participant_id) {
            p.objective_points += points;
            p.recompute_score(kill_score);
        }
    }

    // ------------------------------------------------------------------
    // Tick engine
    // ------------------------------------------------------------------

    fn run_timers(&mut self, now: u64) {
        for timer in self.timers.pop_due(now) {
            match timer {
                TimerKind::Respawn { participant_id } => self.respawn(&participant_id, now),
                TimerKind::ObjectiveDetonation { plant_id } => {
                    if self.objective.detonate(plant_id, now).is_some() {
                        self.record(GameEvent::ObjectiveDetonated);
                        info!(arena_id = %self.id, "Objective detonated");
                        if self.phase == ArenaPhase::RoundActive {
                            self.end_round(
                                Faction::Attackers,
                                RoundEndReason::ObjectiveDetonated,
                                now,
                            );
                        }
                    }
                }
            }
        }
    }

    fn respawn(&mut self, participant_id: &Uuid, now: u64) {
        let Some(faction) = self
            .store
            .get(participant_id)
            .filter(|p| !p.alive)
            .map(|p| p.faction)
        else {
            return;
        };
        let (spawn, facing) = self.spawn_for(faction);
        let armor = self.rules.spawn_armor;
        if let Some(p) = self.store.get_mut(participant_id) {
            p.respawn(spawn, facing, armor, now);
        }
        self.record(GameEvent::Respawned {
            participant_id: *participant_id,
        });
    }

    fn recompute_scores(&mut self) {
        let kill_score = self.rules.kill_score;
        for p in self.store.iter_mut() {
            p.recompute_score(kill_score);
        }
    }

    fn advance_phase(&mut self, now: u64) {
        match self.phase {
            ArenaPhase::RoundActive => {
                if let Some(winner) = self.elimination_winner() {
                    self.end_round(winner, RoundEndReason::Elimination, now);
                } else if now.saturating_sub(self.round_started_at) >= self.rules.round_duration_ms
                    && !self.objective.is_planted()
                {
                    let winner = self.round_kills.leader().unwrap_or(Faction::Defenders);
                    self.end_round(winner, RoundEndReason::TimeExpired, now);
                }
            }
            ArenaPhase::RoundEnded => {
                if now.saturating_sub(self.phase_changed_at) >= self.rules.intermission_ms {
                    if self.match_decided() {
                        self.end_match(now, None);
                    } else {
                        self.start_round(now);
                    }
                }
            }
            ArenaPhase::WaitingForPlayers | ArenaPhase::MatchEnded => {}
        }
    }

    /// Winner by elimination: a populated faction with nobody alive loses.
    /// Attackers wiped after planting still leave the defenders a defuse to do.
    fn elimination_winner(&self) -> Option<Faction> {
        let wiped =
            |f: Faction| self.store.faction_size(f) > 0 && self.store.living(f) == 0;

        if wiped(Faction::Defenders) {
            return Some(Faction::Attackers);
        }
        if wiped(Faction::Attackers) && !self.objective.is_planted() {
            return Some(Faction::Defenders);
        }
        None
    }

    fn match_decided(&self) -> bool {
        self.scores.attackers >= self.rules.rounds_to_win
            || self.scores.defenders >= self.rules.rounds_to_win
            || self.round >= self.rules.max_rounds
    }

    fn start_round(&mut self, now: u64) {
        self.round += 1;
        self.phase = ArenaPhase::RoundActive;
        self.round_started_at = now;
        self.phase_changed_at = now;
        self.round_kills = FactionTally::default();
        self.objective.reset();
        self.timers.clear();

        let armor = self.rules.spawn_armor;
        for id in self.store.sorted_ids() {
            let Some(faction) = self.store.get(&id).map(|p| p.faction) else {
                continue;
            };
            let (spawn, facing) = self.spawn_for(faction);
            if let Some(p) = self.store.get_mut(&id) {
                p.respawn(spawn, facing, armor, now);
                p.round_kills = 0;
            }
        }

        self.record(GameEvent::RoundStarted { round: self.round });
        info!(arena_id = %self.id, round = self.round, "Round started");
    }

    fn end_round(&mut self, winner: Faction, reason: RoundEndReason, now: u64) {
        self.phase = ArenaPhase::RoundEnded;
        self.phase_changed_at = now;
        self.timers
            .cancel_where(|k| matches!(k, TimerKind::ObjectiveDetonation { .. }));
        *self.scores.get_mut(winner) += 1;

        let (win, loss, cap) = (
            self.rules.round_win_reward,
            self.rules.round_loss_reward,
            self.rules.max_currency,
        );
        for p in self.store.iter_mut() {
            p.credit(if p.faction == winner { win } else { loss }, cap);
        }

        self.record(GameEvent::RoundEnded {
            round: self.round,
            winner: Some(winner),
            reason,
        });
        info!(
            arena_id = %self.id,
            round = self.round,
            winner = ?winner,
            reason = ?reason,
            attackers = self.scores.attackers,
            defenders = self.scores.defenders,
            "Round ended"
        );
    }

    fn end_match(&mut self, now: u64, abandoned: Option<RoundEndReason>) {
        if let Some(reason) = abandoned {
            if self.phase == ArenaPhase::RoundActive {
                self.record(GameEvent::RoundEnded {
                    round: self.round,
                    winner: None,
                    reason,
                });
            }
        }
        self.phase = ArenaPhase::MatchEnded;
        self.phase_changed_at = now;
        self.winner = self.scores.leader();
        self.timers.clear();
        self.record(GameEvent::MatchEnded {
            winner: self.winner,
        });
        info!(arena_id = %self.id, winner = ?self.winner, rounds = self.round, "Match ended");
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn observe(&mut self, now: u64) {
        self.now = self.now.max(now);
    }

    fn spawn_for(&mut self, faction: Faction) -> (Vec3, Facing) {
        let anchor = self.anchor_of(faction);
        let enemy = self.anchor_of(faction.opponent());
        let spawn = spawn_point(
            &mut self.rng,
            anchor,
            self.rules.spawn_spread,
            &self.rules.bounds,
        );
        (spawn, Facing::looking_at(spawn, enemy))
    }

    fn anchor_of(&self, faction: Faction) -> Vec3 {
        match faction {
            Faction::Attackers => self.rules.attacker_anchor,
            Faction::Defenders => self.rules.defender_anchor,
        }
    }

    fn record(&mut self, event: GameEvent) {
        self.events.push(self.tick, self.now, event);
    }
}

/// Trim and cap a display name, falling back to a short id tag
fn sanitize_name(raw: &str, id: &Uuid) -> String {
    let trimmed: String = raw.trim().chars().take(MAX_NAME_LEN).collect();
    if trimmed.is_empty() {
        format!("Player_{}", &id.simple().to_string()[..8])
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::intent::MoveIntent;
    use crate::game::participant::MAX_HEALTH;

    fn rules() -> ArenaRules {
        ArenaRules {
            round_duration_ms: 60_000,
            intermission_ms: 3_000,
            max_rounds: 3,
            rounds_to_win: 2,
            respawn_delay_ms: 4_000,
            objective_fuse_ms: 10_000,
            ..ArenaRules::default()
        }
    }

    fn place(arena: &mut Arena, id: &Uuid, x: f32, now: u64) {
        let outcome = arena
            .apply_intent(
                id,
                Intent::Move(MoveIntent {
                    position: Vec3::new(x, 0.0, 0.0),
                    ..MoveIntent::default()
                }),
                now,
            )
            .unwrap();
        assert!(outcome.accepted);
    }

    fn fire(arena: &mut Arena, id: &Uuid, now: u64) -> IntentOutcome {
        arena
            .apply_intent(
                id,
                Intent::Fire {
                    direction: Vec3::new(1.0, 0.0, 0.0),
                },
                now,
            )
            .unwrap()
    }

    /// Arena with one attacker at the origin and one defender 1.5 units ahead
    fn duel() -> (Arena, Uuid, Uuid) {
        let mut arena = Arena::new("test", rules(), 42);
        let a = arena.join("alpha", 0).unwrap().id;
        let b = arena.join("bravo", 0).unwrap().id;
        place(&mut arena, &a, 0.0, 0);
        place(&mut arena, &b, 1.5, 0);
        (arena, a, b)
    }

    #[test]
    fn empty_arena_waits_forever() {
        let mut arena = Arena::new("idle", rules(), 1);
        for t in 0..1_000 {
            arena.tick(t * 50);
        }
        assert_eq!(arena.phase(), ArenaPhase::WaitingForPlayers);
        assert_eq!(arena.round(), 0);
    }

    #[test]
    fn second_join_starts_round_timer() {
        let mut arena = Arena::new("t", rules(), 1);
        arena.join("one", 1_000).unwrap();
        arena.tick(5_000);
        assert_eq!(arena.phase(), ArenaPhase::WaitingForPlayers);

        arena.join("two", 7_000).unwrap();
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);
        assert_eq!(arena.round(), 1);
        assert_eq!(arena.round_remaining_ms(), Some(60_000));

        arena.tick(8_000);
        assert_eq!(arena.round_remaining_ms(), Some(59_000));
    }

    #[test]
    fn joins_alternate_factions() {
        let mut arena = Arena::new("t", ArenaRules::default(), 1);
        let factions: Vec<Faction> = (0..4)
            .map(|i| arena.join(&format!("p{i}"), 0).unwrap().faction)
            .collect();
        assert_eq!(
            factions,
            vec![
                Faction::Attackers,
                Faction::Defenders,
                Faction::Attackers,
                Faction::Defenders
            ]
        );
    }

    #[test]
    fn full_arena_rejects_joins() {
        let mut arena = Arena::new(
            "t",
            ArenaRules {
                max_players: 2,
                ..rules()
            },
            1,
        );
        arena.join("a", 0).unwrap();
        arena.join("b", 0).unwrap();
        assert_eq!(arena.join("c", 0).unwrap_err(), ArenaError::Full);
    }

    #[test]
    fn names_are_sanitized() {
        let mut arena = Arena::new("t", rules(), 1);
        let blank = arena.join("   ", 0).unwrap();
        assert!(blank.display_name.starts_with("Player_"));
        let long = arena.join(&"x".repeat(100), 0).unwrap();
        assert_eq!(long.display_name.len(), MAX_NAME_LEN);
    }

    #[test]
    fn pistol_duel_scenario() {
        let (mut arena, a, b) = duel();

        let first = fire(&mut arena, &a, 1_000);
        assert!(first.accepted);
        assert!(first.fire.unwrap().hit);
        let health = arena.participants().get(&b).unwrap().health;
        assert!((60.0..=70.0).contains(&health));

        let second = fire(&mut arena, &a, 1_100);
        assert_eq!(second.reason, Some(IntentRejection::RateLimited));
        assert_eq!(arena.participants().get(&b).unwrap().health, health);

        arena.store.get_mut(&b).unwrap().health = 5.0;
        let third = fire(&mut arena, &a, 1_500);
        assert!(third.fire.unwrap().killed);
        let victim = arena.participants().get(&b).unwrap();
        assert!(!victim.alive);
        assert_eq!(arena.participants().get(&a).unwrap().kills, 1);
        assert!(arena
            .timers
            .fire_time(&TimerKind::Respawn { participant_id: b })
            .is_some());
    }

    #[test]
    fn elimination_ends_round_and_next_round_resets() {
        let (mut arena, a, b) = duel();
        arena.store.get_mut(&b).unwrap().health = 1.0;
        fire(&mut arena, &a, 1_000);

        arena.tick(1_050);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert_eq!(arena.scores().attackers, 1);
        assert_eq!(arena.round_kills().attackers, 1);

        arena.tick(3_000);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);

        arena.tick(4_050);
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);
        assert_eq!(arena.round(), 2);
        let b_state = arena.participants().get(&b).unwrap();
        assert!(b_state.alive);
        assert_eq!(b_state.health, MAX_HEALTH);
        assert_eq!(arena.participants().get(&a).unwrap().round_kills, 0);
        assert!(arena.timers.is_empty());
    }

    #[test]
    fn round_winner_rewards_are_paid() {
        let (mut arena, a, b) = duel();
        arena.store.get_mut(&b).unwrap().health = 1.0;
        fire(&mut arena, &a, 1_000);
        arena.tick(1_050);

        let r = rules();
        assert_eq!(
            arena.participants().get(&a).unwrap().currency,
            r.starting_currency + r.kill_reward + r.round_win_reward
        );
        assert_eq!(
            arena.participants().get(&b).unwrap().currency,
            r.starting_currency + r.round_loss_reward
        );
    }

    #[test]
    fn timeout_tie_goes_to_defenders() {
        let (mut arena, _, _) = duel();
        arena.tick(59_999);
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);
        arena.tick(60_000);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert_eq!(arena.scores().defenders, 1);
    }

    #[test]
    fn match_ends_at_rounds_to_win_and_freezes() {
        let (mut arena, _, _) = duel();
        let mut now = 0;
        while arena.phase() != ArenaPhase::MatchEnded && now < 1_000_000 {
            now += 500;
            arena.tick(now);
        }
        assert_eq!(arena.phase(), ArenaPhase::MatchEnded);
        assert_eq!(arena.scores().defenders, 2);
        assert_eq!(arena.winner(), Some(Faction::Defenders));
        assert_eq!(arena.phase().match_status(), MatchStatus::Ended);

        let ids = arena.participants().sorted_ids();
        let outcome = arena
            .apply_intent(
                &ids[0],
                Intent::Move(MoveIntent {
                    position: Vec3::new(3.0, 0.0, 3.0),
                    ..MoveIntent::default()
                }),
                now + 10,
            )
            .unwrap();
        assert_eq!(outcome.reason, Some(IntentRejection::PhaseClosed));
        assert_eq!(arena.join("late", now + 10).unwrap_err(), ArenaError::Closed);

        let tick_before = arena.round();
        arena.tick(now + 100_000);
        assert_eq!(arena.round(), tick_before);
    }

    #[test]
    fn dead_participant_respawns_only_after_delay() {
        let mut arena = Arena::new("t", rules(), 9);
        let a1 = arena.join("a1", 0).unwrap().id;
        let d1 = arena.join("d1", 0).unwrap().id;
        let _a2 = arena.join("a2", 0).unwrap().id;
        let _d2 = arena.join("d2", 0).unwrap().id;
        place(&mut arena, &a1, 0.0, 0);
        place(&mut arena, &d1, 2.0, 0);
        arena.store.get_mut(&d1).unwrap().health = 1.0;
        fire(&mut arena, &a1, 1_000);
        assert!(!arena.participants().get(&d1).unwrap().alive);

        for t in [1_050, 2_000, 4_999] {
            arena.tick(t);
            let moved = arena
                .apply_intent(
                    &d1,
                    Intent::Move(MoveIntent {
                        position: Vec3::new(9.0, 0.0, 9.0),
                        ..MoveIntent::default()
                    }),
                    t,
                )
                .unwrap();
            assert_eq!(moved.reason, Some(IntentRejection::Dead));
            assert!(!arena.participants().get(&d1).unwrap().alive);
        }
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);

        arena.tick(5_000);
        let d1_state = arena.participants().get(&d1).unwrap();
        assert!(d1_state.alive);
        assert_eq!(d1_state.health, MAX_HEALTH);
    }

    #[test]
    fn detonation_awards_attackers() {
        let (mut arena, a, _) = duel();
        let planted = arena
            .apply_intent(&a, Intent::PlantObjective, 1_000)
            .unwrap();
        assert!(planted.accepted);
        assert_eq!(arena.objective_remaining_ms(), Some(10_000));

        arena.tick(10_999);
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);
        arena.tick(11_000);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert_eq!(arena.scores().attackers, 1);
        assert!(matches!(
            arena.objective_state(),
            ObjectiveState::Detonated { .. }
        ));
    }

    #[test]
    fn planted_objective_outlasts_round_timer() {
        let (mut arena, a, _) = duel();
        arena
            .apply_intent(&a, Intent::PlantObjective, 55_000)
            .unwrap();
        arena.tick(61_000);
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);
        arena.tick(65_000);
        assert_eq!(arena.scores().attackers, 1);
    }

    #[test]
    fn defuse_cancels_detonation_and_awards_defenders() {
        let (mut arena, a, b) = duel();
        arena.apply_intent(&a, Intent::PlantObjective, 1_000).unwrap();

        let wrong = arena.apply_intent(&a, Intent::DefuseObjective, 1_100).unwrap();
        assert_eq!(wrong.reason, Some(IntentRejection::WrongFaction));

        let defused = arena.apply_intent(&b, Intent::DefuseObjective, 2_000).unwrap();
        assert!(defused.accepted);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert_eq!(arena.scores().defenders, 1);

        arena.tick(11_500);
        assert_eq!(arena.scores().attackers, 0);
    }

    #[test]
    fn fire_outside_active_round_is_rejected() {
        let mut arena = Arena::new("t", rules(), 1);
        let a = arena.join("solo", 0).unwrap().id;
        let outcome = fire(&mut arena, &a, 1_000);
        assert_eq!(outcome.reason, Some(IntentRejection::PhaseClosed));
        assert_eq!(outcome.fire.unwrap().ammo_remaining, 12);
    }

    #[test]
    fn leave_is_idempotent_and_empty_arena_ends_match() {
        let (mut arena, a, b) = duel();
        assert!(arena.leave(&a, 100));
        assert!(!arena.leave(&a, 100));
        assert_eq!(arena.phase(), ArenaPhase::RoundActive);
        assert!(arena.leave(&b, 200));
        assert_eq!(arena.phase(), ArenaPhase::MatchEnded);
    }

    #[test]
    fn unknown_participant_is_not_found() {
        let (mut arena, _, _) = duel();
        let ghost = Uuid::new_v4();
        assert_eq!(
            arena.apply_intent(&ghost, Intent::PlantObjective, 0).unwrap_err(),
            ArenaError::ParticipantNotFound(ghost)
        );
    }

    #[test]
    fn purchase_rejection_reports_unchanged_loadout() {
        let (mut arena, a, _) = duel();
        let outcome = arena
            .apply_intent(
                &a,
                Intent::Purchase {
                    weapon_id: "sniper".to_string(),
                },
                10,
            )
            .unwrap();
        assert_eq!(outcome.reason, Some(IntentRejection::InsufficientFunds));
        let loadout = outcome.purchase.unwrap();
        assert_eq!(loadout.balance, rules().starting_currency);
        assert_eq!(loadout.weapon_id, "pistol");
    }

    #[test]
    fn events_are_logged_in_order() {
        let (mut arena, a, b) = duel();
        arena.store.get_mut(&b).unwrap().health = 1.0;
        fire(&mut arena, &a, 1_000);
        let kinds: Vec<&str> = arena
            .events_since(None)
            .iter()
            .map(|r| match r.event {
                GameEvent::Joined { .. } => "joined",
                GameEvent::RoundStarted { .. } => "round_started",
                GameEvent::Hit { .. } => "hit",
                GameEvent::Kill { .. } => "kill",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["joined", "joined", "round_started", "hit", "kill"]);
    }

    #[test]
    fn decided_round_does_not_detonate_during_intermission() {
        let mut arena = Arena::new(
            "t",
            ArenaRules {
                intermission_ms: 30_000,
                ..rules()
            },
            42,
        );
        let a = arena.join("alpha", 0).unwrap().id;
        let b = arena.join("bravo", 0).unwrap().id;
        place(&mut arena, &a, 0.0, 0);
        place(&mut arena, &b, 1.5, 0);

        assert!(arena
            .apply_intent(&a, Intent::PlantObjective, 100)
            .unwrap()
            .accepted);
        arena.store.get_mut(&b).unwrap().health = 1.0;
        fire(&mut arena, &a, 200);
        arena.tick(250);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert_eq!(arena.objective_remaining_ms(), None);

        arena.tick(20_000);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert!(matches!(
            arena.objective_state(),
            ObjectiveState::Planted { .. }
        ));
        assert_eq!(arena.scores().attackers, 1);
        assert!(!arena
            .events_since(None)
            .iter()
            .any(|r| matches!(r.event, GameEvent::ObjectiveDetonated)));
    }

    #[test]
    fn round_kills_survive_the_killer_leaving() {
        let mut arena = Arena::new("t", rules(), 42);
        let a1 = arena.join("a1", 0).unwrap().id;
        let d1 = arena.join("d1", 0).unwrap().id;
        arena.join("a2", 0).unwrap();
        arena.join("d2", 0).unwrap();
        place(&mut arena, &a1, 0.0, 0);
        place(&mut arena, &d1, 1.5, 0);

        arena.store.get_mut(&d1).unwrap().health = 1.0;
        assert!(fire(&mut arena, &a1, 1_000).fire.unwrap().killed);
        assert_eq!(arena.round_kills().attackers, 1);

        arena.leave(&a1, 2_000);
        arena.tick(2_050);
        assert_eq!(arena.round_kills().attackers, 1);

        arena.tick(60_000);
        assert_eq!(arena.phase(), ArenaPhase::RoundEnded);
        assert_eq!(arena.scores().attackers, 1);
        assert_eq!(arena.scores().defenders, 0);
    }
}
