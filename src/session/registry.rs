//! Session registry - arena lifecycle and participant routing

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::game::{
    ArenaError, ArenaHandle, ArenaSettings, ArenaSnapshot, ArenaSummary, ArenaTask, Faction,
    Intent, IntentOutcome, ParticipantView,
};

/// Arena used when a join names none
pub const DEFAULT_ARENA_ID: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("arena {0} not found")]
    ArenaNotFound(String),

    #[error("participant {0} not found")]
    ParticipantNotFound(Uuid),

    #[error("match in arena {0} has ended")]
    ArenaClosed(String),

    #[error("arena {0} is full")]
    ArenaFull(String),

    #[error("arena {0} is unavailable")]
    ArenaUnavailable(String),
}

impl SessionError {
    fn from_arena(err: ArenaError, arena_id: &str) -> Self {
        match err {
            ArenaError::ParticipantNotFound(id) => SessionError::ParticipantNotFound(id),
            ArenaError::Closed => SessionError::ArenaClosed(arena_id.to_string()),
            ArenaError::Full => SessionError::ArenaFull(arena_id.to_string()),
            ArenaError::Unavailable => SessionError::ArenaUnavailable(arena_id.to_string()),
        }
    }
}

/// Result of a successful join
#[derive(Debug, Clone, Serialize)]
pub struct JoinResult {
    pub participant_id: Uuid,
    pub arena_id: String,
    pub faction: Faction,
    pub participant: ParticipantView,
}

/// Registry of all live arenas
pub struct SessionRegistry {
    arenas: Arc<DashMap<String, ArenaHandle>>,
    /// Map of participant -> arena id
    participant_arenas: Arc<DashMap<Uuid, String>>,
    settings: ArenaSettings,
    strict: bool,
}

impl SessionRegistry {
    pub fn new(config: &Config) -> Self {
        Self {
            arenas: Arc::new(DashMap::new()),
            participant_arenas: Arc::new(DashMap::new()),
            settings: ArenaSettings {
                rules: config.rules.clone(),
                tick_rate: config.tick_rate,
                ended_linger: config.ended_linger,
            },
            strict: config.strict_arenas,
        }
    }

    pub fn arena_count(&self) -> usize {
        self.arenas.len()
    }

    pub fn total_participants(&self) -> usize {
        self.arenas
            .iter()
            .map(|a| a.value().participant_count())
            .sum()
    }

    /// Arena a participant is seated in
    pub fn arena_of(&self, participant_id: &Uuid) -> Option<String> {
        self.participant_arenas.get(participant_id).map(|a| a.clone())
    }

    /// Seat a new participant. A missing arena id means the default arena.
    pub async fn join(
        &self,
        arena_id: Option<&str>,
        display_name: &str,
    ) -> Result<JoinResult, SessionError> {
        let arena_id = arena_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .unwrap_or(DEFAULT_ARENA_ID);
        let handle = self.get_or_create(arena_id)?;

        let participant = handle
            .join(display_name)
            .await
            .map_err(|e| SessionError::from_arena(e, arena_id))?;
        if !self.seat(participant.id, arena_id, handle.instance) {
            warn!(arena_id = %arena_id, participant_id = %participant.id, "Arena went away during join");
            return Err(SessionError::ArenaNotFound(arena_id.to_string()));
        }

        Ok(JoinResult {
            participant_id: participant.id,
            arena_id: arena_id.to_string(),
            faction: participant.faction,
            participant,
        })
    }

    /// Remove a participant. Unknown ids are not an error.
    pub async fn leave(&self, participant_id: &Uuid) -> bool {
        let Some((_, arena_id)) = self.participant_arenas.remove(participant_id) else {
            return false;
        };
        let Some(handle) = self.handle(&arena_id) else {
            return false;
        };
        match handle.leave(*participant_id).await {
            Ok(left) => left,
            Err(e) => {
                warn!(arena_id = %arena_id, participant_id = %participant_id, error = %e, "Leave not delivered");
                false
            }
        }
    }

    /// Route an intent to the participant's arena
    pub async fn apply_intent(
        &self,
        participant_id: &Uuid,
        intent: Intent,
    ) -> Result<IntentOutcome, SessionError> {
        let arena_id = self
            .arena_of(participant_id)
            .ok_or(SessionError::ParticipantNotFound(*participant_id))?;
        let handle = self
            .handle(&arena_id)
            .ok_or(SessionError::ParticipantNotFound(*participant_id))?;
        handle
            .apply_intent(*participant_id, intent)
            .await
            .map_err(|e| SessionError::from_arena(e, &arena_id))
    }

    pub async fn snapshot(
        &self,
        arena_id: &str,
        since: Option<u64>,
    ) -> Result<ArenaSnapshot, SessionError> {
        let handle = self
            .handle(arena_id)
            .ok_or_else(|| SessionError::ArenaNotFound(arena_id.to_string()))?;
        handle
            .snapshot(since)
            .await
            .map_err(|_| SessionError::ArenaNotFound(arena_id.to_string()))
    }

    /// Summaries of every arena, ordered by id
    pub async fn list(&self) -> Vec<ArenaSummary> {
        let handles: Vec<ArenaHandle> = self.arenas.iter().map(|a| a.value().clone()).collect();
        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(summary) = handle.summary().await {
                summaries.push(summary);
            }
        }
        summaries.sort_by(|a, b| a.arena_id.cmp(&b.arena_id));
        summaries
    }

    /// Delete an arena with all its participants and timers
    pub async fn teardown(&self, arena_id: &str) -> Result<(), SessionError> {
        let (_, handle) = self
            .arenas
            .remove(arena_id)
            .ok_or_else(|| SessionError::ArenaNotFound(arena_id.to_string()))?;
        self.participant_arenas.retain(|_, a| a.as_str() != arena_id);
        handle.shutdown().await;

        info!(arena_id = %arena_id, "Arena torn down");
        Ok(())
    }

    /// Record the participant's arena, unless that arena instance has been
    /// replaced or removed in the meantime
    fn seat(&self, participant_id: Uuid, arena_id: &str, instance: Uuid) -> bool {
        self.participant_arenas
            .insert(participant_id, arena_id.to_string());
        let current = self
            .arenas
            .get(arena_id)
            .is_some_and(|h| h.instance == instance);
        if !current {
            self.participant_arenas.remove(&participant_id);
        }
        current
    }

    fn handle(&self, arena_id: &str) -> Option<ArenaHandle> {
        self.arenas.get(arena_id).map(|a| a.value().clone())
    }

    fn get_or_create(&self, arena_id: &str) -> Result<ArenaHandle, SessionError> {
        if let Some(handle) = self.handle(arena_id) {
            return Ok(handle);
        }
        if self.strict && arena_id != DEFAULT_ARENA_ID {
            return Err(SessionError::ArenaNotFound(arena_id.to_string()));
        }

        let handle = self
            .arenas
            .entry(arena_id.to_string())
            .or_insert_with(|| self.spawn_arena(arena_id))
            .value()
            .clone();
        Ok(handle)
    }

    /// Start an arena task and arrange its cleanup
    fn spawn_arena(&self, arena_id: &str) -> ArenaHandle {
        let seed = rand::random::<u64>();
        let (task, handle) = ArenaTask::new(arena_id, self.settings.clone(), seed);

        info!(arena_id = %arena_id, seed, "Created new arena");

        let arenas = self.arenas.clone();
        let participant_arenas = self.participant_arenas.clone();
        let id = arena_id.to_string();
        let instance = handle.instance;

        tokio::spawn(async move {
            let outcome = tokio::spawn(task.run()).await;

            // Cleanup after the arena stops; a newer arena under the same id
            // keeps its entry
            let removed = arenas
                .remove_if(&id, |_, h| h.instance == instance)
                .is_some();
            match outcome {
                Ok(seated) => {
                    for participant_id in seated {
                        participant_arenas.remove_if(&participant_id, |_, a| *a == id);
                    }
                }
                Err(e) => {
                    error!(arena_id = %id, error = %e, "Arena task failed");
                    if removed {
                        participant_arenas.retain(|_, a| *a != id);
                    }
                }
            }

            info!(arena_id = %id, "Arena removed from registry");
        });

        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::MatchStatus;

    fn registry(strict: bool) -> SessionRegistry {
        SessionRegistry::new(&Config {
            strict_arenas: strict,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn join_defaults_and_creates_lazily() {
        let sessions = registry(false);
        let first = sessions.join(None, "alpha").await.unwrap();
        assert_eq!(first.arena_id, DEFAULT_ARENA_ID);
        assert_eq!(first.faction, Faction::Attackers);

        let other = sessions.join(Some("side"), "bravo").await.unwrap();
        assert_eq!(other.arena_id, "side");
        assert_eq!(sessions.arena_count(), 2);
        assert_eq!(sessions.arena_of(&other.participant_id).as_deref(), Some("side"));
    }

    #[tokio::test]
    async fn strict_mode_rejects_unknown_arenas() {
        let sessions = registry(true);
        assert_eq!(
            sessions.join(Some("nowhere"), "alpha").await.unwrap_err(),
            SessionError::ArenaNotFound("nowhere".to_string())
        );
        assert!(sessions.join(None, "alpha").await.is_ok());
    }

    #[tokio::test]
    async fn leave_is_idempotent() {
        let sessions = registry(false);
        let joined = sessions.join(None, "alpha").await.unwrap();
        assert!(sessions.leave(&joined.participant_id).await);
        assert!(!sessions.leave(&joined.participant_id).await);
        assert!(!sessions.leave(&Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn teardown_drops_arena_and_participants() {
        let sessions = registry(false);
        let joined = sessions.join(Some("doomed"), "alpha").await.unwrap();
        sessions.teardown("doomed").await.unwrap();

        assert_eq!(
            sessions.snapshot("doomed", None).await.unwrap_err(),
            SessionError::ArenaNotFound("doomed".to_string())
        );
        assert_eq!(
            sessions
                .apply_intent(&joined.participant_id, Intent::PlantObjective)
                .await
                .unwrap_err(),
            SessionError::ParticipantNotFound(joined.participant_id)
        );
        assert_eq!(
            sessions.teardown("doomed").await.unwrap_err(),
            SessionError::ArenaNotFound("doomed".to_string())
        );
    }

    #[tokio::test]
    async fn seating_into_a_replaced_arena_is_undone() {
        let sessions = registry(false);
        let joined = sessions.join(Some("swap"), "alpha").await.unwrap();
        let stale = Uuid::new_v4();

        assert!(!sessions.seat(stale, "swap", Uuid::new_v4()));
        assert_eq!(sessions.arena_of(&stale), None);
        assert!(!sessions.seat(stale, "gone", Uuid::new_v4()));
        assert_eq!(sessions.arena_of(&stale), None);
        assert_eq!(sessions.arena_of(&joined.participant_id).as_deref(), Some("swap"));
    }

    #[tokio::test]
    async fn excessive_tick_rate_still_runs_the_arena() {
        let sessions = SessionRegistry::new(&Config {
            tick_rate: 2_000_000,
            ..Config::default()
        });
        sessions.join(Some("fast"), "alpha").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        sessions.join(Some("fast"), "bravo").await.unwrap();

        let snapshot = sessions.snapshot("fast", None).await.unwrap();
        assert_eq!(snapshot.participants.len(), 2);
        assert!(snapshot.tick > 0);
    }

    #[tokio::test]
    async fn list_reports_every_arena() {
        let sessions = registry(false);
        sessions.join(Some("b"), "one").await.unwrap();
        sessions.join(Some("a"), "two").await.unwrap();
        sessions.join(Some("a"), "three").await.unwrap();

        let list = sessions.list().await;
        let ids: Vec<&str> = list.iter().map(|s| s.arena_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(list[0].participants, 2);
        assert_eq!(list[0].match_phase, MatchStatus::Active);
        assert_eq!(list[1].match_phase, MatchStatus::Waiting);
    }
}
