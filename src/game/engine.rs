//! Arena worker task and the handle used to talk to it

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::ArenaRules;
use crate::util::time::{tick_duration, ArenaClock};

use super::arena::{Arena, ArenaError, ArenaPhase};
use super::intent::{Intent, IntentOutcome};
use super::snapshot::{ArenaSnapshot, ArenaSummary, ParticipantView, SnapshotBuilder};

/// Commands queued to an arena task
pub enum ArenaCommand {
    Join {
        display_name: String,
        reply: oneshot::Sender<Result<ParticipantView, ArenaError>>,
    },
    Leave {
        participant_id: Uuid,
        reply: oneshot::Sender<bool>,
    },
    Intent {
        participant_id: Uuid,
        intent: Intent,
        reply: oneshot::Sender<Result<IntentOutcome, ArenaError>>,
    },
    Snapshot {
        since: Option<u64>,
        reply: oneshot::Sender<ArenaSnapshot>,
    },
    Summary {
        reply: oneshot::Sender<ArenaSummary>,
    },
    Shutdown,
}

/// Handle to a running arena
#[derive(Clone)]
pub struct ArenaHandle {
    pub id: String,
    /// Distinguishes arenas recreated under the same id
    pub instance: Uuid,
    command_tx: mpsc::Sender<ArenaCommand>,
    participant_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    pub fn participant_count(&self) -> usize {
        self.participant_count.load(Ordering::Relaxed)
    }

    pub async fn join(&self, display_name: &str) -> Result<ParticipantView, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.send(ArenaCommand::Join {
            display_name: display_name.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ArenaError::Unavailable)?
    }

    pub async fn leave(&self, participant_id: Uuid) -> Result<bool, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.send(ArenaCommand::Leave {
            participant_id,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ArenaError::Unavailable)
    }

    pub async fn apply_intent(
        &self,
        participant_id: Uuid,
        intent: Intent,
    ) -> Result<IntentOutcome, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.send(ArenaCommand::Intent {
            participant_id,
            intent,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ArenaError::Unavailable)?
    }

    pub async fn snapshot(&self, since: Option<u64>) -> Result<ArenaSnapshot, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.send(ArenaCommand::Snapshot { since, reply }).await?;
        rx.await.map_err(|_| ArenaError::Unavailable)
    }

    pub async fn summary(&self) -> Result<ArenaSummary, ArenaError> {
        let (reply, rx) = oneshot::channel();
        self.send(ArenaCommand::Summary { reply }).await?;
        rx.await.map_err(|_| ArenaError::Unavailable)
    }

    /// Ask the task to stop. A task that already exited counts as stopped.
    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(ArenaCommand::Shutdown).await;
    }

    async fn send(&self, command: ArenaCommand) -> Result<(), ArenaError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|_| ArenaError::Unavailable)
    }
}

/// Settings a task is started with
#[derive(Debug, Clone)]
pub struct ArenaSettings {
    pub rules: ArenaRules,
    pub tick_rate: u32,
    /// How long a finished match stays readable
    pub ended_linger: Duration,
}

/// The authoritative arena task: sole owner of one [`Arena`]
pub struct ArenaTask {
    arena: Arena,
    clock: ArenaClock,
    command_rx: mpsc::Receiver<ArenaCommand>,
    tick_rate: u32,
    ended_linger: Duration,
    participant_count: Arc<AtomicUsize>,
}

impl ArenaTask {
    pub fn new(id: &str, settings: ArenaSettings, seed: u64) -> (Self, ArenaHandle) {
        let (command_tx, command_rx) = mpsc::channel(256);
        let participant_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            id: id.to_string(),
            instance: Uuid::new_v4(),
            command_tx,
            participant_count: participant_count.clone(),
        };

        let task = Self {
            arena: Arena::new(id, settings.rules, seed),
            clock: ArenaClock::new(),
            command_rx,
            tick_rate: settings.tick_rate,
            ended_linger: settings.ended_linger,
            participant_count,
        };

        (task, handle)
    }

    /// Run the tick loop until shutdown or until a finished match has
    /// lingered long enough. Returns the ids still seated at exit.
    pub async fn run(mut self) -> Vec<Uuid> {
        info!(arena_id = %self.arena.id(), tick_rate = self.tick_rate, "Arena started");

        let mut tick_interval = interval(tick_duration(self.tick_rate));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ended_at: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.arena.tick(self.clock.now_ms());
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(ArenaCommand::Shutdown) => {
                            info!(arena_id = %self.arena.id(), "Arena shutdown requested");
                            break;
                        }
                        Some(command) => self.handle(command),
                        None => {
                            warn!(arena_id = %self.arena.id(), "All handles dropped, stopping arena");
                            break;
                        }
                    }
                }
            }

            self.participant_count
                .store(self.arena.participants().len(), Ordering::Relaxed);

            if self.arena.phase() == ArenaPhase::MatchEnded {
                let since = *ended_at.get_or_insert_with(Instant::now);
                if since.elapsed() >= self.ended_linger {
                    info!(arena_id = %self.arena.id(), "Ended arena lingered out");
                    break;
                }
            }
        }

        info!(
            arena_id = %self.arena.id(),
            ticks = self.arena.tick_count(),
            rounds = self.arena.round(),
            "Arena stopped"
        );
        self.arena.participants().sorted_ids()
    }

    /// Apply one command against the current state. Dropped reply channels
    /// mean the caller went away, which is not an arena fault.
    fn handle(&mut self, command: ArenaCommand) {
        let now = self.clock.now_ms();
        match command {
            ArenaCommand::Join {
                display_name,
                reply,
            } => {
                let result = self
                    .arena
                    .join(&display_name, now)
                    .map(|p| ParticipantView::from(&p));
                let _ = reply.send(result);
            }
            ArenaCommand::Leave {
                participant_id,
                reply,
            } => {
                let _ = reply.send(self.arena.leave(&participant_id, now));
            }
            ArenaCommand::Intent {
                participant_id,
                intent,
                reply,
            } => {
                let _ = reply.send(self.arena.apply_intent(&participant_id, intent, now));
            }
            ArenaCommand::Snapshot { since, reply } => {
                let _ = reply.send(SnapshotBuilder::build(&self.arena, since));
            }
            ArenaCommand::Summary { reply } => {
                let _ = reply.send(SnapshotBuilder::summary(&self.arena));
            }
            ArenaCommand::Shutdown => {}
        }
    }
}
