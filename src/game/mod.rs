//! Game simulation modules

pub mod arena;
pub mod combat;
pub mod engine;
pub mod events;
pub mod intent;
pub mod objective;
pub mod participant;
pub mod physics;
pub mod snapshot;
pub mod store;
pub mod timers;
pub mod weapons;

pub use arena::{Arena, ArenaError, ArenaPhase, MatchStatus};
pub use engine::{ArenaHandle, ArenaSettings, ArenaTask};
pub use intent::{Intent, IntentOutcome, IntentRejection, MoveIntent};
pub use participant::Faction;
pub use snapshot::{ArenaSnapshot, ArenaSummary, ParticipantView};
pub use weapons::WeaponDef;
