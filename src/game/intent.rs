//! Client intents and their explicit outcomes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::physics::{Facing, Vec3};

/// Requested change to a participant's state
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Move(MoveIntent),
    Fire { direction: Vec3 },
    Purchase { weapon_id: String },
    PlantObjective,
    DefuseObjective,
}

impl Intent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::Move(_) => "move",
            Intent::Fire { .. } => "fire",
            Intent::Purchase { .. } => "purchase",
            Intent::PlantObjective => "plant",
            Intent::DefuseObjective => "defuse",
        }
    }
}

/// Client-reported kinematics, applied optimistically
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct MoveIntent {
    pub position: Vec3,
    #[serde(default)]
    pub velocity: Vec3,
    #[serde(default)]
    pub facing: Facing,
}

/// Why an intent was declined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum IntentRejection {
    #[error("malformed intent")]
    InvalidIntent,
    #[error("unknown weapon")]
    UnknownWeapon,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("weapon already equipped")]
    AlreadyEquipped,
    #[error("weapon is cooling down")]
    RateLimited,
    #[error("out of ammo")]
    OutOfAmmo,
    #[error("participant is dead")]
    Dead,
    #[error("round is not active")]
    PhaseClosed,
    #[error("wrong faction for this action")]
    WrongFaction,
    #[error("objective unavailable")]
    ObjectiveUnavailable,
    #[error("out of range")]
    OutOfRange,
}

/// Fire result as seen by the shooter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FireReport {
    pub hit: bool,
    pub target_id: Option<Uuid>,
    pub damage: f32,
    pub killed: bool,
    pub ammo_remaining: u32,
}

impl FireReport {
    pub fn miss(ammo_remaining: u32) -> Self {
        Self {
            hit: false,
            target_id: None,
            damage: 0.0,
            killed: false,
            ammo_remaining,
        }
    }
}

/// Loadout after a purchase attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseReport {
    pub balance: u32,
    pub weapon_id: String,
    pub ammo: u32,
}

/// Tagged result of one intent: `{accepted, reason}` plus whatever the caller
/// needs to render the new state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentOutcome {
    pub accepted: bool,
    pub reason: Option<IntentRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire: Option<FireReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase: Option<PurchaseReport>,
}

impl IntentOutcome {
    pub fn accepted() -> Self {
        Self {
            accepted: true,
            reason: None,
            position: None,
            fire: None,
            purchase: None,
        }
    }

    pub fn rejected(reason: IntentRejection) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            ..Self::accepted()
        }
    }

    pub fn from_result(result: Result<(), IntentRejection>) -> Self {
        match result {
            Ok(()) => Self::accepted(),
            Err(reason) => Self::rejected(reason),
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_fire(mut self, report: FireReport) -> Self {
        self.fire = Some(report);
        self
    }

    pub fn with_purchase(mut self, report: PurchaseReport) -> Self {
        self.purchase = Some(report);
        self
    }
}
