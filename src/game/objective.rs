//! Plant/defuse objective of a round

use serde::Serialize;
use uuid::Uuid;

use super::intent::IntentRejection;
use super::participant::{Faction, Participant};
use super::physics::Vec3;

/// Objective lifecycle within one round
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ObjectiveState {
    Idle,
    Planted {
        plant_id: u64,
        planter_id: Uuid,
        position: Vec3,
        planted_at: u64,
        detonates_at: u64,
    },
    Defused {
        defuser_id: Uuid,
        defused_at: u64,
    },
    Detonated {
        detonated_at: u64,
    },
}

#[derive(Debug, Clone)]
pub struct Objective {
    state: ObjectiveState,
    next_plant_id: u64,
}

impl Objective {
    pub fn new() -> Self {
        Self {
            state: ObjectiveState::Idle,
            next_plant_id: 1,
        }
    }

    pub fn state(&self) -> ObjectiveState {
        self.state
    }

    pub fn is_planted(&self) -> bool {
        matches!(self.state, ObjectiveState::Planted { .. })
    }

    /// Plant at the planter's position. Returns the plant id used to key the
    /// detonation timer.
    pub fn plant(
        &mut self,
        planter: &Participant,
        now: u64,
        fuse_ms: u64,
    ) -> Result<u64, IntentRejection> {
        if planter.faction != Faction::Attackers {
            return Err(IntentRejection::WrongFaction);
        }
        if !planter.alive {
            return Err(IntentRejection::Dead);
        }
        if !matches!(self.state, ObjectiveState::Idle) {
            return Err(IntentRejection::ObjectiveUnavailable);
        }

        let plant_id = self.next_plant_id;
        self.next_plant_id += 1;
        self.state = ObjectiveState::Planted {
            plant_id,
            planter_id: planter.id,
            position: planter.position,
            planted_at: now,
            detonates_at: now + fuse_ms,
        };
        Ok(plant_id)
    }

    /// Defuse a planted objective from within `radius`. Returns the plant id
    /// whose timer must be cancelled.
    pub fn defuse(
        &mut self,
        defuser: &Participant,
        radius: f32,
        now: u64,
    ) -> Result<u64, IntentRejection> {
        if defuser.faction != Faction::Defenders {
            return Err(IntentRejection::WrongFaction);
        }
        if !defuser.alive {
            return Err(IntentRejection::Dead);
        }
        let ObjectiveState::Planted {
            plant_id, position, ..
        } = self.state
        else {
            return Err(IntentRejection::ObjectiveUnavailable);
        };
        if defuser.position.distance(position) > radius {
            return Err(IntentRejection::OutOfRange);
        }

        self.state = ObjectiveState::Defused {
            defuser_id: defuser.id,
            defused_at: now,
        };
        Ok(plant_id)
    }

    /// Resolve a detonation timer. Stale plant ids are ignored.
    pub fn detonate(&mut self, plant_id: u64, now: u64) -> Option<Uuid> {
        match self.state {
            ObjectiveState::Planted {
                plant_id: current,
                planter_id,
                ..
            } if current == plant_id => {
                self.state = ObjectiveState::Detonated { detonated_at: now };
                Some(planter_id)
            }
            _ => None,
        }
    }

    /// Time left on the fuse
    pub fn remaining_ms(&self, now: u64) -> Option<u64> {
        match self.state {
            ObjectiveState::Planted { detonates_at, .. } => Some(detonates_at.saturating_sub(now)),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = ObjectiveState::Idle;
    }
}

impl Default for Objective {
    fn default() -> Self {
        Self::new()
    }
}
