//! Entity state store - authoritative participant state keyed by id

use std::collections::HashMap;
use uuid::Uuid;

use super::intent::{IntentRejection, MoveIntent, PurchaseReport};
use super::participant::{Faction, Participant};
use super::physics::{Bounds, Vec3};
use super::weapons::WeaponDef;

/// Owns every participant of one arena
#[derive(Debug, Default)]
pub struct ParticipantStore {
    participants: HashMap<Uuid, Participant>,
}

impl ParticipantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.participants.contains_key(id)
    }

    pub fn insert(&mut self, participant: Participant) {
        self.participants.insert(participant.id, participant);
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Participant> {
        self.participants.remove(id)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn get_mut(&mut self, id: &Uuid) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    /// Ids in a stable order
    pub fn sorted_ids(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = self.participants.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn faction_size(&self, faction: Faction) -> usize {
        self.iter().filter(|p| p.faction == faction).count()
    }

    pub fn living(&self, faction: Faction) -> usize {
        self.iter().filter(|p| p.faction == faction && p.alive).count()
    }

    /// Faction a newcomer should join: the smaller one, ties go to attackers
    pub fn balanced_faction(&self) -> Faction {
        if self.faction_size(Faction::Attackers) <= self.faction_size(Faction::Defenders) {
            Faction::Attackers
        } else {
            Faction::Defenders
        }
    }

    /// Apply a move intent optimistically, clamping the position to `bounds`.
    ///
    /// Returns the stored position.
    pub fn apply_move(
        &mut self,
        id: &Uuid,
        intent: &MoveIntent,
        bounds: &Bounds,
        now: u64,
    ) -> Result<Vec3, IntentRejection> {
        let participant = self.participants.get_mut(id).ok_or(IntentRejection::InvalidIntent)?;
        if !participant.alive {
            return Err(IntentRejection::Dead);
        }
        if !intent.position.is_finite() || !intent.velocity.is_finite() || !intent.facing.is_finite()
        {
            return Err(IntentRejection::InvalidIntent);
        }

        participant.position = bounds.clamp(intent.position);
        participant.velocity = intent.velocity;
        participant.facing = intent.facing;
        participant.last_action_at = now;
        Ok(participant.position)
    }

    /// Buy and equip a weapon with a full magazine.
    ///
    /// A declined purchase leaves balance, weapon and ammo untouched.
    pub fn purchase(
        &mut self,
        id: &Uuid,
        weapon_id: &str,
        now: u64,
    ) -> Result<PurchaseReport, IntentRejection> {
        let participant = self.participants.get_mut(id).ok_or(IntentRejection::InvalidIntent)?;
        let weapon = WeaponDef::get(weapon_id).ok_or(IntentRejection::UnknownWeapon)?;
        if !participant.alive {
            return Err(IntentRejection::Dead);
        }
        if participant.weapon_id == weapon.id {
            return Err(IntentRejection::AlreadyEquipped);
        }
        if participant.currency < weapon.cost {
            return Err(IntentRejection::InsufficientFunds);
        }

        participant.currency -= weapon.cost;
        participant.weapon_id = weapon.id;
        participant.ammo = weapon.capacity;
        participant.last_action_at = now;
        Ok(loadout_of(participant))
    }

    /// Current balance, weapon and ammo of a participant
    pub fn loadout(&self, id: &Uuid) -> Option<PurchaseReport> {
        self.participants.get(id).map(loadout_of)
    }
}

fn loadout_of(p: &Participant) -> PurchaseReport {
    PurchaseReport {
        balance: p.currency,
        weapon_id: p.weapon_id.to_string(),
        ammo: p.ammo,
    }
}
