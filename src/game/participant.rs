//! Participant state (authoritative)

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::physics::{Facing, Vec3};
use super::weapons::WeaponDef;

pub const MAX_HEALTH: f32 = 100.0;
pub const MAX_ARMOR: f32 = 100.0;

/// Binary team affiliation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    /// Plants the objective; wins balancing ties
    Attackers,
    /// Defuses the objective; wins rounds that time out even
    Defenders,
}

impl Faction {
    pub fn opponent(self) -> Self {
        match self {
            Faction::Attackers => Faction::Defenders,
            Faction::Defenders => Faction::Attackers,
        }
    }
}

/// Result of applying one damage instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageReport {
    /// Health actually removed
    pub health_lost: f32,
    /// Armor actually removed
    pub armor_lost: f32,
    /// True only on the alive -> dead transition
    pub killed: bool,
}

/// Participant state in an arena
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: Uuid,
    pub display_name: String,
    pub arena_id: String,
    pub faction: Faction,

    // Kinematics
    pub position: Vec3,
    pub velocity: Vec3,
    pub facing: Facing,

    // Combat
    pub health: f32,
    pub armor: f32,
    pub weapon_id: &'static str,
    pub ammo: u32,
    pub alive: bool,
    pub last_shot_at: Option<u64>,
    pub last_action_at: u64,
    /// Arena time the pending respawn fires, while dead
    pub respawn_at: Option<u64>,

    // Economy and stats
    pub currency: u32,
    pub kills: u32,
    pub deaths: u32,
    pub score: u32,
    pub round_kills: u32,
    pub objective_points: u32,
}

impl Participant {
    pub fn new(
        id: Uuid,
        display_name: String,
        arena_id: String,
        faction: Faction,
        spawn: Vec3,
        facing: Facing,
        armor: f32,
        currency: u32,
        now: u64,
    ) -> Self {
        let weapon = WeaponDef::default_weapon();
        Self {
            id,
            display_name,
            arena_id,
            faction,
            position: spawn,
            velocity: Vec3::ZERO,
            facing,
            health: MAX_HEALTH,
            armor: armor.clamp(0.0, MAX_ARMOR),
            weapon_id: weapon.id,
            ammo: weapon.capacity,
            alive: true,
            last_shot_at: None,
            last_action_at: now,
            respawn_at: None,
            currency,
            kills: 0,
            deaths: 0,
            score: 0,
            round_kills: 0,
            objective_points: 0,
        }
    }

    /// Equipped weapon definition, if the id still resolves
    pub fn weapon(&self) -> Option<&'static WeaponDef> {
        WeaponDef::get(self.weapon_id)
    }

    /// Reset kinematics, health, armor and ammo at a fresh spawn point
    pub fn respawn(&mut self, spawn: Vec3, facing: Facing, armor: f32, now: u64) {
        self.position = spawn;
        self.velocity = Vec3::ZERO;
        self.facing = facing;
        self.health = MAX_HEALTH;
        self.armor = armor.clamp(0.0, MAX_ARMOR);
        self.ammo = self.weapon().map(|w| w.capacity).unwrap_or(0);
        self.alive = true;
        self.last_shot_at = None;
        self.last_action_at = now;
        self.respawn_at = None;
    }

    /// Apply incoming damage; armor soaks `absorption` of it first.
    ///
    /// Dead participants take no damage, so a kill is reported at most once.
    pub fn take_damage(&mut self, amount: f32, absorption: f32) -> DamageReport {
        if !self.alive || !amount.is_finite() || amount <= 0.0 {
            return DamageReport {
                health_lost: 0.0,
                armor_lost: 0.0,
                killed: false,
            };
        }

        let absorbed = (amount * absorption.clamp(0.0, 1.0)).min(self.armor);
        let to_health = amount - absorbed;

        let armor_before = self.armor;
        let health_before = self.health;
        self.armor = (self.armor - absorbed).clamp(0.0, MAX_ARMOR);
        self.health = (self.health - to_health).clamp(0.0, MAX_HEALTH);

        let killed = self.health <= 0.0;
        if killed {
            self.alive = false;
            self.velocity = Vec3::ZERO;
        }

        DamageReport {
            health_lost: health_before - self.health,
            armor_lost: armor_before - self.armor,
            killed,
        }
    }

    /// Add currency, saturating at `cap`
    pub fn credit(&mut self, amount: u32, cap: u32) {
        self.currency = self.currency.saturating_add(amount).min(cap);
    }

    /// Recompute the accumulated score from kill and objective counters
    pub fn recompute_score(&mut self, kill_score: u32) {
        self.score = self
            .kills
            .saturating_mul(kill_score)
            .saturating_add(self.objective_points);
    }
}
