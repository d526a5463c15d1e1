//! Combat resolver - hit-scan detection and damage for fire intents

use rand::Rng;
use uuid::Uuid;

use crate::config::ArenaRules;

use super::intent::{FireReport, IntentRejection};
use super::participant::Faction;
use super::physics::{aim_alignment, Vec3};
use super::store::ParticipantStore;

/// Target chosen for one shot
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    id: Uuid,
    distance: f32,
}

/// Combat system for resolving fire intents
pub struct CombatResolver;

impl CombatResolver {
    /// Resolve a single fire intent into zero or one damage application.
    ///
    /// A shot that clears the gates always consumes one round, hit or miss.
    /// The nearest qualifying opponent takes the hit; equal distances fall
    /// back to id order so the result never depends on map iteration.
    pub fn resolve_fire<R: Rng>(
        store: &mut ParticipantStore,
        shooter_id: &Uuid,
        direction: Vec3,
        now: u64,
        rules: &ArenaRules,
        rng: &mut R,
    ) -> Result<FireReport, IntentRejection> {
        let shooter = store.get(shooter_id).ok_or(IntentRejection::InvalidIntent)?;
        if !shooter.alive {
            return Err(IntentRejection::Dead);
        }
        let direction = direction.normalized().ok_or(IntentRejection::InvalidIntent)?;
        let weapon = shooter.weapon().ok_or(IntentRejection::InvalidIntent)?;
        if let Some(last) = shooter.last_shot_at {
            if now.saturating_sub(last) < weapon.cooldown_ms {
                return Err(IntentRejection::RateLimited);
            }
        }
        if shooter.ammo == 0 {
            return Err(IntentRejection::OutOfAmmo);
        }

        let origin = shooter.position;
        let faction = shooter.faction;

        let target = Self::pick_target(store, shooter_id, faction, origin, direction, rules);

        let ammo_remaining = match store.get_mut(shooter_id) {
            Some(shooter) => {
                shooter.ammo -= 1;
                shooter.last_shot_at = Some(now);
                shooter.last_action_at = now;
                shooter.ammo
            }
            None => return Err(IntentRejection::InvalidIntent),
        };

        let Some(target) = target else {
            return Ok(FireReport::miss(ammo_remaining));
        };

        let damage = Self::roll_damage(rng, weapon.damage_min, weapon.damage_max);
        let report = match store.get_mut(&target.id) {
            Some(victim) => {
                let report = victim.take_damage(damage, rules.armor_absorption);
                if report.killed {
                    victim.deaths += 1;
                    victim.respawn_at = Some(now + rules.respawn_delay_ms);
                }
                report
            }
            None => return Ok(FireReport::miss(ammo_remaining)),
        };

        if report.killed {
            if let Some(shooter) = store.get_mut(shooter_id) {
                shooter.kills += 1;
                shooter.round_kills += 1;
                shooter.credit(rules.kill_reward, rules.max_currency);
                shooter.recompute_score(rules.kill_score);
            }
        }

        Ok(FireReport {
            hit: true,
            target_id: Some(target.id),
            damage: report.health_lost + report.armor_lost,
            killed: report.killed,
            ammo_remaining,
        })
    }

    /// Nearest living opponent inside the range and aim cone
    fn pick_target(
        store: &ParticipantStore,
        shooter_id: &Uuid,
        faction: Faction,
        origin: Vec3,
        direction: Vec3,
        rules: &ArenaRules,
    ) -> Option<Candidate> {
        store
            .iter()
            .filter(|p| &p.id != shooter_id && p.alive && p.faction != faction)
            .filter_map(|p| {
                let displacement = p.position.sub(origin);
                let distance = displacement.length();
                let cos = aim_alignment(direction, displacement)?;
                (distance < rules.hit_range && cos > rules.hit_cone_cos).then_some(Candidate {
                    id: p.id,
                    distance,
                })
            })
            .min_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then_with(|| a.id.cmp(&b.id))
            })
    }

    /// Damage spread: uniform within the weapon's range
    fn roll_damage<R: Rng>(rng: &mut R, min: f32, max: f32) -> f32 {
        if max > min {
            rng.gen_range(min..=max)
        } else {
            min
        }
    }
}
