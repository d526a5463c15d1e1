//! Static weapon catalog

use serde::Serialize;

/// Immutable weapon reference data
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeaponDef {
    pub id: &'static str,
    /// Minimum damage per hit
    pub damage_min: f32,
    /// Maximum damage per hit
    pub damage_max: f32,
    /// Minimum time between shots (ms)
    pub cooldown_ms: u64,
    /// Magazine size
    pub capacity: u32,
    /// Purchase price
    pub cost: u32,
}

/// Weapon every participant spawns with
pub const DEFAULT_WEAPON: &str = "pistol";

const CATALOG: &[WeaponDef] = &[
    WeaponDef {
        id: "pistol",
        damage_min: 30.0,
        damage_max: 40.0,
        cooldown_ms: 400,
        capacity: 12,
        cost: 0,
    },
    WeaponDef {
        id: "smg",
        damage_min: 18.0,
        damage_max: 24.0,
        cooldown_ms: 100,
        capacity: 30,
        cost: 1_200,
    },
    WeaponDef {
        id: "shotgun",
        damage_min: 45.0,
        damage_max: 70.0,
        cooldown_ms: 900,
        capacity: 8,
        cost: 1_100,
    },
    WeaponDef {
        id: "rifle",
        damage_min: 28.0,
        damage_max: 36.0,
        cooldown_ms: 120,
        capacity: 30,
        cost: 2_700,
    },
    WeaponDef {
        id: "sniper",
        damage_min: 85.0,
        damage_max: 110.0,
        cooldown_ms: 1_500,
        capacity: 10,
        cost: 4_750,
    },
];

impl WeaponDef {
    /// Look up a weapon by id
    pub fn get(id: &str) -> Option<&'static WeaponDef> {
        CATALOG.iter().find(|w| w.id == id)
    }

    /// Full catalog in display order
    pub fn all() -> &'static [WeaponDef] {
        CATALOG
    }

    pub fn default_weapon() -> &'static WeaponDef {
        &CATALOG[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_entries_are_sane() {
        for w in WeaponDef::all() {
            assert!(w.damage_min > 0.0 && w.damage_min <= w.damage_max, "{}", w.id);
            assert!(w.capacity > 0, "{}", w.id);
        }
        assert_eq!(WeaponDef::default_weapon().id, DEFAULT_WEAPON);
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(WeaponDef::get("rifle").map(|w| w.cost), Some(2_700));
        assert!(WeaponDef::get("railgun").is_none());
    }
}
