//! Arena geometry: vectors, bounds and spawn placement

use rand::Rng;
use serde::{Deserialize, Serialize};

/// 3D vector in arena units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        self.sub(other).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Unit vector in the same direction. Components are rescaled by the
    /// largest one first so huge finite inputs do not overflow.
    pub fn normalized(self) -> Option<Self> {
        if !self.is_finite() {
            return None;
        }
        let scale = self.x.abs().max(self.y.abs()).max(self.z.abs());
        if scale <= f32::EPSILON {
            return None;
        }
        let v = Self::new(self.x / scale, self.y / scale, self.z / scale);
        let len = v.length();
        Some(Self::new(v.x / len, v.y / len, v.z / len))
    }
}

/// View direction in radians
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Facing {
    pub yaw: f32,
    pub pitch: f32,
}

impl Facing {
    pub fn is_finite(self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite()
    }

    /// Facing on the ground plane that looks from `from` toward `to`
    pub fn looking_at(from: Vec3, to: Vec3) -> Self {
        let d = to.sub(from);
        Self {
            yaw: d.z.atan2(d.x),
            pitch: 0.0,
        }
    }
}

/// Axis-aligned arena bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    /// Clamp a position into the bounds, per axis
    pub fn clamp(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            p.x.clamp(self.min.x, self.max.x),
            p.y.clamp(self.min.y, self.max.y),
            p.z.clamp(self.min.z, self.max.z),
        )
    }

    pub fn contains(&self, p: Vec3) -> bool {
        self.clamp(p) == p
    }
}

/// Cosine of the angle between an aim vector and the displacement to a target.
///
/// Returns `None` when either vector has no length.
pub fn aim_alignment(aim: Vec3, displacement: Vec3) -> Option<f32> {
    let aim_len = aim.length();
    let dist = displacement.length();
    if aim_len <= f32::EPSILON || dist <= f32::EPSILON {
        return None;
    }
    Some(aim.dot(displacement) / (aim_len * dist))
}

/// Pick a spawn point jittered around a faction anchor so participants do not
/// stack on the exact same spot.
pub fn spawn_point<R: Rng>(rng: &mut R, anchor: Vec3, spread: f32, bounds: &Bounds) -> Vec3 {
    let spread = spread.max(0.0);
    let (dx, dz) = if spread > 0.0 {
        (rng.gen_range(-spread..=spread), rng.gen_range(-spread..=spread))
    } else {
        (0.0, 0.0)
    };
    bounds.clamp(Vec3::new(anchor.x + dx, anchor.y, anchor.z + dz))
}
