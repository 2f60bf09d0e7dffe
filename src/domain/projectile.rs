use std::time::Instant;

use crate::domain::{vector::Vector2, weapon::WeaponType};

pub const PROJECTILE_LIFETIME_MS: u64 = 1000;
pub const PROJECTILE_MAX_RANGE: f64 = 800.0;
pub const PROJECTILE_SPEED: f64 = 800.0;

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: String,
    pub owner_id: String,
    pub weapon_type: WeaponType,
    pub position: Vector2,
    pub velocity: Vector2,
    pub spawn_position: Vector2,
    pub created: Instant,
    pub active: bool,
}

impl Projectile {
    pub fn new(
        id: String,
        owner_id: String,
        weapon_type: WeaponType,
        position: Vector2,
        angle: f64,
        created: Instant,
    ) -> Self {
        Self {
            id,
            owner_id,
            weapon_type,
            position,
            velocity: Vector2::from_angle(angle).scale(PROJECTILE_SPEED),
            spawn_position: position,
            created,
            active: true,
        }
    }

    pub fn integrate(&mut self, dt: f64) {
        self.position = self.position.add(self.velocity.scale(dt));
    }

    pub fn range_traveled(&self) -> f64 {
        self.position.distance(self.spawn_position)
    }

    /// Expires when it exceeds its lifetime, leaves the arena, or travels
    /// beyond max range.
    pub fn should_expire(&self, now: Instant) -> bool {
        let age_ms = now.duration_since(self.created).as_millis();
        age_ms >= PROJECTILE_LIFETIME_MS as u128
            || self.range_traveled() > PROJECTILE_MAX_RANGE
            || self.out_of_bounds()
    }

    fn out_of_bounds(&self) -> bool {
        self.position.x < 0.0
            || self.position.x > 1920.0
            || self.position.y < 0.0
            || self.position.y > 1080.0
    }
}
