use std::time::Instant;

use crate::domain::{vector::Vector2, weapon::WeaponType};

pub const CRATE_PICKUP_RANGE: f64 = 32.0;
pub const CRATE_RESPAWN_SECS: f64 = 30.0;

/// Five fixed spawn points in a pentagon layout around the arena center,
/// each permanently typed to one weapon.
pub fn crate_spawn_points() -> [(Vector2, WeaponType); 5] {
    let center = Vector2::new(960.0, 540.0);
    let radius = 420.0;
    let weapons = [
        WeaponType::Uzi,
        WeaponType::Ak47,
        WeaponType::Shotgun,
        WeaponType::Bat,
        WeaponType::Katana,
    ];
    let mut points = [(Vector2::ZERO, WeaponType::Uzi); 5];
    for (i, weapon) in weapons.into_iter().enumerate() {
        let angle = std::f64::consts::FRAC_PI_2 + (i as f64) * std::f64::consts::TAU / 5.0;
        let pos = center.add(Vector2::from_angle(angle).scale(radius));
        points[i] = (pos, weapon);
    }
    points
}

#[derive(Debug, Clone)]
pub struct WeaponCrate {
    pub id: String,
    pub position: Vector2,
    pub weapon_type: WeaponType,
    pub available: bool,
    pub last_picked_up: Option<Instant>,
}

impl WeaponCrate {
    pub fn new(id: String, position: Vector2, weapon_type: WeaponType) -> Self {
        Self {
            id,
            position,
            weapon_type,
            available: true,
            last_picked_up: None,
        }
    }

    pub fn can_pick_up(&self, player_position: Vector2) -> bool {
        self.available && self.position.distance(player_position) <= CRATE_PICKUP_RANGE
    }

    pub fn pick_up(&mut self, now: Instant) {
        self.available = false;
        self.last_picked_up = Some(now);
    }

    pub fn respawn_if_due(&mut self, now: Instant) {
        if self.available {
            return;
        }
        if let Some(last) = self.last_picked_up
            && now.duration_since(last).as_secs_f64() >= CRATE_RESPAWN_SECS
        {
            self.available = true;
            self.last_picked_up = None;
        }
    }
}
