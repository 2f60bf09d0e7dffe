use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Weapons are configuration records plus a kind tag, not polymorphic
/// objects — the shooting path branches on the tag so the per-tick hot path
/// stays monomorphic (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeaponKind {
    Hitscan,
    Projectile,
    ProjectileMulti,
    Melee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponType {
    Pistol,
    Uzi,
    Ak47,
    Shotgun,
    Bat,
    Katana,
}

impl WeaponType {
    pub const ALL: [WeaponType; 6] = [
        WeaponType::Pistol,
        WeaponType::Uzi,
        WeaponType::Ak47,
        WeaponType::Shotgun,
        WeaponType::Bat,
        WeaponType::Katana,
    ];

    pub fn default_weapon() -> WeaponType {
        WeaponType::Pistol
    }
}

/// Recoil accumulation parameters for projectile weapons that have them.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoilConfig {
    pub vertical_per_shot: f64,
    pub horizontal_spread: f64,
    pub cap: f64,
    pub recover_per_sec: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct WeaponConfig {
    pub weapon_type: WeaponType,
    pub kind: WeaponKind,
    pub damage: f64,
    pub fire_rate: f64,
    pub magazine: u32,
    pub reload_ms: u64,
    pub range: f64,
    pub spread_degrees: f64,
    pub pellets: u32,
    pub melee_arc_degrees: f64,
    pub knockback: f64,
    pub recoil: RecoilConfig,
}

impl WeaponConfig {
    pub fn fire_interval_secs(&self) -> f64 {
        1.0 / self.fire_rate
    }

    pub fn for_type(weapon_type: WeaponType) -> &'static WeaponConfig {
        WEAPON_TABLE
            .iter()
            .find(|cfg| cfg.weapon_type == weapon_type)
            .expect("every WeaponType has a table entry")
    }
}

/// Static weapon table, loaded once at process start (spec.md §1, §6 — the
/// config source itself is an external collaborator; this is the flat table
/// the core consumes).
pub static WEAPON_TABLE: [WeaponConfig; 6] = [
    WeaponConfig {
        weapon_type: WeaponType::Pistol,
        kind: WeaponKind::Hitscan,
        damage: 25.0,
        fire_rate: 3.0,
        magazine: 15,
        reload_ms: 1500,
        range: 800.0,
        spread_degrees: 0.0,
        pellets: 1,
        melee_arc_degrees: 0.0,
        knockback: 0.0,
        recoil: RecoilConfig {
            vertical_per_shot: 0.0,
            horizontal_spread: 0.0,
            cap: 0.0,
            recover_per_sec: 0.0,
        },
    },
    WeaponConfig {
        weapon_type: WeaponType::Uzi,
        kind: WeaponKind::Projectile,
        damage: 8.0,
        fire_rate: 10.0,
        magazine: 30,
        reload_ms: 1500,
        range: 600.0,
        spread_degrees: 5.0,
        pellets: 1,
        melee_arc_degrees: 0.0,
        knockback: 0.0,
        recoil: RecoilConfig {
            vertical_per_shot: 2.0,
            horizontal_spread: 0.0,
            cap: 20.0,
            recover_per_sec: 40.0, // 20deg / 0.5s
        },
    },
    WeaponConfig {
        weapon_type: WeaponType::Ak47,
        kind: WeaponKind::Projectile,
        damage: 20.0,
        fire_rate: 6.0,
        magazine: 30,
        reload_ms: 2000,
        range: 800.0,
        spread_degrees: 3.0,
        pellets: 1,
        melee_arc_degrees: 0.0,
        knockback: 0.0,
        recoil: RecoilConfig {
            vertical_per_shot: 1.5,
            horizontal_spread: 3.0,
            cap: 15.0,
            recover_per_sec: 25.0, // 15deg / 0.6s
        },
    },
    WeaponConfig {
        weapon_type: WeaponType::Shotgun,
        kind: WeaponKind::ProjectileMulti,
        damage: 7.5,
        fire_rate: 1.0,
        magazine: 6,
        reload_ms: 2500,
        range: 300.0,
        spread_degrees: 15.0,
        pellets: 8,
        melee_arc_degrees: 0.0,
        knockback: 0.0,
        recoil: RecoilConfig {
            vertical_per_shot: 0.0,
            horizontal_spread: 0.0,
            cap: 0.0,
            recover_per_sec: 0.0,
        },
    },
    WeaponConfig {
        weapon_type: WeaponType::Bat,
        kind: WeaponKind::Melee,
        damage: 25.0,
        fire_rate: 2.0,
        magazine: 0,
        reload_ms: 0,
        range: 64.0,
        spread_degrees: 0.0,
        pellets: 0,
        melee_arc_degrees: 90.0,
        knockback: 40.0,
        recoil: RecoilConfig {
            vertical_per_shot: 0.0,
            horizontal_spread: 0.0,
            cap: 0.0,
            recover_per_sec: 0.0,
        },
    },
    WeaponConfig {
        weapon_type: WeaponType::Katana,
        kind: WeaponKind::Melee,
        damage: 45.0,
        fire_rate: 1.25,
        magazine: 0,
        reload_ms: 0,
        range: 80.0,
        spread_degrees: 0.0,
        pellets: 0,
        melee_arc_degrees: 90.0,
        knockback: 0.0,
        recoil: RecoilConfig {
            vertical_per_shot: 0.0,
            horizontal_spread: 0.0,
            cap: 0.0,
            recover_per_sec: 0.0,
        },
    },
];

/// Keyed by player id, separate from PlayerState (spec.md §3).
#[derive(Debug, Clone)]
pub struct WeaponState {
    pub weapon_type: WeaponType,
    pub magazine: u32,
    pub reloading: bool,
    pub reload_start: Option<Instant>,
    pub last_shot: Option<Instant>,
    pub recoil_pitch: f64,
    pub recoil_yaw: f64,
    pub last_recoil: Option<Instant>,
}

impl WeaponState {
    pub fn new(weapon_type: WeaponType) -> Self {
        let cfg = WeaponConfig::for_type(weapon_type);
        Self {
            weapon_type,
            magazine: cfg.magazine,
            reloading: false,
            reload_start: None,
            last_shot: None,
            recoil_pitch: 0.0,
            recoil_yaw: 0.0,
            last_recoil: None,
        }
    }

    pub fn default_weapon() -> Self {
        Self::new(WeaponType::default_weapon())
    }

    pub fn config(&self) -> &'static WeaponConfig {
        WeaponConfig::for_type(self.weapon_type)
    }

    pub fn can_fire(&self, now: Instant) -> bool {
        if self.reloading {
            return false;
        }
        if self.config().kind != WeaponKind::Melee && self.magazine == 0 {
            return false;
        }
        match self.last_shot {
            Some(last) => {
                now.duration_since(last).as_secs_f64() >= self.config().fire_interval_secs()
            }
            None => true,
        }
    }

    pub fn start_reload(&mut self, now: Instant) {
        self.reloading = true;
        self.reload_start = Some(now);
    }

    pub fn finish_reload_if_due(&mut self, now: Instant) {
        if !self.reloading {
            return;
        }
        if let Some(start) = self.reload_start
            && now.duration_since(start).as_millis() >= self.config().reload_ms as u128
        {
            self.magazine = self.config().magazine;
            self.reloading = false;
            self.reload_start = None;
        }
    }

    pub fn recover_recoil(&mut self, dt: f64) {
        let cfg = self.config();
        if cfg.recoil.cap <= 0.0 {
            return;
        }
        let recover = cfg.recoil.recover_per_sec * dt;
        self.recoil_pitch = shrink_toward_zero(self.recoil_pitch, recover);
        self.recoil_yaw = shrink_toward_zero(self.recoil_yaw, recover);
    }
}

/// Fans `pellets` shot angles evenly across `spread_degrees` centred on
/// `aim_angle`, for multi-pellet weapons like the Shotgun.
pub fn shotgun_pellet_angles(aim_angle: f64, spread_degrees: f64, pellets: u32) -> Vec<f64> {
    if pellets <= 1 {
        return vec![aim_angle];
    }
    let spread_rad = spread_degrees.to_radians();
    (0..pellets)
        .map(|i| {
            let fraction = i as f64 / (pellets - 1) as f64;
            aim_angle - spread_rad / 2.0 + fraction * spread_rad
        })
        .collect()
}

fn shrink_toward_zero(value: f64, step: f64) -> f64 {
    if value > 0.0 {
        (value - step).max(0.0)
    } else if value < 0.0 {
        (value + step).min(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weapon_table_has_one_entry_per_type() {
        for weapon_type in WeaponType::ALL {
            assert_eq!(WeaponConfig::for_type(weapon_type).weapon_type, weapon_type);
        }
    }

    #[test]
    fn empty_magazine_cannot_fire() {
        let mut w = WeaponState::new(WeaponType::Pistol);
        w.magazine = 0;
        assert!(!w.can_fire(Instant::now()));
    }

    #[test]
    fn shotgun_pellets_fan_evenly_across_the_arc() {
        let angles = shotgun_pellet_angles(0.0, 15.0, 8);
        assert_eq!(angles.len(), 8);
        let half = 15f64.to_radians() / 2.0;
        assert!((angles.first().unwrap() - (-half)).abs() < 1e-9);
        assert!((angles.last().unwrap() - half).abs() < 1e-9);
    }

    #[test]
    fn reload_refills_after_duration() {
        let mut w = WeaponState::new(WeaponType::Pistol);
        w.magazine = 0;
        let start = Instant::now() - std::time::Duration::from_millis(1600);
        w.reloading = true;
        w.reload_start = Some(start);
        w.finish_reload_if_due(Instant::now());
        assert!(!w.reloading);
        assert_eq!(w.magazine, w.config().magazine);
    }
}
