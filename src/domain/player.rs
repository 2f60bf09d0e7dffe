use std::time::Instant;

use serde::Serialize;

use crate::domain::vector::Vector2;

pub const MAX_HEALTH: i32 = 100;
pub const ARENA_WIDTH: f64 = 1920.0;
pub const ARENA_HEIGHT: f64 = 1080.0;
pub const HITBOX_HALF_WIDTH: f64 = 16.0;
pub const HITBOX_HALF_HEIGHT: f64 = 32.0;
pub const ARENA_MIN_X: f64 = HITBOX_HALF_WIDTH;
pub const ARENA_MAX_X: f64 = ARENA_WIDTH - HITBOX_HALF_WIDTH;
pub const ARENA_MIN_Y: f64 = HITBOX_HALF_HEIGHT;
pub const ARENA_MAX_Y: f64 = ARENA_HEIGHT - HITBOX_HALF_HEIGHT;

pub const WALK_SPEED: f64 = 200.0;
pub const SPRINT_SPEED: f64 = 300.0;
pub const ACCEL_RATE: f64 = 50.0;
pub const DECEL_RATE: f64 = 1500.0;

pub const ROLL_SPEED: f64 = 250.0;
pub const ROLL_DURATION_MS: u64 = 400;
pub const ROLL_IFRAME_MS: u64 = 200;
pub const ROLL_COOLDOWN_SECS: f64 = 3.0;

pub const SPAWN_INVULN_SECS: f64 = 2.0;
pub const REGEN_DELAY_SECS: f64 = 5.0;
pub const REGEN_PER_SEC: f64 = 10.0;
pub const RESPAWN_DELAY_SECS: f64 = 3.0;

/// Raw per-tick input for one player. Movement/aim is "latest wins"; discrete
/// actions are drained and handled per-message by the room simulation.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub aim_angle: f64,
    pub is_sprinting: bool,
    pub sequence: u32,
}

impl InputSnapshot {
    /// Raw direction vector, normalized so diagonals don't out-pace cardinals.
    pub fn direction(&self) -> Vector2 {
        let mut x = 0.0;
        let mut y = 0.0;
        if self.up {
            y -= 1.0;
        }
        if self.down {
            y += 1.0;
        }
        if self.left {
            x -= 1.0;
        }
        if self.right {
            x += 1.0;
        }
        Vector2::new(x, y).normalize()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DodgeRoll {
    pub rolling: bool,
    pub start: Option<Instant>,
    pub last_roll: Option<Instant>,
    pub direction: Vector2,
}

impl DodgeRoll {
    pub fn new() -> Self {
        Self {
            rolling: false,
            start: None,
            last_roll: None,
            direction: Vector2::ZERO,
        }
    }

    pub fn cooldown_elapsed(&self, now: Instant) -> bool {
        match self.last_roll {
            Some(last) => now.duration_since(last).as_secs_f64() >= ROLL_COOLDOWN_SECS,
            None => true,
        }
    }

    pub fn in_iframe(&self, now: Instant) -> bool {
        if !self.rolling {
            return false;
        }
        match self.start {
            Some(start) => now.duration_since(start).as_millis() < ROLL_IFRAME_MS as u128,
            None => false,
        }
    }

    pub fn expired(&self, now: Instant) -> bool {
        match self.start {
            Some(start) => now.duration_since(start).as_millis() >= ROLL_DURATION_MS as u128,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CorrectionStats {
    pub total_updates: u64,
    pub total_corrections: u64,
    pub last_correction: Option<u64>,
}

/// Authoritative per-player state. Created on connection, mutated only on
/// the owning room's simulation thread, destroyed on disconnect.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: String,
    pub position: Vector2,
    pub velocity: Vector2,
    pub aim_angle: f64,
    pub health: i32,
    pub invulnerable_until: Option<Instant>,
    pub death_instant: Option<Instant>,
    pub kills: u32,
    pub deaths: u32,
    pub xp: u32,
    pub regenerating: bool,
    pub fractional_hp: f64,
    pub last_damage: Option<Instant>,
    pub dodge_roll: DodgeRoll,
    pub last_processed_sequence: u32,
    pub last_input: InputSnapshot,
    pub correction_stats: CorrectionStats,
}

impl PlayerState {
    pub fn new(id: String, spawn: Vector2, now: Instant) -> Self {
        Self {
            id,
            position: spawn,
            velocity: Vector2::ZERO,
            aim_angle: 0.0,
            health: MAX_HEALTH,
            invulnerable_until: Some(now + std::time::Duration::from_secs_f64(SPAWN_INVULN_SECS)),
            death_instant: None,
            kills: 0,
            deaths: 0,
            xp: 0,
            regenerating: false,
            fractional_hp: 0.0,
            last_damage: Some(now),
            dodge_roll: DodgeRoll::new(),
            last_processed_sequence: 0,
            last_input: InputSnapshot::default(),
            correction_stats: CorrectionStats::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.death_instant.is_none()
    }

    pub fn is_spawn_invulnerable(&self, now: Instant) -> bool {
        match self.invulnerable_until {
            Some(until) => now < until,
            None => false,
        }
    }

    pub fn is_in_roll_iframe(&self, now: Instant) -> bool {
        self.dodge_roll.in_iframe(now)
    }

    /// Integer subtraction floored at 0; resets regen bookkeeping. Returns
    /// the actual amount applied (after the floor).
    pub fn apply_damage(&mut self, amount: i32, now: Instant) -> i32 {
        let before = self.health;
        self.health = (self.health - amount).max(0);
        self.last_damage = Some(now);
        self.regenerating = false;
        self.fractional_hp = 0.0;
        before - self.health
    }

    pub fn mark_dead(&mut self, now: Instant) {
        self.death_instant = Some(now);
        self.health = 0;
    }

    pub fn respawn(&mut self, spawn: Vector2, now: Instant) {
        self.position = spawn;
        self.velocity = Vector2::ZERO;
        self.death_instant = None;
        self.health = MAX_HEALTH;
        self.invulnerable_until = Some(now + std::time::Duration::from_secs_f64(SPAWN_INVULN_SECS));
        self.last_damage = Some(now);
        self.regenerating = false;
        self.fractional_hp = 0.0;
        self.dodge_roll = DodgeRoll::new();
    }

    /// Clamps position into the arena hitbox-inclusive region, sanitizing
    /// non-finite components first. Returns the clamped position.
    pub fn clamp_position(pos: Vector2) -> Vector2 {
        let pos = pos.sanitize();
        Vector2::new(
            pos.x.clamp(ARENA_MIN_X, ARENA_MAX_X),
            pos.y.clamp(ARENA_MIN_Y, ARENA_MAX_Y),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_floors_at_zero() {
        let mut p = PlayerState::new("a".into(), Vector2::ZERO, Instant::now());
        p.health = 10;
        let applied = p.apply_damage(50, Instant::now());
        assert_eq!(p.health, 0);
        assert_eq!(applied, 10);
    }

    #[test]
    fn clamp_keeps_position_inside_arena() {
        let clamped = PlayerState::clamp_position(Vector2::new(-100.0, 5000.0));
        assert_eq!(clamped.x, ARENA_MIN_X);
        assert_eq!(clamped.y, ARENA_MAX_Y);
    }
}
