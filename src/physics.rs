use std::time::Instant;

use crate::domain::{
    player::{
        ACCEL_RATE, DECEL_RATE, PlayerState, ROLL_SPEED, SPRINT_SPEED, WALK_SPEED,
    },
    vector::Vector2,
};

/// Unclamped dt is a known hazard in the source this spec distills from — a
/// scheduler stall could let a fast projectile tunnel clean through a
/// hitbox. Capped here rather than left unbounded (see DESIGN.md).
pub const MAX_DT_SECS: f64 = 0.1;

pub fn clamp_dt(dt: f64) -> f64 {
    dt.clamp(0.0, MAX_DT_SECS)
}

/// `current + clamp(|target - current|, 0, rate*dt) * normalize(target - current)`,
/// snapping to target when the step would overshoot it.
pub fn accelerate_toward(current: Vector2, target: Vector2, rate: f64, dt: f64) -> Vector2 {
    let delta = target.sub(current);
    let distance = delta.length();
    if distance < f64::EPSILON {
        return target;
    }
    let step = (rate * dt).clamp(0.0, distance);
    if (step - distance).abs() < f64::EPSILON {
        return target;
    }
    current.add(delta.normalize().scale(step))
}

/// Applies one tick of acceleration-based movement to `player`, honoring the
/// dodge-roll override, and clamps the resulting position into the arena.
/// Returns `true` if a roll in progress was terminated by hitting a wall.
pub fn apply_movement(player: &mut PlayerState, dt: f64, now: Instant) -> bool {
    if player.dodge_roll.rolling {
        let pre_clamp = player.position.add(player.velocity.scale(dt));
        let clamped = PlayerState::clamp_position(pre_clamp);
        player.position = clamped;
        if clamped != pre_clamp {
            player.dodge_roll.rolling = false;
            return true;
        }
        if player.dodge_roll.expired(now) {
            player.dodge_roll.rolling = false;
        }
        return false;
    }

    let direction = player.last_input.direction();
    let target_speed = if player.last_input.is_sprinting {
        SPRINT_SPEED
    } else {
        WALK_SPEED
    };

    let target_velocity = if direction.length() > f64::EPSILON {
        direction.scale(target_speed)
    } else {
        Vector2::ZERO
    };

    let rate = if direction.length() > f64::EPSILON {
        ACCEL_RATE
    } else {
        DECEL_RATE
    };

    player.velocity = accelerate_toward(player.velocity, target_velocity, rate, dt);
    player.position = PlayerState::clamp_position(player.position.add(player.velocity.scale(dt)));
    false
}

/// Attempts to start a dodge roll. Returns true if accepted.
pub fn try_start_roll(
    player: &mut PlayerState,
    requested_direction: Option<Vector2>,
    now: Instant,
) -> bool {
    if !player.is_alive() {
        return false;
    }
    if player.dodge_roll.rolling {
        return false;
    }
    if !player.dodge_roll.cooldown_elapsed(now) {
        return false;
    }

    let direction = requested_direction
        .filter(|d| d.length() > f64::EPSILON)
        .unwrap_or_else(|| Vector2::from_angle(player.aim_angle));

    let direction = direction.normalize();
    if direction.length() < f64::EPSILON {
        return false;
    }

    player.dodge_roll.rolling = true;
    player.dodge_roll.start = Some(now);
    player.dodge_roll.last_roll = Some(now);
    player.dodge_roll.direction = direction;
    player.velocity = direction.scale(ROLL_SPEED);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_player() -> PlayerState {
        PlayerState::new("p".into(), Vector2::new(960.0, 540.0), Instant::now())
    }

    #[test]
    fn diagonal_input_reaches_same_steady_state_speed_as_cardinal() {
        let mut diag = fresh_player();
        diag.last_input.up = true;
        diag.last_input.right = true;

        let mut cardinal = fresh_player();
        cardinal.last_input.right = true;

        let now = Instant::now();
        for _ in 0..(6 * 60) {
            apply_movement(&mut diag, 1.0 / 60.0, now);
            apply_movement(&mut cardinal, 1.0 / 60.0, now);
        }

        assert!((diag.velocity.length() - WALK_SPEED).abs() < 1.0);
        assert!((cardinal.velocity.length() - WALK_SPEED).abs() < 1.0);
        assert!((diag.velocity.length() - cardinal.velocity.length()).abs() < 1.0);
    }

    #[test]
    fn roll_into_wall_cancels_and_clamps() {
        let mut player = fresh_player();
        player.position = Vector2::new(20.0, 540.0);
        let now = Instant::now();
        assert!(try_start_roll(&mut player, Some(Vector2::new(-1.0, 0.0)), now));

        // 80ms of roll at 250px/s would reach x=0, which the arena clamps to 16.
        let cancelled = apply_movement(&mut player, 0.08, now + std::time::Duration::from_millis(80));
        assert!(cancelled);
        assert_eq!(player.position.x, 16.0);
        assert!(!player.dodge_roll.rolling);
    }

    #[test]
    fn roll_cooldown_boundary() {
        let mut player = fresh_player();
        let now = Instant::now();
        assert!(try_start_roll(&mut player, Some(Vector2::new(1.0, 0.0)), now));
        player.dodge_roll.rolling = false;

        let almost = now + std::time::Duration::from_millis(2999);
        assert!(!try_start_roll(&mut player, Some(Vector2::new(1.0, 0.0)), almost));

        let after = now + std::time::Duration::from_millis(3001);
        assert!(try_start_roll(&mut player, Some(Vector2::new(1.0, 0.0)), after));
    }

    #[test]
    fn iframe_boundary() {
        let mut player = fresh_player();
        let now = Instant::now();
        try_start_roll(&mut player, Some(Vector2::new(1.0, 0.0)), now);

        assert!(player.dodge_roll.in_iframe(now + std::time::Duration::from_millis(199)));
        assert!(!player.dodge_roll.in_iframe(now + std::time::Duration::from_millis(201)));
    }

    #[test]
    fn dt_is_capped() {
        assert_eq!(clamp_dt(5.0), MAX_DT_SECS);
        assert_eq!(clamp_dt(-1.0), 0.0);
    }
}
