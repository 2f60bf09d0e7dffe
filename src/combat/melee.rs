use std::time::Instant;

use crate::domain::player::{ARENA_MAX_X, ARENA_MAX_Y, ARENA_MIN_X, ARENA_MIN_Y, PlayerState};
use crate::domain::vector::Vector2;
use crate::domain::weapon::WeaponConfig;

/// Whether `victim` falls inside the attacker's melee arc: within `range` and
/// within `arc_degrees / 2` of `aim_angle`, bearing measured from `origin`.
pub fn within_melee_arc(
    origin: Vector2,
    aim_angle: f64,
    range: f64,
    arc_degrees: f64,
    victim_position: Vector2,
) -> bool {
    let to_victim = victim_position.sub(origin);
    let distance = to_victim.length();
    if distance > range {
        return false;
    }
    if distance < f64::EPSILON {
        return true;
    }

    let bearing = to_victim.angle();
    let mut delta = (bearing - aim_angle).rem_euclid(std::f64::consts::TAU);
    if delta > std::f64::consts::PI {
        delta -= std::f64::consts::TAU;
    }

    delta.abs() <= (arc_degrees.to_radians() / 2.0)
}

/// Multi-hit melee resolution: every legal victim within the arc is struck
/// this swing, unlike hitscan/projectiles which stop at the first hit.
pub fn resolve_melee_hits<'a>(
    attacker_id: &str,
    origin: Vector2,
    aim_angle: f64,
    config: &WeaponConfig,
    players: impl IntoIterator<Item = &'a PlayerState>,
    now: Instant,
) -> Vec<String> {
    players
        .into_iter()
        .filter(|victim| victim.id != attacker_id)
        .filter(|victim| victim.is_alive())
        .filter(|victim| !victim.is_spawn_invulnerable(now))
        .filter(|victim| !victim.is_in_roll_iframe(now))
        .filter(|victim| {
            within_melee_arc(
                origin,
                aim_angle,
                config.range,
                config.melee_arc_degrees,
                victim.position,
            )
        })
        .map(|victim| victim.id.clone())
        .collect()
}

/// Pushes `victim_position` away from `origin` by `config.knockback` pixels,
/// clamped back into the arena.
pub fn apply_knockback(origin: Vector2, victim_position: Vector2, knockback: f64) -> Vector2 {
    if knockback <= 0.0 {
        return victim_position;
    }
    let away = victim_position.sub(origin);
    let direction = if away.length() > f64::EPSILON {
        away.normalize()
    } else {
        Vector2::new(1.0, 0.0)
    };
    let pushed = victim_position.add(direction.scale(knockback));
    Vector2::new(
        pushed.x.clamp(ARENA_MIN_X, ARENA_MAX_X),
        pushed.y.clamp(ARENA_MIN_Y, ARENA_MAX_Y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::weapon::WeaponType;

    #[test]
    fn victim_dead_ahead_within_range_is_in_arc() {
        let hit = within_melee_arc(
            Vector2::new(0.0, 0.0),
            0.0,
            64.0,
            90.0,
            Vector2::new(50.0, 0.0),
        );
        assert!(hit);
    }

    #[test]
    fn victim_behind_attacker_is_out_of_arc() {
        let hit = within_melee_arc(
            Vector2::new(0.0, 0.0),
            0.0,
            64.0,
            90.0,
            Vector2::new(-50.0, 0.0),
        );
        assert!(!hit);
    }

    #[test]
    fn victim_beyond_range_is_rejected_even_on_axis() {
        let hit = within_melee_arc(
            Vector2::new(0.0, 0.0),
            0.0,
            64.0,
            90.0,
            Vector2::new(100.0, 0.0),
        );
        assert!(!hit);
    }

    #[test]
    fn bat_knockback_pushes_away_from_attacker() {
        let config = WeaponConfig::for_type(WeaponType::Bat);
        let pushed = apply_knockback(
            Vector2::new(0.0, 0.0),
            Vector2::new(50.0, 0.0),
            config.knockback,
        );
        assert!(pushed.x > 50.0);
    }

    #[test]
    fn katana_has_no_knockback() {
        let config = WeaponConfig::for_type(WeaponType::Katana);
        assert_eq!(config.knockback, 0.0);
        let pushed = apply_knockback(Vector2::new(0.0, 0.0), Vector2::new(50.0, 0.0), config.knockback);
        assert_eq!(pushed, Vector2::new(50.0, 0.0));
    }

    #[test]
    fn melee_can_hit_multiple_players_in_one_swing() {
        let now = Instant::now();
        let config = WeaponConfig::for_type(WeaponType::Katana);
        let mut v1 = PlayerState::new("v1".into(), Vector2::new(40.0, 0.0), now);
        v1.invulnerable_until = None;
        let mut v2 = PlayerState::new("v2".into(), Vector2::new(0.0, 40.0), now);
        v2.invulnerable_until = None;

        let hits = resolve_melee_hits(
            "attacker",
            Vector2::new(0.0, 0.0),
            0.0,
            config,
            [&v1, &v2],
            now,
        );
        assert_eq!(hits.len(), 2);
    }
}
