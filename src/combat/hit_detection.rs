use std::time::Instant;

use crate::domain::{
    player::{HITBOX_HALF_HEIGHT, HITBOX_HALF_WIDTH, PlayerState},
    projectile::{Projectile, PROJECTILE_MAX_RANGE},
};

/// AABB test: `|proj.x - player.x| < 16 AND |proj.y - player.y| < 32`.
pub fn aabb_hit(projectile: &Projectile, player: &PlayerState) -> bool {
    (projectile.position.x - player.position.x).abs() < HITBOX_HALF_WIDTH
        && (projectile.position.y - player.position.y).abs() < HITBOX_HALF_HEIGHT
}

/// Whether `player` is a legal victim of `projectile` at `now`, before the
/// AABB test is even attempted. Order matches spec.md §4.5.
pub fn rejects_projectile_victim(
    projectile: &Projectile,
    player: &PlayerState,
    now: Instant,
) -> bool {
    !player.is_alive()
        || player.is_spawn_invulnerable(now)
        || player.is_in_roll_iframe(now)
        || player.id == projectile.owner_id
        || projectile.range_traveled() > PROJECTILE_MAX_RANGE
}

/// Finds the first player the projectile legally hits this tick, if any.
pub fn resolve_projectile_hit<'a>(
    projectile: &Projectile,
    players: impl IntoIterator<Item = &'a PlayerState>,
    now: Instant,
) -> Option<String> {
    for player in players {
        if rejects_projectile_victim(projectile, player, now) {
            continue;
        }
        if aabb_hit(projectile, player) {
            return Some(player.id.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vector::Vector2;
    use crate::domain::weapon::WeaponType;

    fn projectile_at(pos: Vector2) -> Projectile {
        Projectile::new(
            "proj".into(),
            "owner".into(),
            WeaponType::Uzi,
            pos,
            0.0,
            Instant::now(),
        )
    }

    #[test]
    fn rejects_same_owner() {
        let now = Instant::now();
        let mut player = PlayerState::new("owner".into(), Vector2::new(100.0, 100.0), now);
        player.invulnerable_until = None;
        let proj = projectile_at(Vector2::new(100.0, 100.0));
        assert!(rejects_projectile_victim(&proj, &player, now));
    }

    #[test]
    fn rejects_spawn_invulnerable_and_iframe_but_aabb_still_applies_otherwise() {
        let now = Instant::now();
        let mut victim = PlayerState::new("victim".into(), Vector2::new(100.0, 100.0), now);
        victim.invulnerable_until = None;
        let proj = projectile_at(Vector2::new(100.0, 100.0));
        assert!(!rejects_projectile_victim(&proj, &victim, now));
        assert!(aabb_hit(&proj, &victim));
    }
}
