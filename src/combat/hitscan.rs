use std::time::{Duration, Instant};

use crate::combat::position_history::PositionHistory;
use crate::domain::vector::Vector2;

pub const LAG_COMPENSATION_CAP_MS: u64 = 150;
pub const HITSCAN_VICTIM_RADIUS: f64 = 16.0;

pub fn rewind_duration(measured_rtt: Duration) -> Duration {
    measured_rtt.min(Duration::from_millis(LAG_COMPENSATION_CAP_MS))
}

#[derive(Debug, Clone, Copy)]
pub struct HitscanCandidate {
    pub distance_along_ray: f64,
}

/// Ray-vs-circle intersection, shooter at `origin` firing along `angle`,
/// bounded by `max_range`, against a circle of radius `HITSCAN_VICTIM_RADIUS`
/// centred at `victim_position`. Returns the distance to the closest
/// intersection, if the ray hits the circle within range.
pub fn ray_circle_intersection(
    origin: Vector2,
    angle: f64,
    max_range: f64,
    victim_position: Vector2,
) -> Option<HitscanCandidate> {
    let direction = Vector2::from_angle(angle);
    let to_victim = victim_position.sub(origin);

    let projection = to_victim.x * direction.x + to_victim.y * direction.y;
    if projection < 0.0 {
        return None;
    }

    let closest_point = origin.add(direction.scale(projection));
    let perpendicular_distance = closest_point.distance(victim_position);
    if perpendicular_distance > HITSCAN_VICTIM_RADIUS {
        return None;
    }

    let half_chord =
        (HITSCAN_VICTIM_RADIUS * HITSCAN_VICTIM_RADIUS - perpendicular_distance * perpendicular_distance)
            .max(0.0)
            .sqrt();
    let hit_distance = projection - half_chord;
    if hit_distance < 0.0 || hit_distance > max_range {
        return None;
    }

    Some(HitscanCandidate {
        distance_along_ray: hit_distance,
    })
}

pub struct HitscanQuery<'a> {
    pub shooter_id: &'a str,
    pub origin: Vector2,
    pub angle: f64,
    pub max_range: f64,
    pub now: Instant,
    pub rewind: Duration,
}

pub struct HitscanTarget<'a> {
    pub player_id: &'a str,
    pub current_position: Vector2,
    pub history: &'a PositionHistory,
}

/// Resolves lag-compensated hitscan against every other player, selecting the
/// closest intersection. Note: does not consult spawn-invulnerability or
/// roll-iframes — preserved asymmetry with projectile hits (spec.md §4.5, §9).
pub fn resolve_hitscan<'a>(
    query: &HitscanQuery,
    targets: impl IntoIterator<Item = HitscanTarget<'a>>,
) -> Option<String> {
    let query_time = query.now.checked_sub(query.rewind).unwrap_or(query.now);

    let mut best: Option<(String, f64)> = None;
    for target in targets {
        if target.player_id == query.shooter_id {
            continue;
        }
        let rewound_position = target
            .history
            .position_at(query_time, target.current_position);

        if let Some(candidate) =
            ray_circle_intersection(query.origin, query.angle, query.max_range, rewound_position)
            && best
                .as_ref()
                .is_none_or(|(_, dist)| candidate.distance_along_ray < *dist)
        {
            best = Some((target.player_id.to_string(), candidate.distance_along_ray));
        }
    }

    best.map(|(id, _)| id)
}

/// Damage falloff beyond 50% of range: `damage * max(0, 1 - (d - r/2)/(r/2))`.
pub fn range_falloff_damage(base_damage: f64, distance: f64, range: f64) -> f64 {
    let half_range = range / 2.0;
    if distance <= half_range {
        return base_damage;
    }
    let falloff = (1.0 - (distance - half_range) / half_range).max(0.0);
    base_damage * falloff
}
