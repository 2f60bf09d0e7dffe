//! End-to-end scenarios from spec.md §8, wired across several modules
//! (player state, weapon config, hitscan/position-history, match state)
//! rather than exercised through the network/thread machinery, since the
//! literal inputs/outputs in each scenario are deterministic only once the
//! real clock and RNG are pinned down — exactly the "fake clock + fake RNG"
//! substitution the ambient test-tooling section calls for.

use std::time::{Duration, Instant};

use arena_core::combat::hitscan::{HitscanQuery, HitscanTarget, range_falloff_damage, resolve_hitscan, rewind_duration};
use arena_core::combat::position_history::PositionHistory;
use arena_core::domain::match_state::{EndReason, Match, MatchConfig, MatchStatus};
use arena_core::domain::player::PlayerState;
use arena_core::domain::vector::Vector2;
use arena_core::domain::weapon::{WeaponConfig, WeaponType, shotgun_pellet_angles};
use arena_core::physics::apply_movement;

/// Scenario 1: Pistol 4-shot kill. A and B 64px apart, A fires four times.
#[test]
fn pistol_four_shot_kill() {
    let t0 = Instant::now();
    let mut attacker = PlayerState::new("a".into(), Vector2::new(200.0, 540.0), t0);
    let mut victim = PlayerState::new("b".into(), Vector2::new(264.0, 540.0), t0);
    victim.invulnerable_until = None; // outside the 2s spawn-invuln window for this scenario

    let config = WeaponConfig::for_type(WeaponType::Pistol);
    let shot_times = [0.0, 0.34, 0.68, 1.02];
    let expected_health_after = [75, 50, 25, 0];

    let mut history = PositionHistory::new();
    history.record(victim.position, t0);

    for (shot_index, &offset) in shot_times.iter().enumerate() {
        let now = t0 + Duration::from_secs_f64(offset);

        let query = HitscanQuery {
            shooter_id: &attacker.id,
            origin: attacker.position,
            angle: 0.0,
            max_range: config.range,
            now,
            rewind: rewind_duration(Duration::from_millis(0)),
        };
        let target = HitscanTarget {
            player_id: &victim.id,
            current_position: victim.position,
            history: &history,
        };
        let hit = resolve_hitscan(&query, [target]);
        assert_eq!(hit, Some(victim.id.clone()), "shot {shot_index} should connect");

        let distance = attacker.position.distance(victim.position);
        let damage = range_falloff_damage(config.damage, distance, config.range).round() as i32;
        victim.apply_damage(damage, now);
        assert_eq!(victim.health, expected_health_after[shot_index]);

        if victim.health <= 0 {
            victim.mark_dead(now);
            attacker.kills += 1;
            attacker.xp += 100;
        }
    }

    assert!(!victim.is_alive());
    assert_eq!(attacker.kills, 1);
    assert_eq!(attacker.xp, 100);
}

/// Scenario 2: diagonal input reaches the same steady-state speed as a
/// cardinal one, at the documented magnitude.
#[test]
fn diagonal_movement_matches_cardinal_speed() {
    let now = Instant::now();
    let mut player = PlayerState::new("p".into(), Vector2::new(960.0, 540.0), now);
    player.last_input.up = true;
    player.last_input.right = true;

    for _ in 0..(6 * 60) {
        apply_movement(&mut player, 1.0 / 60.0, now);
    }

    assert!((player.velocity.length() - 200.0).abs() < 1.0);
    assert!((player.velocity.x - 141.4).abs() < 1.0);
    assert!((player.velocity.y - (-141.4)).abs() < 1.0);
}

/// Scenario 3: a roll toward a wall is cancelled the instant the clamp
/// changes the integrated position, and the cooldown still applies.
#[test]
fn roll_into_wall_cancels_and_starts_cooldown() {
    use arena_core::physics::try_start_roll;

    // 80ms of roll at 250px/s covers 20px; starting at x=20 the unclamped
    // integration would reach x=0, which the arena clamps to 16.
    let now = Instant::now();
    let mut player = PlayerState::new("p".into(), Vector2::new(20.0, 540.0), now);
    assert!(try_start_roll(&mut player, Some(Vector2::new(-1.0, 0.0)), now));

    let cancelled = apply_movement(&mut player, 0.08, now + Duration::from_millis(80));
    assert!(cancelled);
    assert_eq!(player.position, Vector2::new(16.0, 540.0));
    assert!(!player.dodge_roll.rolling);
    assert!(!player.dodge_roll.cooldown_elapsed(now + Duration::from_millis(81)));
}

/// Scenario 4: Shotgun pellets fan across the 15-degree arc and total damage
/// is bounded by `pellets * per-pellet damage` even if every pellet connects.
#[test]
fn shotgun_pellet_spread_and_damage_cap() {
    let config = WeaponConfig::for_type(WeaponType::Shotgun);
    let angles = shotgun_pellet_angles(0.0, config.spread_degrees, config.pellets);
    assert_eq!(angles.len(), 8);

    let half_arc = config.spread_degrees.to_radians() / 2.0;
    for angle in &angles {
        assert!(*angle >= -half_arc - 1e-9 && *angle <= half_arc + 1e-9);
    }
    // Strictly increasing: pellets are evenly, not randomly, distributed.
    assert!(angles.windows(2).all(|w| w[0] < w[1]));

    let shooter = Vector2::new(960.0, 540.0);
    let victim_position = Vector2::new(1200.0, 540.0);
    let distance = shooter.distance(victim_position);

    let mut total_damage = 0.0;
    for _ in &angles {
        total_damage += range_falloff_damage(config.damage, distance, config.range);
    }
    assert!(total_damage <= config.damage * config.pellets as f64);
    assert!(total_damage <= 60.0);
}

/// Scenario 5: lag-compensated hitscan rewinds the victim to their position
/// 80ms ago, not their current one.
#[test]
fn lag_compensated_hitscan_hits_the_rewound_position() {
    let t0 = Instant::now();
    let mut history = PositionHistory::new();
    history.record(Vector2::new(800.0, 540.0), t0);
    let t1 = t0 + Duration::from_millis(80);
    history.record(Vector2::new(860.0, 540.0), t1);

    let rtt = Duration::from_millis(80);
    let rewind = rewind_duration(rtt);
    assert_eq!(rewind, rtt);

    let config = WeaponConfig::for_type(WeaponType::Pistol);
    let query = HitscanQuery {
        shooter_id: "shooter",
        origin: Vector2::new(400.0, 540.0),
        angle: 0.0,
        max_range: config.range,
        now: t1,
        rewind,
    };
    let target = HitscanTarget {
        player_id: "victim",
        current_position: Vector2::new(860.0, 540.0),
        history: &history,
    };

    let hit = resolve_hitscan(&query, [target]);
    assert_eq!(hit, Some("victim".to_string()));

    // At query time t1 - 80ms the ray would have missed the *current*
    // position (860) had it not been rewound to the 800 snapshot; confirm
    // the damage computed against the rewound distance is exactly 25.
    let rewound_distance = query.origin.distance(Vector2::new(800.0, 540.0));
    let damage = range_falloff_damage(config.damage, rewound_distance, config.range);
    assert_eq!(damage.round() as i32, 25);
}

/// Scenario 6: match ends by kill target in test mode; final scores include
/// the zero-kill loser via `RegisteredPlayers`.
#[test]
fn match_ends_by_kill_target_with_zero_kill_loser_scored() {
    let mut m = Match::new(MatchConfig::TEST_MODE);
    m.register_player("a");
    m.register_player("b");
    m.start_if_ready(2, Instant::now());

    m.record_kill("a");
    m.check_kill_target("a");
    assert_eq!(m.status, MatchStatus::Active);

    m.record_kill("a");
    m.check_kill_target("a");
    assert_eq!(m.status, MatchStatus::Ended);
    assert_eq!(m.end_reason, Some(EndReason::KillTarget));

    assert_eq!(m.winners(), vec!["a".to_string()]);
    let scores: std::collections::HashMap<_, _> = m.final_scores().into_iter().collect();
    assert_eq!(scores.get("a"), Some(&2));
    assert_eq!(scores.get("b"), Some(&0));

    // Idempotent once ended.
    m.end(EndReason::TimeLimit);
    assert_eq!(m.end_reason, Some(EndReason::KillTarget));
}
