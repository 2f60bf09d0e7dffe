use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::combat::hit_detection::resolve_projectile_hit;
use crate::combat::hitscan::{HitscanQuery, HitscanTarget, rewind_duration};
use crate::combat::melee::{apply_knockback, resolve_melee_hits};
use crate::domain::match_state::EndReason;
use crate::domain::player::{
    MAX_HEALTH, REGEN_DELAY_SECS, REGEN_PER_SEC, RESPAWN_DELAY_SECS, PlayerState,
};
use crate::domain::projectile::Projectile;
use crate::domain::vector::Vector2;
use crate::domain::weapon::{WeaponConfig, WeaponKind, WeaponState, WeaponType};
use crate::net::message::{ClientMessage, MeleeFailureReason, ShootFailureReason, server_envelope};
use crate::physics::{apply_movement, clamp_dt, try_start_roll};
use crate::room::Room;
use crate::room::manager::RoomInboundEvent;

const SPAWN_SAMPLE_COUNT: usize = 10;
const SPAWN_SAMPLE_X_MIN: f64 = 100.0;
const SPAWN_SAMPLE_X_MAX: f64 = 1820.0;
const SPAWN_SAMPLE_Y_MIN: f64 = 100.0;
const SPAWN_SAMPLE_Y_MAX: f64 = 980.0;
const FALLBACK_SPAWN: Vector2 = Vector2 { x: 960.0, y: 540.0 };

pub fn spawn_simulation_thread(room: Arc<Room>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    std::thread::spawn(move || {
        let tick_budget = Duration::from_secs_f64(1.0 / super::SIM_HZ as f64);
        let inbound = room.inbound_receiver();
        let mut previous_tick = Instant::now();

        loop {
            if *shutdown.borrow() {
                return;
            }
            let tick_start = Instant::now();
            let dt = clamp_dt(tick_start.duration_since(previous_tick).as_secs_f64());
            previous_tick = tick_start;

            let room_ref = &room;
            let inbound_ref = &inbound;
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                run_tick(room_ref, inbound_ref, dt, tick_start)
            }));

            let terminate = match outcome {
                Ok(terminate) => terminate,
                Err(payload) => {
                    log::error!("room {} tick panicked: {}", room.id, panic_payload_message(&payload));
                    terminate_after_panic(&room);
                    true
                }
            };

            if terminate {
                return;
            }

            let _ = shutdown.has_changed();
            let elapsed = tick_start.elapsed();
            if let Some(remaining) = tick_budget.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    });
}

fn panic_payload_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A tick panic terminates only this room: every connected player gets a
/// terminal `error` frame and the manager is told to drop the room via the
/// callback injected at `Room::spawn`. The world lock is poisoned by the
/// unwind, so its guard is recovered rather than trusted — the data
/// underneath is whatever the tick last wrote before panicking, which is
/// good enough for a player-id list we're about to discard anyway.
fn terminate_after_panic(room: &Arc<Room>) {
    let world = room.world.lock().unwrap_or_else(|e| e.into_inner());
    let recipients = world.join_order.clone();
    drop(world);

    if let Ok(envelope) = server_envelope(
        "error",
        0,
        serde_json::json!({
            "code": "room_terminated",
            "message": "this match encountered an internal error and has been closed",
        }),
    ) {
        room.session_manager
            .send_all_critical(recipients.iter().map(String::as_str), &envelope);
    }

    room.notify_terminated();
}

/// Runs one simulation tick. Returns `true` if the room should terminate.
fn run_tick(
    room: &Arc<Room>,
    inbound: &async_channel::Receiver<RoomInboundEvent>,
    dt: f64,
    now: Instant,
) -> bool {
    let mut world = room.world.lock().unwrap_or_else(|e| e.into_inner());

    while let Ok(event) = inbound.try_recv() {
        match event {
            RoomInboundEvent::PlayerMessage(player_id, message) => {
                apply_client_message(room, &mut world, &player_id, message, now);
            }
            RoomInboundEvent::PlayerDisconnected(player_id) => {
                let envelope = server_envelope(
                    "player:left",
                    0,
                    serde_json::json!({ "playerId": player_id }),
                );
                if let Ok(envelope) = envelope {
                    let recipients: Vec<String> = world.join_order.clone();
                    room.session_manager
                        .send_all(recipients.iter().map(String::as_str), &envelope);
                }
            }
        }
    }

    let player_ids: Vec<String> = world.join_order.clone();
    for player_id in &player_ids {
        let rolling_was_cancelled = {
            let Some(player) = world.players.get_mut(player_id) else {
                continue;
            };
            if !player.is_alive() {
                continue;
            }
            apply_movement(player, dt, now)
        };
        if rolling_was_cancelled {
            let envelope =
                server_envelope("roll:end", 0, serde_json::json!({ "playerId": player_id }));
            if let Ok(envelope) = envelope {
                room.session_manager.send(player_id, envelope);
            }
        }
    }

    integrate_and_expire_projectiles(&mut world, dt, now);
    resolve_hits(room, &mut world, now);
    progress_respawn_and_regen(room, &mut world, dt, now);
    progress_match(room, &mut world, now);

    for player_id in &player_ids {
        if let Some(player) = world.players.get(player_id) {
            let position = player.position;
            if let Some(history) = world.histories.get_mut(player_id) {
                history.record(position, now);
            }
        }
    }

    for weapon_state in world.weapon_states.values_mut() {
        weapon_state.recover_recoil(dt);
        weapon_state.finish_reload_if_due(now);
    }

    for weapon_crate in world.crates.iter_mut() {
        weapon_crate.respawn_if_due(now);
    }

    false
}

fn apply_client_message(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    player_id: &str,
    message: ClientMessage,
    now: Instant,
) {
    match message {
        ClientMessage::InputState(payload) => {
            if let Some(player) = world.players.get_mut(player_id) {
                player.last_input.up = payload.up;
                player.last_input.down = payload.down;
                player.last_input.left = payload.left;
                player.last_input.right = payload.right;
                player.last_input.is_sprinting = payload.is_sprinting;
                player.last_input.aim_angle = payload.aim_angle;
                player.last_input.sequence = payload.sequence;
                player.aim_angle = payload.aim_angle;
                player.last_processed_sequence = payload.sequence;
            }
        }
        ClientMessage::Shoot(payload) => handle_shoot(room, world, player_id, payload.aim_angle, now),
        ClientMessage::Reload => handle_reload(world, player_id, now),
        ClientMessage::Melee(payload) => handle_melee(room, world, player_id, payload.aim_angle, now),
        ClientMessage::Roll(payload) => {
            if let Some(player) = world.players.get_mut(player_id) {
                try_start_roll(player, payload.direction, now);
            }
        }
        ClientMessage::Pickup(payload) => handle_pickup(room, world, player_id, &payload.crate_id, now),
        ClientMessage::RespawnRequest => handle_respawn_request(room, world, player_id, now),
    }
}

fn reject_shoot(room: &Arc<Room>, player_id: &str, reason: ShootFailureReason) {
    if let Ok(envelope) = server_envelope(
        "shoot:failed",
        0,
        serde_json::json!({ "reason": reason.as_str() }),
    ) {
        room.session_manager.send(player_id, envelope);
    }
}

fn handle_shoot(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    player_id: &str,
    aim_angle: f64,
    now: Instant,
) {
    let Some(player) = world.players.get(player_id) else {
        return reject_shoot(room, player_id, ShootFailureReason::NoPlayer);
    };
    if !player.is_alive() {
        return reject_shoot(room, player_id, ShootFailureReason::NoPlayer);
    }
    let is_sprinting = player.last_input.is_sprinting;
    let position = player.position;

    let Some(weapon_state) = world.weapon_states.get(player_id) else {
        return reject_shoot(room, player_id, ShootFailureReason::NoPlayer);
    };
    let reloading = weapon_state.reloading;
    let magazine = weapon_state.magazine;
    let can_fire = weapon_state.can_fire(now);
    let weapon_type = weapon_state.weapon_type;

    if reloading {
        return reject_shoot(room, player_id, ShootFailureReason::Reloading);
    }
    if magazine == 0 {
        world
            .weapon_states
            .get_mut(player_id)
            .expect("checked above")
            .start_reload(now);
        return reject_shoot(room, player_id, ShootFailureReason::Empty);
    }
    if !can_fire {
        return reject_shoot(room, player_id, ShootFailureReason::Cooldown);
    }

    let config = WeaponConfig::for_type(weapon_type);

    let spread_multiplier = if is_sprinting { 1.5 } else { 1.0 };
    let effective_spread = config.spread_degrees * spread_multiplier;

    let weapon_state = world
        .weapon_states
        .get_mut(player_id)
        .expect("checked above");
    weapon_state.magazine -= 1;
    weapon_state.last_shot = Some(now);
    if config.recoil.cap > 0.0 {
        let h = world
            .rng
            .random_range(-config.recoil.horizontal_spread..=config.recoil.horizontal_spread);
        weapon_state.recoil_pitch =
            (weapon_state.recoil_pitch + config.recoil.vertical_per_shot).min(config.recoil.cap);
        weapon_state.recoil_yaw = (weapon_state.recoil_yaw + h).clamp(-config.recoil.cap, config.recoil.cap);
    }

    match config.kind {
        WeaponKind::Hitscan => {
            fire_hitscan(room, world, player_id, position, aim_angle, effective_spread, config, now);
        }
        WeaponKind::Projectile => {
            let angle = sample_shot_angle(&mut world.rng, aim_angle, effective_spread);
            spawn_projectile(room, world, player_id, position, weapon_type, angle, now);
        }
        WeaponKind::ProjectileMulti => {
            for angle in crate::domain::weapon::shotgun_pellet_angles(aim_angle, effective_spread, config.pellets) {
                spawn_projectile(room, world, player_id, position, weapon_type, angle, now);
            }
        }
        WeaponKind::Melee => {}
    }

    if let Ok(envelope) = server_envelope(
        "weapon:state",
        0,
        serde_json::json!({
            "playerId": player_id,
            "weaponType": weapon_type,
            "magazine": world.weapon_states[player_id].magazine,
        }),
    ) {
        room.session_manager.send(player_id, envelope);
    }
}

fn sample_shot_angle(rng: &mut impl Rng, aim_angle: f64, spread_degrees: f64) -> f64 {
    if spread_degrees <= 0.0 {
        return aim_angle;
    }
    let half = spread_degrees.to_radians() / 2.0;
    aim_angle + rng.random_range(-half..=half)
}

fn spawn_projectile(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    owner_id: &str,
    position: Vector2,
    weapon_type: WeaponType,
    angle: f64,
    now: Instant,
) {
    let id = format!("proj-{}-{}", owner_id, world.projectiles.len() + world.rng.random::<u32>());
    let projectile = Projectile::new(id.clone(), owner_id.to_string(), weapon_type, position, angle, now);

    if let Ok(envelope) = server_envelope(
        "projectile:spawn",
        0,
        serde_json::json!({
            "id": id,
            "ownerId": owner_id,
            "position": projectile.position,
            "weaponType": weapon_type,
        }),
    ) {
        let recipients = world.join_order.clone();
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }

    world.projectiles.push(projectile);
}

fn fire_hitscan(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    shooter_id: &str,
    origin: Vector2,
    aim_angle: f64,
    spread_degrees: f64,
    config: &WeaponConfig,
    now: Instant,
) {
    let angle = sample_shot_angle(&mut world.rng, aim_angle, spread_degrees);
    let rtt = room.session_manager.measured_rtt(shooter_id);
    let rewind = rewind_duration(rtt);

    let query = HitscanQuery {
        shooter_id,
        origin,
        angle,
        max_range: config.range,
        now,
        rewind,
    };

    let targets: Vec<(String, Vector2)> = world
        .players
        .iter()
        .filter(|(id, _)| id.as_str() != shooter_id)
        .map(|(id, player)| (id.clone(), player.position))
        .collect();

    let hit_id = {
        let histories = &world.histories;
        let target_views = targets.iter().filter_map(|(id, position)| {
            histories.get(id).map(|history| HitscanTarget {
                player_id: id.as_str(),
                current_position: *position,
                history,
            })
        });
        crate::combat::hitscan::resolve_hitscan(&query, target_views)
    };

    if let Some(victim_id) = hit_id {
        let distance = world
            .players
            .get(&victim_id)
            .map(|v| v.position.distance(origin))
            .unwrap_or(0.0);
        let damage = crate::combat::hitscan::range_falloff_damage(config.damage, distance, config.range);
        apply_damage_and_broadcast(room, world, shooter_id, &victim_id, damage.round() as i32, None, now);

        if let Ok(envelope) = server_envelope(
            "hit:confirmed",
            0,
            serde_json::json!({ "victimId": victim_id, "damage": damage }),
        ) {
            room.session_manager.send(shooter_id, envelope);
        }
    }
}

fn integrate_and_expire_projectiles(world: &mut super::RoomWorld, dt: f64, now: Instant) {
    for projectile in world.projectiles.iter_mut() {
        projectile.integrate(dt);
    }
    world.projectiles.retain(|p| !p.should_expire(now));
}

fn resolve_hits(room: &Arc<Room>, world: &mut super::RoomWorld, now: Instant) {
    let mut hits = Vec::new();
    for projectile in &world.projectiles {
        let victim = resolve_projectile_hit(projectile, world.players.values(), now);
        if let Some(victim_id) = victim {
            hits.push((
                projectile.id.clone(),
                projectile.owner_id.clone(),
                projectile.weapon_type,
                projectile.range_traveled(),
                victim_id,
            ));
        }
    }

    for (projectile_id, owner_id, weapon_type, distance_traveled, victim_id) in hits {
        world.projectiles.retain(|p| p.id != projectile_id);
        // Damage comes from the projectile's own weapon type, not whatever
        // the owner is currently holding — the owner may have picked up a
        // different weapon while this shot was still in flight. Falloff
        // uses the same curve hitscan applies, measured by distance
        // travelled from the muzzle.
        let config = WeaponConfig::for_type(weapon_type);
        let damage = crate::combat::hitscan::range_falloff_damage(config.damage, distance_traveled, config.range);
        apply_damage_and_broadcast(
            room,
            world,
            &owner_id,
            &victim_id,
            damage.round() as i32,
            Some(projectile_id.clone()),
            now,
        );
        if let Ok(envelope) =
            server_envelope("hit:confirmed", 0, serde_json::json!({ "victimId": victim_id, "projectileId": projectile_id }))
        {
            room.session_manager.send(&owner_id, envelope);
        }
    }
}

fn apply_damage_and_broadcast(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    attacker_id: &str,
    victim_id: &str,
    damage: i32,
    projectile_id: Option<String>,
    now: Instant,
) {
    let Some(victim) = world.players.get_mut(victim_id) else {
        return;
    };
    if !victim.is_alive() {
        return;
    }
    victim.apply_damage(damage, now);
    let new_health = victim.health;
    let died = new_health <= 0;

    let recipients = world.join_order.clone();
    if let Ok(envelope) = server_envelope(
        "player:damaged",
        0,
        serde_json::json!({
            "victimId": victim_id,
            "attackerId": attacker_id,
            "damage": damage,
            "newHealth": new_health,
            "projectileId": projectile_id,
        }),
    ) {
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }

    if died {
        drive_death(room, world, attacker_id, victim_id, now);
    }
}

fn drive_death(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    attacker_id: &str,
    victim_id: &str,
    now: Instant,
) {
    if let Some(victim) = world.players.get_mut(victim_id) {
        if !victim.is_alive() {
            return;
        }
        victim.mark_dead(now);
        victim.deaths += 1;
    }

    let (killer_kills, killer_xp) = if let Some(attacker) = world.players.get_mut(attacker_id) {
        if attacker_id != victim_id {
            attacker.kills += 1;
            attacker.xp += 100;
        }
        (attacker.kills, attacker.xp)
    } else {
        (0, 0)
    };

    let recipients = world.join_order.clone();
    if let Ok(envelope) = server_envelope(
        "player:death",
        0,
        serde_json::json!({ "victimId": victim_id, "attackerId": attacker_id }),
    ) {
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }
    if let Ok(envelope) = server_envelope(
        "player:kill_credit",
        0,
        serde_json::json!({
            "killerId": attacker_id,
            "victimId": victim_id,
            "killerKills": killer_kills,
            "killerXP": killer_xp,
        }),
    ) {
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }

    if attacker_id != victim_id {
        world.match_state.record_kill(attacker_id);
        let was_active = world.match_state.status == crate::domain::match_state::MatchStatus::Active;
        world.match_state.check_kill_target(attacker_id);
        if was_active && world.match_state.status == crate::domain::match_state::MatchStatus::Ended {
            broadcast_match_ended(room, world);
        }
    }
}

fn broadcast_match_ended(room: &Arc<Room>, world: &super::RoomWorld) {
    let reason = match world.match_state.end_reason {
        Some(EndReason::KillTarget) => "kill_target",
        Some(EndReason::TimeLimit) => "time_limit",
        None => "unknown",
    };
    let recipients = world.join_order.clone();
    if let Ok(envelope) = server_envelope(
        "match:ended",
        0,
        serde_json::json!({
            "winners": world.match_state.winners(),
            "finalScores": world.match_state.final_scores(),
            "reason": reason,
        }),
    ) {
        room.session_manager
            .send_all_critical(recipients.iter().map(String::as_str), &envelope);
    }
}

fn progress_respawn_and_regen(room: &Arc<Room>, world: &mut super::RoomWorld, dt: f64, now: Instant) {
    let player_ids: Vec<String> = world.join_order.clone();
    for player_id in &player_ids {
        let should_respawn = {
            let Some(player) = world.players.get(player_id) else {
                continue;
            };
            !player.is_alive() && is_respawn_eligible(player, now)
        };

        if should_respawn {
            respawn_player(room, world, player_id, now);
            continue;
        }

        let Some(player) = world.players.get_mut(player_id) else {
            continue;
        };
        if !player.is_alive() || player.health >= MAX_HEALTH {
            continue;
        }
        let Some(last_damage) = player.last_damage else {
            continue;
        };
        if now.duration_since(last_damage).as_secs_f64() < REGEN_DELAY_SECS {
            continue;
        }
        player.fractional_hp += REGEN_PER_SEC * dt;
        let whole = player.fractional_hp.floor() as i32;
        if whole > 0 {
            player.health = (player.health + whole).min(MAX_HEALTH);
            player.fractional_hp -= whole as f64;
        }
    }
}

fn respawn_player(room: &Arc<Room>, world: &mut super::RoomWorld, player_id: &str, now: Instant) {
    let spawn_point = pick_spawn_point(world, Some(player_id));
    if let Some(player) = world.players.get_mut(player_id) {
        player.respawn(spawn_point, now);
    }
    world
        .weapon_states
        .insert(player_id.to_string(), WeaponState::default_weapon());

    if let Ok(envelope) = server_envelope(
        "player:respawn",
        0,
        serde_json::json!({ "playerId": player_id, "position": spawn_point }),
    ) {
        let recipients = world.join_order.clone();
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }
}

fn progress_match(room: &Arc<Room>, world: &mut super::RoomWorld, now: Instant) {
    let was_active = world.match_state.status == crate::domain::match_state::MatchStatus::Active;
    world.match_state.check_time_limit(now);
    if was_active && world.match_state.status == crate::domain::match_state::MatchStatus::Ended {
        broadcast_match_ended(room, world);
    }
}

fn handle_reload(world: &mut super::RoomWorld, player_id: &str, now: Instant) {
    if let Some(weapon_state) = world.weapon_states.get_mut(player_id)
        && !weapon_state.reloading
        && weapon_state.magazine < weapon_state.config().magazine
    {
        weapon_state.start_reload(now);
    }
}

fn handle_melee(
    room: &Arc<Room>,
    world: &mut super::RoomWorld,
    player_id: &str,
    aim_angle: f64,
    now: Instant,
) {
    let reject = |room: &Arc<Room>, reason: MeleeFailureReason| {
        if let Ok(envelope) =
            server_envelope("melee:failed", 0, serde_json::json!({ "reason": reason.as_str() }))
        {
            room.session_manager.send(player_id, envelope);
        }
    };

    let Some(player) = world.players.get(player_id) else {
        return reject(room, MeleeFailureReason::NoPlayer);
    };
    if !player.is_alive() {
        return reject(room, MeleeFailureReason::PlayerDead);
    }
    let origin = player.position;

    let Some(weapon_state) = world.weapon_states.get(player_id) else {
        return reject(room, MeleeFailureReason::NoWeapon);
    };
    let config = weapon_state.config();
    if config.kind != WeaponKind::Melee {
        return reject(room, MeleeFailureReason::NotMelee);
    }
    if !weapon_state.can_fire(now) {
        return;
    }

    world
        .weapon_states
        .get_mut(player_id)
        .expect("checked above")
        .last_shot = Some(now);

    let victims = resolve_melee_hits(player_id, origin, aim_angle, config, world.players.values(), now);
    for victim_id in victims {
        apply_damage_and_broadcast(room, world, player_id, &victim_id, config.damage.round() as i32, None, now);
        if config.knockback > 0.0
            && let Some(victim) = world.players.get_mut(&victim_id)
        {
            victim.position = apply_knockback(origin, victim.position, config.knockback);
        }
    }
}

fn handle_pickup(room: &Arc<Room>, world: &mut super::RoomWorld, player_id: &str, crate_id: &str, now: Instant) {
    let Some(player) = world.players.get(player_id) else {
        return;
    };
    if !player.is_alive() {
        return;
    }
    let player_position = player.position;

    let Some(weapon_crate) = world.crates.iter_mut().find(|c| c.id == crate_id) else {
        return;
    };
    if !weapon_crate.can_pick_up(player_position) {
        return;
    }
    weapon_crate.pick_up(now);
    let weapon_type = weapon_crate.weapon_type;

    world
        .weapon_states
        .insert(player_id.to_string(), WeaponState::new(weapon_type));

    if let Ok(envelope) = server_envelope(
        "weapon:pickup_confirmed",
        0,
        serde_json::json!({ "playerId": player_id, "crateId": crate_id, "weaponType": weapon_type }),
    ) {
        room.session_manager.send(player_id, envelope);
    }
}

/// Explicit respawn request: honored as soon as it's sent if the death delay
/// has already elapsed, otherwise ignored (the automatic timer in
/// `progress_respawn_and_regen` will pick it up once eligible).
fn handle_respawn_request(room: &Arc<Room>, world: &mut super::RoomWorld, player_id: &str, now: Instant) {
    let eligible = world
        .players
        .get(player_id)
        .map(|player| !player.is_alive() && is_respawn_eligible(player, now))
        .unwrap_or(false);
    if eligible {
        respawn_player(room, world, player_id, now);
    }
}

fn is_respawn_eligible(player: &PlayerState, now: Instant) -> bool {
    player
        .death_instant
        .map(|death| now.duration_since(death).as_secs_f64() >= RESPAWN_DELAY_SECS)
        .unwrap_or(false)
}

/// Samples `SPAWN_SAMPLE_COUNT` uniform points and keeps the one maximising
/// the minimum distance to any living enemy; falls back to arena centre if
/// no enemies exist (spec.md §4.3). `exclude_self` omits the respawning
/// player from the enemy set.
pub fn pick_spawn_point(world: &mut super::RoomWorld, exclude_self: Option<&str>) -> Vector2 {
    enemy_pick(world, exclude_self)
}

fn enemy_pick(world: &mut super::RoomWorld, exclude_self: Option<&str>) -> Vector2 {
    let enemies: Vec<Vector2> = world
        .players
        .iter()
        .filter(|(id, player)| Some(id.as_str()) != exclude_self && player.is_alive())
        .map(|(_, p)| p.position)
        .collect();

    if enemies.is_empty() {
        return FALLBACK_SPAWN;
    }

    let mut best = FALLBACK_SPAWN;
    let mut best_min_distance = f64::MIN;
    for _ in 0..SPAWN_SAMPLE_COUNT {
        let candidate = Vector2::new(
            world.rng.random_range(SPAWN_SAMPLE_X_MIN..=SPAWN_SAMPLE_X_MAX),
            world.rng.random_range(SPAWN_SAMPLE_Y_MIN..=SPAWN_SAMPLE_Y_MAX),
        );
        let min_distance = enemies
            .iter()
            .map(|enemy| enemy.distance(candidate))
            .fold(f64::MAX, f64::min);
        if min_distance > best_min_distance {
            best_min_distance = min_distance;
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::match_state::MatchConfig;

    fn world_with(players: Vec<(&str, Vector2)>) -> super::super::RoomWorld {
        let mut world = super::super::RoomWorld::new(MatchConfig::TEST_MODE, Instant::now());
        for (id, pos) in players {
            let mut player = PlayerState::new(id.to_string(), pos, Instant::now());
            player.invulnerable_until = None;
            world.players.insert(id.to_string(), player);
            world.join_order.push(id.to_string());
        }
        world
    }

    #[test]
    fn spawn_point_falls_back_to_center_with_no_enemies() {
        let mut world = world_with(vec![]);
        let point = pick_spawn_point(&mut world, None);
        assert_eq!(point, FALLBACK_SPAWN);
    }

    #[test]
    fn spawn_point_favors_distance_from_enemies() {
        let mut world = world_with(vec![("enemy", Vector2::new(100.0, 100.0))]);
        let point = pick_spawn_point(&mut world, None);
        assert!(point.distance(Vector2::new(100.0, 100.0)) > 100.0);
    }

    #[test]
    fn sample_shot_angle_with_zero_spread_is_exact() {
        let mut rng = rand::rng();
        let angle = sample_shot_angle(&mut rng, 1.23, 0.0);
        assert_eq!(angle, 1.23);
    }

    #[test]
    fn terminate_after_panic_notifies_the_manager_and_sends_an_error_frame() {
        let (_tx, rx) = tokio::sync::watch::channel(true);
        let session_manager = Arc::new(crate::net::session::SessionManager::new());
        let player_rx = session_manager.connect("a".into(), Instant::now());

        let notified = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let notified_for_callback = Arc::clone(&notified);
        let room = Room::spawn(
            "room-panic".into(),
            MatchConfig::TEST_MODE,
            Arc::clone(&session_manager),
            rx,
            Box::new(move || {
                notified_for_callback.store(true, std::sync::atomic::Ordering::SeqCst);
            }),
        );
        room.add_player("a".into(), Instant::now());

        terminate_after_panic(&room);

        assert!(room.is_terminated());
        assert!(notified.load(std::sync::atomic::Ordering::SeqCst));

        let envelope = player_rx.try_recv().expect("player should receive a terminal frame");
        assert_eq!(envelope.kind, "error");
    }
}
