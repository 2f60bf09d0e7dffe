use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::net::message::{PlayerMoveSnapshot, ProjectileSnapshot, server_envelope};
use crate::room::Room;

/// 20 Hz state-broadcast loop, independent of the 60 Hz simulation cadence
/// (spec.md §4.1, §9). Skips a cycle rather than queuing behind a slow tick —
/// stale state is worse than a dropped frame.
pub fn spawn_broadcast_thread(room: Arc<Room>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    std::thread::spawn(move || {
        let tick_budget = Duration::from_secs_f64(1.0 / super::BROADCAST_HZ as f64);

        loop {
            if *shutdown.borrow() || room.is_terminated() {
                return;
            }
            let tick_start = Instant::now();
            broadcast_once(&room);

            let elapsed = tick_start.elapsed();
            if let Some(remaining) = tick_budget.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    });
}

/// A poisoned lock here means a sibling simulation tick panicked moments ago
/// and hasn't finished terminating the room yet; recover the guard rather
/// than panic in turn — `room.is_terminated()` will stop this loop on the
/// next iteration regardless.
fn broadcast_once(room: &Arc<Room>) {
    let world = room.world.lock().unwrap_or_else(|e| e.into_inner());

    let players: Vec<PlayerMoveSnapshot> = world
        .join_order
        .iter()
        .filter_map(|id| {
            world.players.get(id).map(|player| PlayerMoveSnapshot {
                player_id: id.clone(),
                position: player.position,
                velocity: player.velocity,
                aim_angle: player.aim_angle,
                health: player.health,
                sequence: player.last_processed_sequence,
            })
        })
        .collect();

    let projectiles: Vec<ProjectileSnapshot> = world
        .projectiles
        .iter()
        .map(|p| ProjectileSnapshot {
            id: p.id.clone(),
            position: p.position,
            weapon_type: p.weapon_type,
        })
        .collect();

    let recipients = world.join_order.clone();
    drop(world);

    if let Ok(envelope) = server_envelope(
        "player:move",
        0,
        serde_json::json!({ "players": players, "projectiles": projectiles }),
    ) {
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }
}
