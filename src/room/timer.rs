use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::domain::match_state::MatchStatus;
use crate::net::message::server_envelope;
use crate::room::Room;

/// 1 Hz per-room match-timer broadcast. The kill-target win condition is
/// checked immediately after each death in the simulation tick; this loop
/// only drives the countdown and the time-limit condition (spec.md §4.8).
pub fn spawn_timer_thread(room: Arc<Room>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    std::thread::spawn(move || {
        let tick_budget = Duration::from_secs(1) / super::TIMER_HZ as u32;

        loop {
            if *shutdown.borrow() || room.is_terminated() {
                return;
            }
            let tick_start = Instant::now();
            if tick_once(&room) {
                return;
            }

            let elapsed = tick_start.elapsed();
            if let Some(remaining) = tick_budget.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }
    });
}

/// Returns `true` once the match has ended and the room has nothing left to
/// time. A poisoned lock is recovered rather than propagated — see the note
/// in `broadcast.rs`.
fn tick_once(room: &Arc<Room>) -> bool {
    let now = Instant::now();
    let mut world = room.world.lock().unwrap_or_else(|e| e.into_inner());

    if world.match_state.status != MatchStatus::Active {
        return world.match_state.status == MatchStatus::Ended;
    }

    let remaining = world.match_state.remaining_secs(now);
    let recipients = world.join_order.clone();
    drop(world);

    if let Ok(envelope) = server_envelope(
        "match:timer",
        0,
        serde_json::json!({ "remainingSeconds": remaining }),
    ) {
        room.session_manager
            .send_all(recipients.iter().map(String::as_str), &envelope);
    }

    false
}
