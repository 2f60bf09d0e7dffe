use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};
use std::time::Instant;

use crate::domain::match_state::MatchConfig;
use crate::error::ArenaResult;
use crate::net::message::{ClientMessage, server_envelope};
use crate::net::session::SessionManager;
use crate::room::Room;

#[derive(Debug, Clone)]
pub enum RoomInboundEvent {
    PlayerMessage(String, ClientMessage),
    PlayerDisconnected(String),
}

struct ManagerState {
    rooms: HashMap<String, Arc<Room>>,
    waiting: Vec<String>,
    player_to_room: HashMap<String, String>,
    next_room_seq: u64,
}

/// Matchmaking and the player→room index (spec.md §4.7). A single `RwLock`
/// stands in for the spec's three separately-named indexes (`rooms`,
/// `waitingPlayers`, `playerToRoom`) since all three are always mutated
/// together under one manager-held lock anyway.
///
/// Messages are routed by looking up the player's current room on every
/// call rather than handing the connection a fixed channel at join time —
/// a lone waiting player has no room yet, and a channel captured before
/// pairing would go stale the moment matchmaking creates one.
pub struct RoomManager {
    state: RwLock<ManagerState>,
    session_manager: Arc<SessionManager>,
    match_config: MatchConfig,
    shutdown: tokio::sync::watch::Receiver<bool>,
    self_ref: Weak<RoomManager>,
}

impl RoomManager {
    /// Returns an `Arc` rather than `Self` because every room it creates
    /// needs a weak back-reference (via the panic-termination callback) to
    /// call back into `remove_terminated_room` — `Arc::new_cyclic` is the
    /// only way to hand a room that reference before the manager itself is
    /// fully constructed.
    pub fn new(
        session_manager: Arc<SessionManager>,
        match_config: MatchConfig,
        shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            state: RwLock::new(ManagerState {
                rooms: HashMap::new(),
                waiting: Vec::new(),
                player_to_room: HashMap::new(),
                next_room_seq: 0,
            }),
            session_manager,
            match_config,
            shutdown,
            self_ref: self_ref.clone(),
        })
    }

    fn send_room_joined(&self, room_id: &str, player_id: &str) {
        if let Ok(envelope) = server_envelope(
            "room:joined",
            0,
            serde_json::json!({ "roomId": room_id, "playerId": player_id }),
        ) {
            self.session_manager.send_critical(player_id, envelope);
        }
    }

    /// Add-player protocol (spec.md §4.7): prefer an existing one-player room
    /// whose match hasn't ended (reconnect/tab-reload), else queue and pair
    /// off into a fresh room once two are waiting.
    pub fn add_player(&self, player_id: String) -> ArenaResult<()> {
        let mut state = self
            .state
            .write()
            .expect("room manager lock should never be poisoned");

        if let Some(room) = state
            .rooms
            .values()
            .find(|room| room.player_count() == 1 && !room.match_ended())
        {
            let room = Arc::clone(room);
            room.add_player(player_id.clone(), Instant::now());
            state
                .player_to_room
                .insert(player_id.clone(), room.id.clone());
            drop(state);
            self.send_room_joined(&room.id, &player_id);
            return Ok(());
        }

        state.waiting.push(player_id);
        if state.waiting.len() < 2 {
            return Ok(());
        }

        let first = state.waiting.remove(0);
        let second = state.waiting.remove(0);
        state.next_room_seq += 1;
        let room_id = format!("room-{}", state.next_room_seq);

        let terminated_room_id = room_id.clone();
        let self_ref = self.self_ref.clone();
        let on_terminate: crate::room::TerminationCallback = Box::new(move || {
            if let Some(manager) = self_ref.upgrade() {
                manager.remove_terminated_room(&terminated_room_id);
            }
        });

        let room = Room::spawn(
            room_id.clone(),
            self.match_config,
            Arc::clone(&self.session_manager),
            self.shutdown.clone(),
            on_terminate,
        );

        let now = Instant::now();
        room.add_player(first.clone(), now);
        room.add_player(second.clone(), now);

        state.player_to_room.insert(first.clone(), room_id.clone());
        state.player_to_room.insert(second.clone(), room_id.clone());
        state.rooms.insert(room_id.clone(), room);
        drop(state);

        self.send_room_joined(&room_id, &first);
        self.send_room_joined(&room_id, &second);

        Ok(())
    }

    /// Forwards an already-parsed client message to the player's current
    /// room, if they're in one yet. Silently dropped while still waiting —
    /// there is no simulation to apply it to (spec.md §7, gameplay contract
    /// violations are logged and skipped, not fatal).
    pub fn route_message(&self, player_id: &str, message: ClientMessage) {
        let state = self
            .state
            .read()
            .expect("room manager lock should never be poisoned");
        if let Some(room_id) = state.player_to_room.get(player_id)
            && let Some(room) = state.rooms.get(room_id)
        {
            let _ = room
                .inbound_tx
                .try_send(RoomInboundEvent::PlayerMessage(
                    player_id.to_string(),
                    message,
                ));
        }
    }

    pub fn remove_player(&self, player_id: &str) {
        let mut state = self
            .state
            .write()
            .expect("room manager lock should never be poisoned");

        if let Some(pos) = state.waiting.iter().position(|id| id == player_id) {
            state.waiting.remove(pos);
            return;
        }

        if let Some(room_id) = state.player_to_room.remove(player_id)
            && let Some(room) = state.rooms.get(&room_id)
        {
            let room = Arc::clone(room);
            let _ = room
                .inbound_tx
                .try_send(RoomInboundEvent::PlayerDisconnected(player_id.to_string()));
            room.remove_player(player_id);
            if room.player_count() == 0 {
                state.rooms.remove(&room_id);
            }
        }
    }

    /// Invoked by a room's panic-termination callback (see `Room::spawn`).
    /// Drops the room from both the id→room map and the player→room index so
    /// `route_message` stops enqueueing onto its now-abandoned channel.
    fn remove_terminated_room(&self, room_id: &str) {
        let mut state = self
            .state
            .write()
            .expect("room manager lock should never be poisoned");
        if state.rooms.remove(room_id).is_some() {
            state.player_to_room.retain(|_, rid| rid != room_id);
        }
    }

    pub fn room_count(&self) -> usize {
        self.state
            .read()
            .expect("room manager lock should never be poisoned")
            .rooms
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_manager() -> Arc<RoomManager> {
        let (_tx, rx) = tokio::sync::watch::channel(false);
        RoomManager::new(Arc::new(SessionManager::new()), MatchConfig::TEST_MODE, rx)
    }

    #[test]
    fn single_player_parks_in_the_waiting_queue() {
        let manager = fresh_manager();
        assert!(manager.add_player("a".into()).is_ok());
        assert_eq!(manager.room_count(), 0);
    }

    #[test]
    fn second_player_creates_a_shared_room() {
        let manager = fresh_manager();
        manager.add_player("a".into()).unwrap();
        manager.add_player("b".into()).unwrap();
        assert_eq!(manager.room_count(), 1);
    }

    #[test]
    fn removing_the_only_waiting_player_clears_the_queue() {
        let manager = fresh_manager();
        manager.add_player("a".into()).unwrap();
        manager.remove_player("a");
        manager.add_player("b".into()).unwrap();
        manager.add_player("c".into()).unwrap();
        assert_eq!(manager.room_count(), 1);
    }

    #[test]
    fn remove_terminated_room_clears_the_room_and_its_player_index() {
        let manager = fresh_manager();
        manager.add_player("a".into()).unwrap();
        manager.add_player("b".into()).unwrap();
        assert_eq!(manager.room_count(), 1);

        let room_id = {
            let state = manager.state.read().unwrap();
            state.rooms.keys().next().unwrap().clone()
        };

        manager.remove_terminated_room(&room_id);
        assert_eq!(manager.room_count(), 0);

        let state = manager.state.read().unwrap();
        assert!(!state.player_to_room.contains_key("a"));
        assert!(!state.player_to_room.contains_key("b"));
    }
}
