pub mod broadcast;
pub mod manager;
pub mod simulation;
pub mod timer;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::combat::position_history::PositionHistory;
use crate::domain::match_state::{Match, MatchConfig, MatchStatus};
use crate::domain::pickup::{WeaponCrate, crate_spawn_points};
use crate::domain::player::PlayerState;
use crate::domain::projectile::Projectile;
use crate::domain::weapon::WeaponState;
use crate::net::session::SessionManager;
use crate::room::manager::RoomInboundEvent;

pub const ROOM_CAPACITY: usize = 8;
pub const SIM_HZ: u64 = 60;
pub const BROADCAST_HZ: u64 = 20;
pub const TIMER_HZ: u64 = 1;

/// All mutable simulation state for one room, behind a single lock held for
/// the duration of a tick — the spec's per-entity lock set (room lock,
/// per-player RWLock, weapon-state map lock, RNG lock) collapses into one
/// `Mutex` here since the simulation thread already serializes every mutation
/// within a tick; the broadcast thread only ever takes a short-lived lock to
/// read a snapshot (see DESIGN.md).
pub struct RoomWorld {
    pub players: HashMap<String, PlayerState>,
    pub weapon_states: HashMap<String, WeaponState>,
    pub projectiles: Vec<Projectile>,
    pub crates: Vec<WeaponCrate>,
    pub histories: HashMap<String, PositionHistory>,
    pub match_state: Match,
    pub rng: StdRng,
    pub join_order: Vec<String>,
    pub last_tick: Instant,
}

impl RoomWorld {
    fn new(match_config: MatchConfig, now: Instant) -> Self {
        let crates = crate_spawn_points()
            .into_iter()
            .enumerate()
            .map(|(i, (pos, weapon))| WeaponCrate::new(format!("crate-{i}"), pos, weapon))
            .collect();

        Self {
            players: HashMap::new(),
            weapon_states: HashMap::new(),
            projectiles: Vec::new(),
            crates,
            histories: HashMap::new(),
            match_state: Match::new(match_config),
            rng: StdRng::from_os_rng(),
            join_order: Vec::new(),
            last_tick: now,
        }
    }
}

/// Invoked once, from the simulation thread, if a tick panics. Injected at
/// construction rather than a back-pointer from `Room` to `RoomManager` —
/// callbacks into the owning layer are explicit interfaces, not
/// back-pointers.
pub type TerminationCallback = Box<dyn Fn() + Send + Sync>;

pub struct Room {
    pub id: String,
    pub capacity: usize,
    pub world: Mutex<RoomWorld>,
    pub session_manager: Arc<SessionManager>,
    pub inbound_tx: async_channel::Sender<RoomInboundEvent>,
    inbound_rx: async_channel::Receiver<RoomInboundEvent>,
    on_terminate: TerminationCallback,
    terminated: AtomicBool,
}

impl Room {
    /// Constructs the room and spawns its three independent-cadence tasks:
    /// 60 Hz simulation, 20 Hz broadcast, 1 Hz match timer. Each is its own
    /// `std::thread`, generalized from the teacher's one-thread-per-room
    /// `SyncRuntime` into three since the dual-rate tick engine needs
    /// genuinely independent cadences (spec.md §4.1, §9 design notes).
    pub fn spawn(
        id: String,
        match_config: MatchConfig,
        session_manager: Arc<SessionManager>,
        shutdown: tokio::sync::watch::Receiver<bool>,
        on_terminate: TerminationCallback,
    ) -> Arc<Room> {
        let (inbound_tx, inbound_rx) = async_channel::unbounded();
        let now = Instant::now();

        let room = Arc::new(Room {
            id,
            capacity: ROOM_CAPACITY,
            world: Mutex::new(RoomWorld::new(match_config, now)),
            session_manager,
            inbound_tx,
            inbound_rx,
            on_terminate,
            terminated: AtomicBool::new(false),
        });

        simulation::spawn_simulation_thread(Arc::clone(&room), shutdown.clone());
        broadcast::spawn_broadcast_thread(Arc::clone(&room), shutdown.clone());
        timer::spawn_timer_thread(Arc::clone(&room), shutdown);

        room
    }

    /// Called once by the simulation thread after a tick panic, to let the
    /// owning manager drop this room and to stop the broadcast/timer loops
    /// from spinning against a dead room.
    pub fn notify_terminated(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        (self.on_terminate)();
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn add_player(&self, player_id: String, now: Instant) {
        let mut world = self.world.lock().unwrap_or_else(|e| e.into_inner());

        let spawn_point = simulation::pick_spawn_point(&mut world, None);
        world
            .players
            .insert(player_id.clone(), PlayerState::new(player_id.clone(), spawn_point, now));
        world
            .weapon_states
            .insert(player_id.clone(), WeaponState::default_weapon());
        world
            .histories
            .insert(player_id.clone(), PositionHistory::new());
        world.match_state.register_player(&player_id);
        world.join_order.push(player_id);

        let count = world.players.len();
        world.match_state.start_if_ready(count, now);
    }

    pub fn remove_player(&self, player_id: &str) {
        let mut world = self.world.lock().unwrap_or_else(|e| e.into_inner());
        world.players.remove(player_id);
        world.weapon_states.remove(player_id);
        world.histories.remove(player_id);
        world.join_order.retain(|id| id != player_id);
    }

    pub fn player_count(&self) -> usize {
        self.world
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .players
            .len()
    }

    pub fn match_ended(&self) -> bool {
        self.world
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .match_state
            .status
            == MatchStatus::Ended
    }

    pub fn inbound_receiver(&self) -> async_channel::Receiver<RoomInboundEvent> {
        self.inbound_rx.clone()
    }
}
