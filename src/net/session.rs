use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_channel::{Sender, TrySendError};

use crate::net::message::Envelope;

pub const SEND_CHANNEL_CAPACITY: usize = 256;
pub const KEEPALIVE_INTERVAL_SECS: u64 = 20;
pub const IDLE_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Copy)]
pub struct PingTracker {
    last_ping_sent: Option<Instant>,
    measured_rtt: Duration,
}

impl Default for PingTracker {
    fn default() -> Self {
        Self {
            last_ping_sent: None,
            measured_rtt: Duration::from_millis(0),
        }
    }
}

impl PingTracker {
    pub fn record_ping_sent(&mut self, now: Instant) {
        self.last_ping_sent = Some(now);
    }

    pub fn record_pong(&mut self, now: Instant) {
        if let Some(sent) = self.last_ping_sent {
            self.measured_rtt = now.saturating_duration_since(sent);
        }
    }

    pub fn rtt(&self) -> Duration {
        self.measured_rtt
    }
}

struct Session {
    sender: Sender<Envelope>,
    ping: PingTracker,
    last_frame_at: Instant,
}

/// Tracks every connected player's outbound channel, measured RTT, and room
/// subscriptions, generalized from a single-subscription-per-type map down to
/// the single room type this crate hosts (spec.md §5).
#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, player_id: String, now: Instant) -> async_channel::Receiver<Envelope> {
        let (tx, rx) = async_channel::bounded(SEND_CHANNEL_CAPACITY);
        let session = Session {
            sender: tx,
            ping: PingTracker::default(),
            last_frame_at: now,
        };
        self.sessions
            .write()
            .expect("session map lock should never be poisoned")
            .insert(player_id, session);
        rx
    }

    pub fn disconnect(&self, player_id: &str) {
        self.sessions
            .write()
            .expect("session map lock should never be poisoned")
            .remove(player_id);
    }

    pub fn is_connected(&self, player_id: &str) -> bool {
        self.sessions
            .read()
            .expect("session map lock should never be poisoned")
            .contains_key(player_id)
    }

    pub fn touch(&self, player_id: &str, now: Instant) {
        if let Some(session) = self
            .sessions
            .write()
            .expect("session map lock should never be poisoned")
            .get_mut(player_id)
        {
            session.last_frame_at = now;
        }
    }

    pub fn is_idle(&self, player_id: &str, now: Instant) -> bool {
        self.sessions
            .read()
            .expect("session map lock should never be poisoned")
            .get(player_id)
            .map(|s| now.saturating_duration_since(s.last_frame_at).as_secs() >= IDLE_TIMEOUT_SECS)
            .unwrap_or(true)
    }

    pub fn record_ping_sent(&self, player_id: &str, now: Instant) {
        if let Some(session) = self
            .sessions
            .write()
            .expect("session map lock should never be poisoned")
            .get_mut(player_id)
        {
            session.ping.record_ping_sent(now);
        }
    }

    pub fn record_pong(&self, player_id: &str, now: Instant) {
        if let Some(session) = self
            .sessions
            .write()
            .expect("session map lock should never be poisoned")
            .get_mut(player_id)
        {
            session.ping.record_pong(now);
        }
    }

    pub fn measured_rtt(&self, player_id: &str) -> Duration {
        self.sessions
            .read()
            .expect("session map lock should never be poisoned")
            .get(player_id)
            .map(|s| s.ping.rtt())
            .unwrap_or_default()
    }

    /// Non-blocking send; a full channel is data loss, not an error (spec.md §5, §7).
    pub fn send(&self, player_id: &str, envelope: Envelope) -> bool {
        let sessions = self
            .sessions
            .read()
            .expect("session map lock should never be poisoned");
        match sessions.get(player_id) {
            Some(session) => match session.sender.try_send(envelope) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => false,
                Err(TrySendError::Closed(_)) => false,
            },
            None => false,
        }
    }

    pub fn send_all<'a>(&self, player_ids: impl Iterator<Item = &'a str>, envelope: &Envelope) {
        let sessions = self
            .sessions
            .read()
            .expect("session map lock should never be poisoned");
        for player_id in player_ids {
            if let Some(session) = sessions.get(player_id) {
                let _ = session.sender.try_send(envelope.clone());
            }
        }
    }

    /// Best-effort retry-once send for critical messages (`room:joined`,
    /// `match:ended`) per spec.md §4.7 — a full channel is tried a second
    /// time since a one-shot drop would lose essential state. Synchronous
    /// (rather than awaiting a runtime yield) so it can be called from both
    /// the async connection-accept path and the room simulation thread.
    pub fn send_critical(&self, player_id: &str, envelope: Envelope) -> bool {
        if self.send(player_id, envelope.clone()) {
            return true;
        }
        std::thread::yield_now();
        self.send(player_id, envelope)
    }

    pub fn send_all_critical<'a>(&self, player_ids: impl Iterator<Item = &'a str>, envelope: &Envelope) {
        for player_id in player_ids {
            self.send_critical(player_id, envelope.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_to_unknown_player_is_a_noop_failure() {
        let manager = SessionManager::new();
        let envelope = Envelope::new("test", 0, serde_json::Value::Null);
        assert!(!manager.send("ghost", envelope));
    }

    #[test]
    fn connect_then_send_delivers_to_receiver() {
        let manager = SessionManager::new();
        let rx = manager.connect("p1".into(), Instant::now());
        let envelope = Envelope::new("test", 0, serde_json::Value::Null);
        assert!(manager.send("p1", envelope));
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn disconnect_removes_the_session() {
        let manager = SessionManager::new();
        manager.connect("p1".into(), Instant::now());
        assert!(manager.is_connected("p1"));
        manager.disconnect("p1");
        assert!(!manager.is_connected("p1"));
    }

    #[test]
    fn rtt_reflects_ping_pong_round_trip() {
        let manager = SessionManager::new();
        manager.connect("p1".into(), Instant::now());
        let sent_at = Instant::now();
        manager.record_ping_sent("p1", sent_at);
        let pong_at = sent_at + Duration::from_millis(80);
        manager.record_pong("p1", pong_at);
        assert_eq!(manager.measured_rtt("p1"), Duration::from_millis(80));
    }
}
