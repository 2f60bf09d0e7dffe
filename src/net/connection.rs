use std::time::Duration;

use crate::net::session::{KEEPALIVE_INTERVAL_SECS, SessionManager};

/// Runs until the session is gone or has been idle for 60 s, sending a
/// keepalive ping on `on_tick` every 20 s. The caller supplies `on_tick` to
/// actually push a WS ping frame, keeping this function transport-agnostic.
pub async fn run_keepalive<F>(session_manager: &SessionManager, player_id: &str, mut on_tick: F)
where
    F: FnMut(),
{
    let mut interval = tokio::time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
    interval.tick().await; // first tick fires immediately; skip it

    loop {
        if !session_manager.is_connected(player_id) {
            return;
        }
        let now = std::time::Instant::now();
        if session_manager.is_idle(player_id, now) {
            return;
        }
        interval.tick().await;
        if !session_manager.is_connected(player_id) {
            return;
        }
        on_tick();
        session_manager.record_ping_sent(player_id, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn keepalive_stops_once_session_disconnects() {
        let manager = SessionManager::new();
        manager.connect("p1".into(), Instant::now());
        manager.disconnect("p1");

        let mut ticks = 0;
        run_keepalive(&manager, "p1", || ticks += 1).await;
        assert_eq!(ticks, 0);
    }
}
