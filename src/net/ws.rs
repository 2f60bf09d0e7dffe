use std::sync::Arc;
use std::time::Instant;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::error::{ArenaError, ArenaResult};
use crate::net::connection;
use crate::net::message::{ClientMessage, Envelope};
use crate::net::session::SessionManager;
use crate::room::manager::RoomManager;

/// Accepts WebSocket connections and wires each one into the room/session
/// fabric, grounded on the teacher's accept-loop shape (one task per
/// connection, split sink/stream, a spawned writer forwarding a channel to
/// the socket) but fanning into room simulation instead of a generic handler
/// registry, since this crate hosts exactly one room type.
pub async fn serve(
    addr: &str,
    session_manager: Arc<SessionManager>,
    room_manager: Arc<RoomManager>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> ArenaResult<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| ArenaError::ListenFailure(e.to_string()))?;
    log::info!("listening for connections on {addr}");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let Ok((stream, peer)) = accepted else { continue };
                if *shutdown.borrow() {
                    log::debug!("refusing connection from {peer}: shutting down");
                    continue;
                }
                let session_manager = Arc::clone(&session_manager);
                let room_manager = Arc::clone(&room_manager);
                tokio::spawn(async move {
                    if let Err(err) = handle_connection(stream, session_manager, room_manager).await {
                        log::debug!("connection from {peer} ended: {err}");
                    }
                });
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    log::info!("ws accept loop stopping: shutdown signalled");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    session_manager: Arc<SessionManager>,
    room_manager: Arc<RoomManager>,
) -> ArenaResult<()> {
    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| ArenaError::Connection(e.to_string()))?;
    let (mut write, mut read) = ws_stream.split();

    let player_id = Uuid::new_v4().to_string();
    let now = Instant::now();

    let outbound_rx = session_manager.connect(player_id.clone(), now);
    room_manager.add_player(player_id.clone())?;

    let writer_player_id = player_id.clone();
    let writer_task = tokio::spawn(async move {
        while let Ok(envelope) = outbound_rx.recv().await {
            let Ok(text) = envelope.encode() else { continue };
            if write.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        log::trace!("writer task for {writer_player_id} stopped");
    });

    let keepalive_player_id = player_id.clone();
    let keepalive_session_manager = Arc::clone(&session_manager);
    let keepalive_task = tokio::spawn(async move {
        connection::run_keepalive(&keepalive_session_manager, &keepalive_player_id, || {
            let _ = keepalive_session_manager.send(
                &keepalive_player_id,
                Envelope::new("ping", 0, serde_json::Value::Null),
            );
        })
        .await;
    });

    while let Some(Ok(msg)) = read.next().await {
        session_manager.touch(&player_id, Instant::now());
        match msg {
            Message::Text(text) => {
                if let Ok(envelope) = Envelope::decode(&text)
                    && let Ok(client_message) = ClientMessage::from_envelope(&envelope)
                {
                    room_manager.route_message(&player_id, client_message);
                }
            }
            Message::Pong(_) => {
                session_manager.record_pong(&player_id, Instant::now());
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    room_manager.remove_player(&player_id);
    session_manager.disconnect(&player_id);
    writer_task.abort();
    keepalive_task.abort();

    Ok(())
}
