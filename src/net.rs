use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::arcade::ModelKind;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::SharedGameState;

/// Accepts websocket clients until the listener fails. Each client gets one
/// vehicle for the lifetime of its connection.
pub async fn serve(listener: TcpListener, state: Arc<Mutex<SharedGameState>>, default_model: ModelKind) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "websocket listening");
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                warn!(%err, "accept failed");
                continue;
            }
        };
        debug!(%peer, "tcp connection");
        tokio::spawn(handle_client(raw, Arc::clone(&state), default_model));
    }
}

fn send(tx: &mpsc::UnboundedSender<String>, msg: &ServerMessage<'_>) {
    match msg.to_json() {
        Ok(json) => {
            let _ = tx.send(json);
        }
        Err(err) => warn!(%err, "failed to encode server message"),
    }
}

async fn handle_client(raw: TcpStream, state: Arc<Mutex<SharedGameState>>, default_model: ModelKind) {
    let ws = match accept_async(raw).await {
        Ok(ws) => ws,
        Err(err) => {
            debug!(%err, "websocket handshake failed");
            return;
        }
    };
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) Outgoing message channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // -------------------------------
    // 2) Claim a vehicle (the world spawns it next tick)
    // -------------------------------
    let player_id = {
        let mut game = state.lock().await;
        match game.add_entity(default_model) {
            Some(id) => {
                game.register_client(&id, tx.clone());
                id
            }
            None => {
                drop(game);
                info!("grid full, rejecting client");
                send(&tx, &ServerMessage::Rejected { reason: "grid full" });
                return;
            }
        }
    };

    info!(player = %player_id, model = %default_model, "player connected");
    send(&tx, &ServerMessage::Welcome { player_id: &player_id, model: default_model });

    // -------------------------------
    // 3) Main receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(_) => break,
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let parsed = match ClientMessage::from_json(&text) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(player = %player_id, %err, "ignoring malformed message");
                continue;
            }
        };

        match parsed {
            ClientMessage::Input(input) => {
                state.lock().await.update_input(&player_id, input);
            }
            ClientMessage::Ping => send(&tx, &ServerMessage::Pong),
            ClientMessage::SelectModel { model } => {
                if state.lock().await.select_model(&player_id, model) {
                    info!(player = %player_id, %model, "model selected");
                }
            }
        }
    }

    info!(player = %player_id, "player disconnected");
    state.lock().await.remove_entity(&player_id);
}
