use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::dispatcher::Envelope;
use crate::errors::CustomError;
use crate::models::game::GameId;
use crate::models::user::UserId;
use crate::registry::{Outbound, Tx};
use crate::AppState;

#[derive(Deserialize, Serialize, Debug)]
pub struct ConnectRequest {
    pub game_id: u64,
    pub user_id: u64,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

    // Writer: the only task that touches the sink
    let mut writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Frame(frame) => {
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        tokio::select! {
            // writer gone: peer hung up or a newer connection evicted us
            _ = &mut writer => break,
            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Err(err) = handle_frame(&state, &text, &tx).await {
                        warn!("socket request rejected: {}", err);
                        send_error(&tx, &err);
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("socket closed");
    writer.abort();
}

async fn handle_frame(state: &AppState, text: &str, tx: &Tx) -> Result<(), CustomError> {
    let envelope: Envelope = serde_json::from_str(text)?;
    match envelope.event_type.as_str() {
        "connect" => {
            let request: ConnectRequest = serde_json::from_str(&envelope.payload)?;
            if request.game_id == 0 || request.user_id == 0 {
                return Err(CustomError::Validation("game_id and user_id are required".to_string()));
            }
            info!("socket connect request for game {} by user {}", request.game_id, request.user_id);
            state
                .games
                .connect(GameId(request.game_id), UserId(request.user_id), tx.clone())
                .await
        }
        other => Err(CustomError::Validation(format!("unknown event type {}", other))),
    }
}

fn send_error(tx: &Tx, err: &CustomError) {
    let envelope = Envelope {
        event_type: "error".to_string(),
        payload: err.body().to_string(),
    };
    if let Ok(frame) = serde_json::to_string(&envelope) {
        let _ = tx.send(Outbound::Frame(frame));
    }
}
