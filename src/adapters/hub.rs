//! WebSocket endpoint for the subject group channel.

use {
    crate::{
        AppState,
        domain::{
            id::ConnectionId,
            wire::{ClientFrame, HubMethod, ServerFrame},
        },
        services::group_channel::GroupChannel,
    },
    axum::{
        extract::{
            State, WebSocketUpgrade,
            ws::{Message, WebSocket},
        },
        response::IntoResponse,
    },
    futures::{SinkExt, StreamExt},
    std::time::Duration,
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

pub const PING_INTERVAL: Duration = Duration::from_secs(15);
const REPLY_QUEUE_SIZE: usize = 64;

pub async fn hub_upgrade_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_hub_connection(socket, state.channel))
}

async fn handle_hub_connection(socket: WebSocket, channel: GroupChannel) {
    let (connection_id, mut outbox) = channel.connect();
    let (mut sender, mut receiver) = socket.split();
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerFrame>(REPLY_QUEUE_SIZE);
    info!(%connection_id, "hub connection opened");

    let send_task = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ping.tick().await;

        loop {
            let frame = tokio::select! {
                Some(entry) = outbox.recv() => ServerFrame::EntryAdded { entry },
                Some(frame) = reply_rx.recv() => frame,
                _ = ping.tick() => ServerFrame::Ping,
            };

            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "failed to serialize hub frame");
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                debug!(error = %e, "failed to send hub frame");
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let text: &str = &text;
                handle_frame(text, connection_id, &channel, &reply_tx).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(%connection_id, error = %e, "hub receive error");
                break;
            }
        }
    }

    // Unregister before stopping the writer so nothing is queued for a dead socket.
    channel.disconnect(connection_id);
    send_task.abort();
    info!(%connection_id, "hub connection closed");
}

async fn handle_frame(
    text: &str,
    connection_id: ConnectionId,
    channel: &GroupChannel,
    reply_tx: &mpsc::Sender<ServerFrame>,
) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(%connection_id, error = %e, "ignoring malformed hub frame");
            return;
        }
    };

    match frame {
        ClientFrame::Invoke {
            invocation_id,
            target,
            subject_id,
        } => {
            let changed = match target {
                HubMethod::JoinSubjectGroup => channel.join(connection_id, subject_id),
                HubMethod::LeaveSubjectGroup => channel.leave(connection_id, subject_id),
            };
            debug!(%connection_id, %subject_id, ?target, changed, "hub invocation");

            let completion = ServerFrame::Completion {
                invocation_id,
                error: None,
            };
            if reply_tx.send(completion).await.is_err() {
                debug!(%connection_id, "hub writer gone, dropping completion");
            }
        }
        ClientFrame::Pong => {}
    }
}
