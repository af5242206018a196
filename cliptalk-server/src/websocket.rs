// WebSocket handler for the listener connection

use crate::delivery;
use crate::http::AppState;
use crate::messages::{ClientMessage, ServerEvent};
use crate::session::ListenerHandle;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

/// WebSocket upgrade handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one listener connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (handle, mut rx) = ListenerHandle::new();
    let connection_id = handle.id();
    info!("Listener connected: {}", connection_id);
    metrics::counter!("cliptalk_listeners_connected_total").increment(1);

    let mut kicked = state.session.attach(handle.clone());

    // Initial snapshot so the listener can draw its gauges right away
    for report in [state.input.depth_report(), state.output.depth_report()] {
        let _ = handle.send(ServerEvent::from(&report));
    }
    let _ = handle.send(ServerEvent::ToggleMonitoring {
        state: state.session.monitoring(),
    });

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = &mut kicked => {
                    debug!("Listener {} replaced; closing", connection_id);
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };

            if let Err(e) = sender.send(Message::Text(json)).await {
                warn!("Failed to send to listener {}: {}", connection_id, e);
                break;
            }
        }
    });

    let session = state.session.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => match ClientMessage::parse(&text) {
                    Ok(ClientMessage::AdvanceToNext) => session.advance(),
                    Ok(ClientMessage::SetMonitoring { state }) => session.set_monitoring(state),
                    Err(e) => warn!("Unrecognized message from {}: {:?} ({})", connection_id, text, e),
                },
                Ok(Message::Binary(_)) => {
                    warn!("Received binary message from {}, ignoring", connection_id);
                }
                Ok(Message::Close(_)) => {
                    debug!("Listener {} closed the connection", connection_id);
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    error!("WebSocket error from {}: {}", connection_id, e);
                    break;
                }
            }
        }
    });

    tokio::spawn(delivery::run(
        state.session.clone(),
        state.output.clone(),
        handle.clone(),
    ));

    tokio::select! {
        _ = &mut send_task => {
            debug!("Send task completed for listener {}", connection_id);
        }
        _ = &mut recv_task => {
            debug!("Receive task completed for listener {}", connection_id);
        }
    }
    send_task.abort();
    recv_task.abort();

    state.session.detach(&handle);
    info!("Listener disconnected: {}", connection_id);
}
