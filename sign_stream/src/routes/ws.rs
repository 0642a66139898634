use crate::{server::SharedState, session::Session};
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use sign_inference::LandmarkProvider;
use tracing::instrument;

#[instrument(skip_all)]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> Response {
    let max_message_bytes = state.session_config.max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .max_frame_size(max_message_bytes)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: SharedState) {
    // subscribe before the provider loads so a shutdown during setup is not missed
    let shutdown_rx = state.shutdown_tx.subscribe();
    let (mut sink, stream) = socket.split();

    let provider = match create_provider(&state).await {
        Ok(provider) => provider,
        Err(reason) => {
            tracing::error!("Refusing session, landmark tracker unavailable: {}", reason);
            let frame = CloseFrame {
                code: close_code::ERROR,
                reason: "landmark tracker unavailable".into(),
            };
            if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                tracing::debug!("Ignoring close error on finished connection: {}", e);
            }
            return;
        }
    };

    let session = Session::new(
        provider,
        state.executor.clone(),
        state.responder.clone(),
        state.session_config.clone(),
        state.metrics.clone(),
    );
    session.run(sink, stream, shutdown_rx).await;
}

async fn create_provider(state: &SharedState) -> Result<Box<dyn LandmarkProvider>, String> {
    let factory = state.landmarks.clone();
    match tokio::task::spawn_blocking(move || factory.create()).await {
        Ok(Ok(provider)) => Ok(provider),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(e.to_string()),
    }
}
