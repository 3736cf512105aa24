use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot, watch};

use handsign_core::session::session_event::SessionEvent;
use handsign_core::session::session_manager::SessionManager;
use handsign_core::session::session_state::ConnectionId;
use handsign_core::shared::frame_payload::FramePayload;

pub const INDEX_TEXT: &str = "Hand sign WebSocket server is running!";
pub const CONNECTED_TEXT: &str = "Connected to WebSocket server";

/// How long shutdown waits for open sockets to deliver in-flight results.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON envelope for every server-to-client message.
#[derive(Serialize, Debug, PartialEq)]
pub struct WireEvent<'a> {
    pub event: &'a str,
    pub data: &'a str,
}

impl<'a> From<&'a SessionEvent> for WireEvent<'a> {
    fn from(event: &'a SessionEvent) -> Self {
        Self {
            event: event.name(),
            data: event.data(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    sessions: Arc<SessionManager>,
    next_id: Arc<AtomicU64>,
    shutdown: watch::Receiver<bool>,
    /// Held by every socket task; the receiver sees `None` once all are gone.
    drain: mpsc::Sender<()>,
}

fn router(sessions: Arc<SessionManager>, shutdown: watch::Receiver<bool>, drain: mpsc::Sender<()>) -> Router {
    let state = AppState {
        sessions,
        next_id: Arc::new(AtomicU64::new(1)),
        shutdown,
        drain,
    };
    Router::new()
        .route("/", get(index))
        .route("/ws", get(upgrade))
        .with_state(state)
}

/// Serves until ctrl-c / SIGTERM, then closes open sockets and returns.
///
/// Draining the inference pool is left to the caller.
pub async fn serve(listen: SocketAddr, sessions: Arc<SessionManager>) -> std::io::Result<()> {
    let listener = TcpListener::bind(listen).await?;
    serve_on(listener, sessions, shutdown_signal()).await
}

/// Serves on `listener` until `signal` resolves.
///
/// Each open socket finishes the frame it is waiting on, sends the result
/// and a close frame, and is awaited before this returns.
pub async fn serve_on<S>(listener: TcpListener, sessions: Arc<SessionManager>, signal: S) -> std::io::Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (drain_tx, mut drain_rx) = mpsc::channel::<()>(1);
    let app = router(sessions, shutdown_rx, drain_tx);

    log::info!("Listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signal.await;
            log::info!("Shutting down WebSocket server...");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if tokio::time::timeout(DRAIN_TIMEOUT, drain_rx.recv()).await.is_err() {
        log::warn!("Gave up waiting for open sockets after {DRAIN_TIMEOUT:?}");
    }
    Ok(())
}

async fn index() -> &'static str {
    INDEX_TEXT
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let id = state.next_id.fetch_add(1, Ordering::Relaxed);
    ws.on_upgrade(move |socket| handle_socket(socket, id, state))
}

async fn handle_socket(mut socket: WebSocket, id: ConnectionId, state: AppState) {
    let AppState {
        sessions,
        mut shutdown,
        drain: _drain,
        ..
    } = state;

    sessions.on_connect(id);
    let greeting = WireEvent {
        event: "message",
        data: CONNECTED_TEXT,
    };

    if send(&mut socket, &greeting).await {
        loop {
            let message = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
                message = socket.recv() => message,
            };

            let payload = match message {
                Some(Ok(Message::Binary(bytes))) => FramePayload::Binary(bytes.to_vec()),
                Some(Ok(Message::Text(text))) => FramePayload::Text(text.as_str().to_owned()),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    log::debug!("Session {id} read error: {e}");
                    break;
                }
            };

            log::debug!("Received frame from {id} ({} bytes)", payload.len());
            let event = process(&sessions, id, payload).await;
            if !send(&mut socket, &WireEvent::from(&event)).await {
                break;
            }
        }
    }

    sessions.on_disconnect(id);
}

/// Hands one frame to the pool and waits for its result without blocking
/// the runtime.
async fn process(sessions: &SessionManager, id: ConnectionId, payload: FramePayload) -> SessionEvent {
    let (tx, rx) = oneshot::channel();
    let submitted = sessions.submit_frame(id, payload, move |event| {
        let _ = tx.send(event);
    });
    if let Err(e) = submitted {
        log::warn!("Frame from session {id} rejected: {e}");
        return SessionEvent::failed(e);
    }
    rx.await
        .unwrap_or_else(|_| SessionEvent::failed("inference worker dropped the frame"))
}

/// Returns `false` once the peer is gone.
async fn send(socket: &mut WebSocket, event: &WireEvent<'_>) -> bool {
    let text = match serde_json::to_string(event) {
        Ok(text) => text,
        Err(e) => {
            log::error!("Failed to serialize event: {e}");
            return true;
        }
    };
    socket.send(Message::Text(text.into())).await.is_ok()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
