use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::pipeline::infrastructure::inference_pool::{InferencePool, SubmitError};
use crate::session::session_state::{ConnectionId, Session};
use crate::session::session_event::SessionEvent;
use crate::shared::frame_payload::FramePayload;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("unknown session {0}")]
    UnknownSession(ConnectionId),
    #[error("session {0} already has a frame in flight")]
    FrameInFlight(ConnectionId),
    #[error("server is busy, frame dropped")]
    QueueFull,
    #[error("server is shutting down")]
    PoolClosed,
}

impl From<SubmitError> for SessionError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::QueueFull => SessionError::QueueFull,
            SubmitError::Closed => SessionError::PoolClosed,
        }
    }
}

type SessionMap = Arc<Mutex<HashMap<ConnectionId, Session>>>;

/// Routes frames from connections into the shared inference pool and each
/// result back to the connection that sent it.
///
/// A connection may have at most one frame in flight. Results are delivered
/// through a per-request callback, so one connection's results can never be
/// emitted to another.
pub struct SessionManager {
    sessions: SessionMap,
    pool: InferencePool,
}

impl SessionManager {
    pub fn new(pool: InferencePool) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            pool,
        }
    }

    /// Registers a new connection. Re-registering an id resets its session.
    pub fn on_connect(&self, id: ConnectionId) {
        let previous = lock(&self.sessions).insert(id, Session::new(id));
        if previous.is_some() {
            log::warn!("Session {id} re-registered");
        }
        log::info!("Client connected: {id}");
    }

    /// Forgets a connection. A frame still in flight completes, but its
    /// counters are discarded.
    pub fn on_disconnect(&self, id: ConnectionId) -> Option<Session> {
        let session = lock(&self.sessions).remove(&id);
        if let Some(s) = &session {
            log::info!(
                "Client disconnected: {id} ({} processed, {} failed, {:.1}s)",
                s.frames_processed(),
                s.frames_failed(),
                s.uptime().as_secs_f64()
            );
        }
        session
    }

    /// Queues a frame for `id`. `emit` is called exactly once, from a worker
    /// thread, with that frame's result; the session is ready for its next
    /// frame by the time `emit` runs.
    ///
    /// On `Err` the frame was not accepted and `emit` is never called.
    pub fn submit_frame<F>(
        &self,
        id: ConnectionId,
        payload: FramePayload,
        emit: F,
    ) -> Result<(), SessionError>
    where
        F: FnOnce(SessionEvent) + Send + 'static,
    {
        {
            let mut sessions = lock(&self.sessions);
            let session = sessions
                .get_mut(&id)
                .ok_or(SessionError::UnknownSession(id))?;
            if !session.begin_frame() {
                return Err(SessionError::FrameInFlight(id));
            }
        }

        let sessions = Arc::clone(&self.sessions);
        let submitted = self.pool.submit(
            payload,
            Box::new(move |result| {
                match &result {
                    Ok(prediction) => log::debug!(
                        "Session {id}: {} (confidence {:?})",
                        prediction.text(),
                        prediction.confidence()
                    ),
                    Err(e) => log::warn!("Frame from session {id} failed: {e}"),
                }
                let event = SessionEvent::from(result);
                if let Some(session) = lock(&sessions).get_mut(&id) {
                    session.finish_frame(event.is_error());
                }
                emit(event);
            }),
        );

        submitted.map_err(|e| {
            if let Some(session) = lock(&self.sessions).get_mut(&id) {
                session.abort_frame();
            }
            if e == SubmitError::QueueFull {
                log::warn!(
                    "Dropping frame from session {id}: {} frame(s) already queued",
                    self.pool.queue_depth()
                );
            }
            SessionError::from(e)
        })
    }

    /// Blocking form of [`submit_frame`](Self::submit_frame).
    pub fn process_frame(
        &self,
        id: ConnectionId,
        payload: FramePayload,
    ) -> Result<SessionEvent, SessionError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.submit_frame(id, payload, move |event| {
            let _ = tx.send(event);
        })?;
        rx.recv().map_err(|_| SessionError::PoolClosed)
    }

    /// Snapshot of one session.
    pub fn session(&self, id: ConnectionId) -> Option<Session> {
        lock(&self.sessions).get(&id).cloned()
    }

    pub fn active_sessions(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Stops accepting frames and waits for in-flight ones to be emitted.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
