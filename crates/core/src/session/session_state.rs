use std::time::{Duration, Instant};

/// Transport-assigned identity of one client connection.
pub type ConnectionId = u64;

/// Per-connection metadata.
///
/// Frames are classified independently, so nothing here feeds back into
/// inference; it only tracks the connection and enforces one frame in
/// flight at a time.
#[derive(Clone, Debug)]
pub struct Session {
    id: ConnectionId,
    connected_at: Instant,
    frames_processed: u64,
    frames_failed: u64,
    in_flight: bool,
}

impl Session {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            connected_at: Instant::now(),
            frames_processed: 0,
            frames_failed: 0,
            in_flight: false,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn uptime(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Frames that produced a translation (including "no hand").
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_failed(&self) -> u64 {
        self.frames_failed
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Marks a frame as entering the pipeline. Returns `false` if one already is.
    pub(crate) fn begin_frame(&mut self) -> bool {
        !std::mem::replace(&mut self.in_flight, true)
    }

    pub(crate) fn abort_frame(&mut self) {
        self.in_flight = false;
    }

    pub(crate) fn finish_frame(&mut self, failed: bool) {
        self.in_flight = false;
        if failed {
            self.frames_failed += 1;
        } else {
            self.frames_processed += 1;
        }
    }
}
