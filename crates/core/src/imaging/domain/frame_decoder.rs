use crate::shared::frame::Frame;
use crate::shared::frame_payload::FramePayload;

/// Turns one client payload into a decoded RGB frame.
pub trait FrameDecoder: Send {
    fn decode(&self, payload: &FramePayload) -> Result<Frame, Box<dyn std::error::Error>>;
}
