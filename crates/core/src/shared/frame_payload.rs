/// Encoded image bytes as delivered by a client for one frame event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FramePayload {
    /// Raw encoded image (PNG, JPEG, ...).
    Binary(Vec<u8>),
    /// Base64 of an encoded image, optionally as a `data:` URL.
    Text(String),
}

impl FramePayload {
    pub fn len(&self) -> usize {
        match self {
            Self::Binary(bytes) => bytes.len(),
            Self::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<u8>> for FramePayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<String> for FramePayload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}
