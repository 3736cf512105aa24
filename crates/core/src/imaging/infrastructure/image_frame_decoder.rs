use base64::Engine;
use thiserror::Error;

use crate::imaging::domain::frame_decoder::FrameDecoder;
use crate::shared::frame::Frame;
use crate::shared::frame_payload::FramePayload;

#[derive(Error, Debug)]
pub enum FrameDecodeError {
    #[error("empty frame payload")]
    Empty,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),
}

/// `FrameDecoder` backed by the `image` crate.
#[derive(Default)]
pub struct ImageFrameDecoder;

impl ImageFrameDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl FrameDecoder for ImageFrameDecoder {
    fn decode(&self, payload: &FramePayload) -> Result<Frame, Box<dyn std::error::Error>> {
        Ok(decode_payload(payload)?)
    }
}

/// Decodes a client payload into an 8-bit RGB frame.
///
/// Any format the `image` crate recognizes is accepted; alpha and
/// grayscale images are converted to RGB.
pub fn decode_payload(payload: &FramePayload) -> Result<Frame, FrameDecodeError> {
    match payload {
        FramePayload::Binary(bytes) => decode_bytes(bytes),
        FramePayload::Text(text) => decode_bytes(&decode_base64(text)?),
    }
}

pub fn decode_bytes(bytes: &[u8]) -> Result<Frame, FrameDecodeError> {
    if bytes.is_empty() {
        return Err(FrameDecodeError::Empty);
    }
    Ok(Frame::from(image::load_from_memory(bytes)?.to_rgb8()))
}

/// Standard-alphabet base64, tolerating a `data:<mime>;base64,` prefix and
/// embedded whitespace (line-wrapped encoders).
fn decode_base64(text: &str) -> Result<Vec<u8>, FrameDecodeError> {
    let body = text.trim();
    let body = match body.strip_prefix("data:") {
        Some(url) => url.split_once(',').map_or(url, |(_, data)| data),
        None => body,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(FrameDecodeError::Empty);
    }
    Ok(base64::engine::general_purpose::STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([x as u8, y as u8, 7])
        });
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_binary_png() {
        let frame = decode_payload(&FramePayload::Binary(png_bytes(6, 4))).unwrap();
        assert_eq!((frame.width(), frame.height()), (6, 4));
        assert_eq!(frame.as_ndarray()[[3, 5, 0]], 5);
        assert_eq!(frame.as_ndarray()[[3, 5, 1]], 3);
        assert_eq!(frame.as_ndarray()[[3, 5, 2]], 7);
    }

    #[test]
    fn test_decode_base64_png() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 3));
        let frame = decode_payload(&FramePayload::Text(encoded)).unwrap();
        assert_eq!((frame.width(), frame.height()), (3, 3));
    }

    #[test]
    fn test_decode_data_url() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(2, 5));
        let url = format!("data:image/png;base64,{encoded}");
        let frame = decode_payload(&FramePayload::Text(url)).unwrap();
        assert_eq!((frame.width(), frame.height()), (2, 5));
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png_bytes(4, 4));
        let (a, b) = encoded.split_at(10);
        let frame = decode_payload(&FramePayload::Text(format!("{a}\n{b}\n"))).unwrap();
        assert_eq!(frame.width(), 4);
    }

    #[test]
    fn test_malformed_bytes_are_rejected() {
        let result = decode_payload(&FramePayload::Binary(b"definitely not an image".to_vec()));
        assert!(matches!(result, Err(FrameDecodeError::Image(_))));
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let result = decode_payload(&FramePayload::Text("@@not*base64@@".into()));
        assert!(matches!(result, Err(FrameDecodeError::Base64(_))));
    }

    #[test]
    fn test_decoder_port_reports_cause() {
        let decoder = ImageFrameDecoder::new();
        assert!(decoder
            .decode(&FramePayload::Binary(png_bytes(2, 2)))
            .is_ok());
        let err = decoder.decode(&FramePayload::Binary(Vec::new())).unwrap_err();
        assert_eq!(err.to_string(), "empty frame payload");
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        assert!(matches!(
            decode_payload(&FramePayload::Binary(Vec::new())),
            Err(FrameDecodeError::Empty)
        ));
        assert!(matches!(
            decode_payload(&FramePayload::Text("  ".into())),
            Err(FrameDecodeError::Empty)
        ));
    }
}
