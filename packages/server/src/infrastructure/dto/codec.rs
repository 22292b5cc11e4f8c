//! Frame codec.
//!
//! A frame is a text message whose first two characters are the decimal
//! message type, zero padded, followed by a JSON payload:
//!
//! ```text
//! 30{"board":"b","thread":42}
//! 03"hello"
//! 06
//! ```

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use super::websocket::MessageType;

/// Separator between frames in a backlog blob
pub const FRAME_SEPARATOR: char = '\0';

/// Longest frame prefix quoted back in error messages
const PREVIEW_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed frame: {0:?}")]
    MalformedFrame(String),

    #[error("unknown message type: {0:02}")]
    UnknownMessageType(u8),

    #[error("invalid payload for message type {tag:02}: {source}")]
    InvalidPayload {
        tag: u8,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode payload: {0}")]
    EncodingFailure(#[from] serde_json::Error),
}

/// Encode a message as a frame
pub fn encode<T: Serialize + ?Sized>(typ: MessageType, payload: &T) -> Result<String, CodecError> {
    let data = serde_json::to_string(payload)?;
    let mut frame = String::with_capacity(data.len() + 2);
    frame.push_str(&format!("{:02}", typ.tag()));
    frame.push_str(&data);
    Ok(frame)
}

/// Split a frame into its type tag and raw payload.
///
/// Only the tag is validated here; whether the tag is a known type and the
/// payload is well-formed is up to the caller.
pub fn decode(frame: &str) -> Result<(u8, &str), CodecError> {
    let bytes = frame.as_bytes();
    if bytes.len() < 2 || !bytes[0].is_ascii_digit() || !bytes[1].is_ascii_digit() {
        return Err(CodecError::MalformedFrame(preview(frame)));
    }
    let tag = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    Ok((tag, &frame[2..]))
}

/// Deserialize a raw payload. An empty payload reads as JSON `null`.
pub fn parse_payload<T: DeserializeOwned>(tag: u8, payload: &str) -> Result<T, CodecError> {
    let payload = if payload.is_empty() { "null" } else { payload };
    serde_json::from_str(payload).map_err(|source| CodecError::InvalidPayload { tag, source })
}

/// Join frames into one backlog blob
pub fn concat_frames(frames: &[String]) -> String {
    let mut separator = [0u8; 4];
    frames.join(FRAME_SEPARATOR.encode_utf8(&mut separator))
}

/// Inverse of [`concat_frames`]. An empty blob holds no frames.
pub fn split_frames(blob: &str) -> Vec<&str> {
    if blob.is_empty() {
        return Vec::new();
    }
    blob.split(FRAME_SEPARATOR).collect()
}

fn preview(frame: &str) -> String {
    frame.chars().take(PREVIEW_LEN).collect()
}
