//! Client-to-server wire frames.
//!
//! Every locally-originated message is one binary WebSocket message whose
//! first byte is a tag:
//!
//! | Tag    | Payload                          | Meaning        |
//! |--------|----------------------------------|----------------|
//! | `0x00` | raw bytes                        | keyboard input |
//! | `0x01` | JSON `{"height":H,"width":W}`    | terminal resize|
//!
//! The server-to-client direction is untagged: every binary message is raw
//! terminal output.

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Tag byte for an input frame.
pub const TAG_INPUT: u8 = 0;

/// Tag byte for a resize frame.
pub const TAG_RESIZE: u8 = 1;

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TerminalSize {
    /// Rows.
    pub height: u16,
    /// Columns.
    pub width: u16,
}

impl TerminalSize {
    /// Creates a size from rows and columns.
    pub fn new(height: u16, width: u16) -> Self {
        Self { height, width }
    }
}

/// A single client-to-server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// One chunk of local keyboard input.
    Input(Vec<u8>),
    /// Local terminal was resized.
    Resize(TerminalSize),
}

impl Frame {
    /// Encodes the frame into a transport payload.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        match self {
            Self::Input(bytes) => {
                let mut out = Vec::with_capacity(bytes.len() + 1);
                out.push(TAG_INPUT);
                out.extend_from_slice(bytes);
                Ok(out)
            }
            Self::Resize(size) => {
                let json = serde_json::to_vec(size)?;
                let mut out = Vec::with_capacity(json.len() + 1);
                out.push(TAG_RESIZE);
                out.extend_from_slice(&json);
                Ok(out)
            }
        }
    }

    /// Decodes a transport payload produced by [`Frame::encode`].
    pub fn decode(payload: &[u8]) -> Result<Self, FrameError> {
        let (&tag, rest) = payload.split_first().ok_or(FrameError::Empty)?;
        match tag {
            TAG_INPUT => Ok(Self::Input(rest.to_vec())),
            TAG_RESIZE => Ok(Self::Resize(serde_json::from_slice(rest)?)),
            other => Err(FrameError::UnknownTag(other)),
        }
    }

    /// Short name for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(_) => "input",
            Self::Resize(_) => "resize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_frame_prefixes_tag() {
        let encoded = Frame::Input(b"ls\r".to_vec()).encode().unwrap();
        assert_eq!(encoded, vec![0, b'l', b's', b'\r']);
    }

    #[test]
    fn test_input_frame_keeps_control_bytes() {
        let bytes = vec![0x03, 0x1b, b'[', b'A', 0x00, 0xff];
        let encoded = Frame::Input(bytes.clone()).encode().unwrap();
        assert_eq!(Frame::decode(&encoded).unwrap(), Frame::Input(bytes));
    }

    #[test]
    fn test_empty_input_frame_is_just_tag() {
        let encoded = Frame::Input(Vec::new()).encode().unwrap();
        assert_eq!(encoded, vec![TAG_INPUT]);
        assert_eq!(Frame::decode(&encoded).unwrap(), Frame::Input(Vec::new()));
    }

    #[test]
    fn test_resize_frame_is_tagged_json() {
        let encoded = Frame::Resize(TerminalSize::new(24, 80)).encode().unwrap();
        assert_eq!(encoded[0], TAG_RESIZE);

        let value: serde_json::Value = serde_json::from_slice(&encoded[1..]).unwrap();
        assert_eq!(value["height"], 24);
        assert_eq!(value["width"], 80);
    }

    #[test]
    fn test_resize_frame_extremes() {
        for (h, w) in [(0, 0), (1, 0), (u16::MAX, u16::MAX)] {
            let encoded = Frame::Resize(TerminalSize::new(h, w)).encode().unwrap();
            let value: serde_json::Value = serde_json::from_slice(&encoded[1..]).unwrap();
            assert_eq!(value["height"], u64::from(h));
            assert_eq!(value["width"], u64::from(w));
        }
    }

    #[test]
    fn test_decode_rejects_empty() {
        assert!(matches!(Frame::decode(&[]), Err(FrameError::Empty)));
    }

    #[test]
    fn test_decode_rejects_unknown_tag() {
        assert!(matches!(
            Frame::decode(&[7, 1, 2]),
            Err(FrameError::UnknownTag(7))
        ));
    }

    #[test]
    fn test_decode_rejects_bad_resize_json() {
        assert!(matches!(
            Frame::decode(b"\x01{\"height\":1}"),
            Err(FrameError::Resize(_))
        ));
    }
}
