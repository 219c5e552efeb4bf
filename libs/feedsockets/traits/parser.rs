/// Type alias for WebSocket messages
/// Can be Text or Binary data
#[derive(Debug, Clone, PartialEq)]
pub enum WsMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WsMessage {
    /// Get the message as text, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WsMessage::Text(s) => Some(s),
            WsMessage::Binary(_) => None,
        }
    }

    /// Get the message as binary, if it is binary
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            WsMessage::Text(_) => None,
            WsMessage::Binary(b) => Some(b),
        }
    }

    /// Check if message is text
    pub fn is_text(&self) -> bool {
        matches!(self, WsMessage::Text(_))
    }

    /// Check if message is binary
    pub fn is_binary(&self) -> bool {
        matches!(self, WsMessage::Binary(_))
    }
}

/// Trait for decoding binary feed frames
///
/// Market-data feeds usually multiplex several packet kinds on one socket.
/// A decoder returns `None` for frames it does not understand or cannot
/// parse; it must never panic on malformed input.
pub trait FrameDecoder: Send + Sync {
    /// The typed value produced for a recognised frame
    type Frame: Send;

    /// Decode one binary frame
    fn decode(&self, frame: &[u8]) -> Option<Self::Frame>;

    /// Decode a WebSocket message, ignoring text payloads
    fn decode_message(&self, message: &WsMessage) -> Option<Self::Frame> {
        message.as_binary().and_then(|bytes| self.decode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FirstByte;

    impl FrameDecoder for FirstByte {
        type Frame = u8;

        fn decode(&self, frame: &[u8]) -> Option<u8> {
            frame.first().copied()
        }
    }

    #[test]
    fn test_ws_message_accessors() {
        let text = WsMessage::Text("hello".to_string());
        assert!(text.is_text());
        assert_eq!(text.as_text(), Some("hello"));
        assert_eq!(text.as_binary(), None);

        let binary = WsMessage::Binary(vec![1, 2]);
        assert!(binary.is_binary());
        assert_eq!(binary.as_binary(), Some(&[1u8, 2][..]));
        assert_eq!(binary.as_text(), None);
    }

    #[test]
    fn test_decode_message_skips_text() {
        let decoder = FirstByte;
        assert_eq!(decoder.decode_message(&WsMessage::Binary(vec![7, 8])), Some(7));
        assert_eq!(decoder.decode_message(&WsMessage::Text("7".into())), None);
        assert_eq!(decoder.decode_message(&WsMessage::Binary(Vec::new())), None);
    }
}
