//! WebSocket Message Types
//!
//! Frames queued for a connection's writer task and the close codes a
//! session ends with.

use axum::extract::ws::{close_code, CloseCode, Utf8Bytes};
use serde::Serialize;

/// A frame queued for one connection's writer task
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Pre-encoded JSON text, shared between all recipients of a broadcast
    Text(Utf8Bytes),
    /// Send a close frame and stop writing
    Close { code: CloseCode, reason: &'static str },
}

impl OutboundFrame {
    /// Encode a payload as a JSON text frame.
    pub fn json<T: Serialize>(payload: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::Text(encode(payload)?))
    }
}

/// Serialize once; the resulting bytes are reference counted.
pub fn encode<T: Serialize>(payload: &T) -> Result<Utf8Bytes, serde_json::Error> {
    serde_json::to_string(payload).map(Utf8Bytes::from)
}

/// Why a session left the Active state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// Peer sent a close frame or the stream ended
    ClientClosed,
    /// Transport error on read
    StreamError,
    /// No frame (including pongs) within the read deadline
    ReadDeadline,
    /// Text frame that is not a valid chat message
    MalformedPayload,
    /// Binary frame
    UnsupportedPayload,
    /// The writer task ended: socket write failed, or the entry was
    /// evicted by the broadcaster or by shutdown
    WriterGone,
}

impl CloseCause {
    /// Close code sent to the peer, if the session still owns its entry.
    pub fn close_code(&self) -> CloseCode {
        match self {
            CloseCause::MalformedPayload => close_code::INVALID,
            CloseCause::UnsupportedPayload => close_code::UNSUPPORTED,
            CloseCause::ReadDeadline => close_code::POLICY,
            CloseCause::StreamError => close_code::ERROR,
            CloseCause::ClientClosed | CloseCause::WriterGone => close_code::NORMAL,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            CloseCause::MalformedPayload => "malformed payload",
            CloseCause::UnsupportedPayload => "binary frames are not supported",
            CloseCause::ReadDeadline => "read deadline exceeded",
            CloseCause::StreamError => "stream error",
            CloseCause::ClientClosed | CloseCause::WriterGone => "",
        }
    }

    /// Metric label for `forum_chat_evictions_total`
    pub fn as_label(&self) -> &'static str {
        match self {
            CloseCause::MalformedPayload | CloseCause::UnsupportedPayload => "malformed_payload",
            CloseCause::ReadDeadline => "read_deadline",
            CloseCause::StreamError => "stream_error",
            CloseCause::ClientClosed | CloseCause::WriterGone => "closed",
        }
    }
}
