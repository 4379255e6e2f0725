//! Keepalive messages exchanged on an established connection

use serde::{Deserialize, Serialize};

use crate::traits::TargetId;

/// Payload of a session handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandshakeData {
    /// Internal identifier of the target the session is bound to
    pub target_id: TargetId,
}

/// A message sent by the keepalive loop
///
/// Serialises as `{"type":"handshake","data":{...}}` or `{"type":"ping"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeepaliveMessage {
    /// Session-scope handshake carrying the target identifier
    Handshake {
        /// Handshake payload
        data: HandshakeData,
    },
    /// Lightweight liveness ping
    Ping,
}

impl KeepaliveMessage {
    /// Build a handshake for `target`
    pub fn handshake(target: TargetId) -> Self {
        Self::Handshake {
            data: HandshakeData { target_id: target },
        }
    }

    /// Message for the 1-based keepalive `iteration`
    ///
    /// Odd iterations send a handshake, even iterations a ping.
    pub fn for_iteration(iteration: u64, target: TargetId) -> Self {
        if iteration % 2 == 1 {
            Self::handshake(target)
        } else {
            Self::Ping
        }
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Handshake { .. } => "handshake",
            Self::Ping => "ping",
        }
    }
}
