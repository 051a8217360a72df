//! # Error Types
//!
//! Error handling for the SFTP wire layer.
//!
//! Errors fall into two groups with very different consequences:
//! - **Fatal**: framing I/O failures, end-of-stream mid-frame, oversized or empty
//!   frames. The byte stream can no longer be trusted to be aligned on a frame
//!   boundary, so the connection must be torn down.
//! - **Local**: a frame arrived intact but its body could not be decoded
//!   (`ShortPacket`, invalid strings, unknown type tags). These are answered with
//!   a STATUS response for the request Id when the Id can be recovered.
//!
//! ## Example Usage
//! ```rust
//! use sftp_wire::core::wire;
//! use sftp_wire::error::{ProtocolError, Result};
//!
//! fn first_word(mut body: &[u8]) -> Result<u32> {
//!     wire::take_u32(&mut body)
//! }
//!
//! assert!(matches!(first_word(&[0, 1]), Err(ProtocolError::ShortPacket)));
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_EMPTY_FRAME: &str = "Frame carries no packet type";
    pub const ERR_OVERSIZED_PACKET: &str = "Packet exceeds maximum size";
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";

    /// Decode errors
    pub const ERR_SHORT_PACKET: &str = "packet too short";
    pub const ERR_INVALID_STRING: &str = "string field is not valid UTF-8";

    /// Session errors
    pub const ERR_INIT_EXPECTED: &str = "First packet must be INIT";
    pub const ERR_UNRECOVERABLE_ID: &str = "Malformed packet without a readable request id";
}

/// Primary error type for all wire-layer operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Frame carries no packet type")]
    EmptyFrame,

    #[error("packet too short")]
    ShortPacket,

    #[error("string field is not valid UTF-8")]
    InvalidString,

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(u8),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

impl ProtocolError {
    /// Whether this error leaves the stream in an unknown state.
    ///
    /// Fatal errors close the connection; everything else is reported to the
    /// peer as a STATUS response for the affected request.
    pub fn is_fatal(&self) -> bool {
        match self {
            ProtocolError::Io(_)
            | ProtocolError::ConnectionClosed
            | ProtocolError::OversizedPacket(_)
            | ProtocolError::EmptyFrame
            | ProtocolError::ProtocolViolation(_) => true,
            ProtocolError::ShortPacket
            | ProtocolError::InvalidString
            | ProtocolError::UnknownPacketType(_) => false,
            ProtocolError::ConfigError(_) | ProtocolError::Custom(_) => true,
        }
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
