//! # Status Responses
//!
//! STATUS is the terminal answer for any failed request, and the bare
//! acknowledgement for requests whose only positive outcome is "done"
//! (CLOSE, WRITE, REMOVE, ...).
//!
//! ```text
//! uint32 code || string message || string language
//! ```

use std::fmt;
use std::io;

use thiserror::Error;

use crate::core::wire;
use crate::error::{ProtocolError, Result};

/// Default language tag sent with status messages
pub const DEFAULT_LANGUAGE: &str = "en";

/// Status codes defined for protocol version 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    Ok = 0,
    Eof = 1,
    NoSuchFile = 2,
    PermissionDenied = 3,
    Failure = 4,
    BadMessage = 5,
    NoConnection = 6,
    ConnectionLost = 7,
    OpUnsupported = 8,
}

impl StatusCode {
    pub fn from_u32(code: u32) -> Option<Self> {
        Some(match code {
            0 => StatusCode::Ok,
            1 => StatusCode::Eof,
            2 => StatusCode::NoSuchFile,
            3 => StatusCode::PermissionDenied,
            4 => StatusCode::Failure,
            5 => StatusCode::BadMessage,
            6 => StatusCode::NoConnection,
            7 => StatusCode::ConnectionLost,
            8 => StatusCode::OpUnsupported,
            _ => return None,
        })
    }

    /// Default human-readable text for the code
    pub fn description(self) -> &'static str {
        match self {
            StatusCode::Ok => "ok",
            StatusCode::Eof => "end of file",
            StatusCode::NoSuchFile => "no such file",
            StatusCode::PermissionDenied => "permission denied",
            StatusCode::Failure => "failure",
            StatusCode::BadMessage => "bad message",
            StatusCode::NoConnection => "no connection",
            StatusCode::ConnectionLost => "connection lost",
            StatusCode::OpUnsupported => "operation unsupported",
        }
    }
}

impl From<StatusCode> for u32 {
    fn from(code: StatusCode) -> u32 {
        code as u32
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Failure outcome of a request, sent back as a STATUS packet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("sftp status {code}: {message}")]
pub struct StatusError {
    /// Raw code; unknown codes from a peer are preserved
    pub code: u32,
    pub message: String,
    pub language: String,
}

impl StatusError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    /// Status with the code's default description as its message
    pub fn from_code(code: StatusCode) -> Self {
        Self::new(code, code.description())
    }

    /// Plain acknowledgement
    pub fn ok() -> Self {
        Self::from_code(StatusCode::Ok)
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        StatusCode::from_u32(self.code)
    }

    pub fn is_ok(&self) -> bool {
        self.code == StatusCode::Ok as u32
    }

    pub(crate) fn encoded_len(&self) -> usize {
        4 + wire::string_len(self.message.as_bytes()) + wire::string_len(self.language.as_bytes())
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.code);
        wire::put_string(buf, &self.message);
        wire::put_string(buf, &self.language);
    }

    pub(crate) fn decode(buf: &mut &[u8]) -> Result<Self> {
        let code = wire::take_u32(buf)?;
        let message = wire::take_string(buf)?;
        let language = wire::take_string(buf)?;
        Ok(Self {
            code,
            message,
            language,
        })
    }
}

impl From<io::Error> for StatusError {
    fn from(err: io::Error) -> Self {
        let code = match err.kind() {
            io::ErrorKind::NotFound => StatusCode::NoSuchFile,
            io::ErrorKind::PermissionDenied => StatusCode::PermissionDenied,
            io::ErrorKind::UnexpectedEof => StatusCode::Eof,
            io::ErrorKind::Unsupported => StatusCode::OpUnsupported,
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => StatusCode::BadMessage,
            _ => StatusCode::Failure,
        };
        Self::new(code, err.to_string())
    }
}

impl From<&ProtocolError> for StatusError {
    fn from(err: &ProtocolError) -> Self {
        let code = match err {
            ProtocolError::UnknownPacketType(_) => StatusCode::OpUnsupported,
            ProtocolError::ShortPacket | ProtocolError::InvalidString => StatusCode::BadMessage,
            _ => StatusCode::Failure,
        };
        Self::new(code, err.to_string())
    }
}
