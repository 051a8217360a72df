//! # sftp-wire
//!
//! SFTP version 3 wire protocol: packet encoding and decoding, length-prefixed
//! framing over any byte stream, and a server loop that runs requests
//! concurrently while keeping every response frame intact.
//!
//! ## Layers
//! - [`core`]: wire primitives, packet catalog, framing
//! - [`server`]: session driver and the shared [`ResponseSender`]
//! - [`config`]: TOML/env configuration with validation
//! - [`utils`]: logging setup and metrics
//!
//! ## Quick Start
//! ```rust
//! use sftp_wire::{Packet, PacketType};
//! use sftp_wire::core::packet::OpenPacket;
//!
//! let open = Packet::Open(OpenPacket {
//!     id: 7,
//!     path: "/tmp/x".into(),
//!     pflags: 1,
//!     attrs: Default::default(),
//! });
//! let payload = open.marshal();
//! assert_eq!(payload[0], PacketType::Open.as_u8());
//! assert_eq!(Packet::unmarshal(&payload).unwrap(), open);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod server;
pub mod utils;

pub use crate::config::{NetworkConfig, ServerConfig};
pub use crate::core::{FileAttributes, Frame, FrameCodec, Packet, PacketType, StatusCode, StatusError};
pub use crate::error::{ProtocolError, Result};
pub use crate::server::{RequestHandler, ResponseSender, Server};
