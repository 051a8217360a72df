//! # Core Protocol Components
//!
//! SFTP v3 wire primitives, the packet catalog and length-prefixed framing.
//!
//! ## Components
//! - **Wire**: Big-endian integer and string encoders with checked decoders
//! - **Packet**: The closed set of packet kinds and the [`Packet`] union
//! - **Attrs**: Flag-driven file attribute blocks
//! - **Status**: STATUS codes and the [`StatusError`] value
//! - **Extended**: Extension pairs and `statvfs@openssh.com`
//! - **Codec**: Frame reader/writer and a Tokio codec over byte streams
//!
//! ## Wire Format
//! ```text
//! [Length(4, BE)] [Type(1)] [Body(Length - 1)]
//! ```
//!
//! ## Safety
//! - Frame length is checked against the configured maximum before allocation
//! - Every declared length is checked against the remaining input
//! - Truncated input yields [`crate::error::ProtocolError::ShortPacket`], never a panic

pub mod attrs;
pub mod codec;
pub mod extended;
pub mod packet;
pub mod status;
pub mod wire;

pub use attrs::FileAttributes;
pub use codec::{recv_frame, send_frame, Frame, FrameCodec};
pub use extended::{ExtendedRequest, ExtensionPair, StatVfs};
pub use packet::{Packet, PacketType, WirePacket};
pub use status::{StatusCode, StatusError};
