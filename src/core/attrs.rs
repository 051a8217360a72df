//! # File Attributes
//!
//! The ATTRS block: a flags word followed by optional fields, each present only
//! when its bit is set, in a fixed order.
//!
//! ```text
//! uint32 flags
//! uint64 size          (SIZE)
//! uint32 uid, gid      (UIDGID)
//! uint32 permissions   (PERMISSIONS)
//! uint32 atime, mtime  (ACMODTIME)
//! uint32 count         (EXTENDED)
//!   string name, string data   × count
//! ```
//!
//! The flags word is derived from which fields are populated, so an encoded
//! block can never claim a field it does not carry. Unknown flag bits on input
//! are ignored; only the fields named by known bits are consumed.

use crate::core::extended::ExtensionPair;
use crate::core::wire;
use crate::error::Result;

/// Attribute presence bits
pub mod flags {
    pub const SIZE: u32 = 0x0000_0001;
    pub const UIDGID: u32 = 0x0000_0002;
    pub const PERMISSIONS: u32 = 0x0000_0004;
    pub const ACMODTIME: u32 = 0x0000_0008;
    pub const EXTENDED: u32 = 0x8000_0000;
}

/// Optional file metadata carried by STAT replies and SETSTAT-style requests
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileAttributes {
    pub size: Option<u64>,
    /// (uid, gid)
    pub uid_gid: Option<(u32, u32)>,
    pub permissions: Option<u32>,
    /// (atime, mtime) in seconds since the epoch
    pub times: Option<(u32, u32)>,
    pub extended: Vec<ExtensionPair>,
}

impl FileAttributes {
    /// An attribute block with only the size set
    pub fn with_size(size: u64) -> Self {
        Self {
            size: Some(size),
            ..Default::default()
        }
    }

    /// Presence bitmask as it will be written
    pub fn flags(&self) -> u32 {
        let mut bits = 0;
        if self.size.is_some() {
            bits |= flags::SIZE;
        }
        if self.uid_gid.is_some() {
            bits |= flags::UIDGID;
        }
        if self.permissions.is_some() {
            bits |= flags::PERMISSIONS;
        }
        if self.times.is_some() {
            bits |= flags::ACMODTIME;
        }
        if !self.extended.is_empty() {
            bits |= flags::EXTENDED;
        }
        bits
    }

    pub fn is_empty(&self) -> bool {
        self.flags() == 0
    }

    pub fn encoded_len(&self) -> usize {
        let mut len = 4;
        if self.size.is_some() {
            len += 8;
        }
        if self.uid_gid.is_some() {
            len += 8;
        }
        if self.permissions.is_some() {
            len += 4;
        }
        if self.times.is_some() {
            len += 8;
        }
        if !self.extended.is_empty() {
            len += 4 + self
                .extended
                .iter()
                .map(ExtensionPair::encoded_len)
                .sum::<usize>();
        }
        len
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.flags());
        if let Some(size) = self.size {
            wire::put_u64(buf, size);
        }
        if let Some((uid, gid)) = self.uid_gid {
            wire::put_u32(buf, uid);
            wire::put_u32(buf, gid);
        }
        if let Some(permissions) = self.permissions {
            wire::put_u32(buf, permissions);
        }
        if let Some((atime, mtime)) = self.times {
            wire::put_u32(buf, atime);
            wire::put_u32(buf, mtime);
        }
        if !self.extended.is_empty() {
            wire::put_u32(buf, self.extended.len() as u32);
            for pair in &self.extended {
                pair.encode(buf);
            }
        }
    }

    pub fn decode(buf: &mut &[u8]) -> Result<Self> {
        let bits = wire::take_u32(buf)?;
        let mut attrs = Self::default();

        if bits & flags::SIZE != 0 {
            attrs.size = Some(wire::take_u64(buf)?);
        }
        if bits & flags::UIDGID != 0 {
            let uid = wire::take_u32(buf)?;
            let gid = wire::take_u32(buf)?;
            attrs.uid_gid = Some((uid, gid));
        }
        if bits & flags::PERMISSIONS != 0 {
            attrs.permissions = Some(wire::take_u32(buf)?);
        }
        if bits & flags::ACMODTIME != 0 {
            let atime = wire::take_u32(buf)?;
            let mtime = wire::take_u32(buf)?;
            attrs.times = Some((atime, mtime));
        }
        if bits & flags::EXTENDED != 0 {
            let count = wire::take_u32(buf)?;
            // Each pair takes at least 8 bytes, so a spoofed count fails fast
            for _ in 0..count {
                attrs.extended.push(ExtensionPair::decode(buf)?);
            }
        }
        Ok(attrs)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::error::ProtocolError;

    fn encode(attrs: &FileAttributes) -> Vec<u8> {
        let mut buf = Vec::new();
        attrs.encode(&mut buf);
        buf
    }

    #[test]
    fn test_empty_block_is_flags_only() {
        let attrs = FileAttributes::default();
        assert_eq!(encode(&attrs), [0, 0, 0, 0]);
        assert_eq!(attrs.encoded_len(), 4);
        assert!(attrs.is_empty());
    }

    #[test]
    fn test_fields_follow_canonical_order() {
        let attrs = FileAttributes {
            size: Some(0x10),
            uid_gid: Some((1, 2)),
            permissions: Some(0o644),
            times: Some((3, 4)),
            extended: vec![],
        };
        let bytes = encode(&attrs);
        assert_eq!(bytes.len(), attrs.encoded_len());
        assert_eq!(&bytes[..4], &[0, 0, 0, 0x0F]);
        assert_eq!(&bytes[4..12], &[0, 0, 0, 0, 0, 0, 0, 0x10]);
        assert_eq!(&bytes[12..20], &[0, 0, 0, 1, 0, 0, 0, 2]);
        assert_eq!(&bytes[20..24], &0o644u32.to_be_bytes());
        assert_eq!(&bytes[24..32], &[0, 0, 0, 3, 0, 0, 0, 4]);

        let mut cursor = &bytes[..];
        assert_eq!(FileAttributes::decode(&mut cursor).unwrap(), attrs);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_decode_consumes_only_flagged_fields() {
        let mut bytes = encode(&FileAttributes {
            permissions: Some(0o755),
            ..Default::default()
        });
        bytes.extend_from_slice(&[0xAA, 0xBB]);

        let mut cursor = &bytes[..];
        let attrs = FileAttributes::decode(&mut cursor).unwrap();
        assert_eq!(attrs.permissions, Some(0o755));
        assert_eq!(attrs.size, None);
        assert_eq!(cursor, &[0xAA, 0xBB]);
    }

    #[test]
    fn test_extended_pairs() {
        let attrs = FileAttributes {
            extended: vec![ExtensionPair::new("acl@example.com", "rwx")],
            ..Default::default()
        };
        let bytes = encode(&attrs);
        assert_eq!(&bytes[..4], &flags::EXTENDED.to_be_bytes());
        assert_eq!(bytes.len(), attrs.encoded_len());

        let mut cursor = &bytes[..];
        assert_eq!(FileAttributes::decode(&mut cursor).unwrap(), attrs);
    }

    #[test]
    fn test_flag_without_field_is_short() {
        let bytes = flags::SIZE.to_be_bytes();
        let mut cursor = &bytes[..];
        assert!(matches!(
            FileAttributes::decode(&mut cursor),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_spoofed_extended_count() {
        let mut bytes = flags::EXTENDED.to_be_bytes().to_vec();
        bytes.extend_from_slice(&u32::MAX.to_be_bytes());
        let mut cursor = &bytes[..];
        assert!(matches!(
            FileAttributes::decode(&mut cursor),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_unknown_bits_ignored() {
        let bytes = 0x0000_0100u32.to_be_bytes();
        let mut cursor = &bytes[..];
        let attrs = FileAttributes::decode(&mut cursor).unwrap();
        assert!(attrs.is_empty());
    }
}
