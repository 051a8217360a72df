//! # Extensions
//!
//! Extension pairs advertised during INIT/VERSION negotiation, and the
//! sub-protocols carried inside EXTENDED / EXTENDED_REPLY envelopes.
//!
//! Only `statvfs@openssh.com` is understood natively. Any other request name is
//! preserved as an opaque body so a handler can still choose to answer it.

use bytes::Bytes;

use crate::core::wire;
use crate::error::Result;

/// Request name of the filesystem statistics extension
pub const STATVFS_EXTENSION: &str = "statvfs@openssh.com";

/// Version string advertised for `statvfs@openssh.com`
pub const STATVFS_EXTENSION_VERSION: &str = "2";

/// A named capability exchanged in INIT/VERSION, or a vendor attribute
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct ExtensionPair {
    pub name: String,
    pub data: String,
}

impl ExtensionPair {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub(crate) fn encoded_len(&self) -> usize {
        wire::string_len(self.name.as_bytes()) + wire::string_len(self.data.as_bytes())
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        wire::put_string(buf, &self.name);
        wire::put_string(buf, &self.data);
    }

    pub(crate) fn decode(buf: &mut &[u8]) -> Result<Self> {
        let name = wire::take_string(buf)?;
        let data = wire::take_string(buf)?;
        Ok(Self { name, data })
    }
}

/// Body of an EXTENDED request, after the request name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedRequest {
    /// `statvfs@openssh.com`: capacity of the filesystem holding `path`
    Statvfs { path: String },
    /// Any other extension, body kept verbatim.
    ///
    /// `name` is never a recognized extension; build through
    /// [`ExtendedRequest::new`] so known names get their typed variant.
    Other { name: String, data: Bytes },
}

impl ExtendedRequest {
    /// Build a request from its wire name and raw body, parsing known
    /// extensions into their typed variant. Bytes after a known body's last
    /// field are dropped, as for every other packet kind.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Result<Self> {
        let name = name.into();
        let data = data.into();
        if name == STATVFS_EXTENSION {
            let mut body = &data[..];
            let path = wire::take_string(&mut body)?;
            return Ok(ExtendedRequest::Statvfs { path });
        }
        Ok(ExtendedRequest::Other { name, data })
    }

    /// Extension name as it appears on the wire
    pub fn name(&self) -> &str {
        match self {
            ExtendedRequest::Statvfs { .. } => STATVFS_EXTENSION,
            ExtendedRequest::Other { name, .. } => name,
        }
    }

    pub(crate) fn encoded_len(&self) -> usize {
        let body = match self {
            ExtendedRequest::Statvfs { path } => wire::string_len(path.as_bytes()),
            ExtendedRequest::Other { data, .. } => data.len(),
        };
        wire::string_len(self.name().as_bytes()) + body
    }

    pub(crate) fn encode(&self, buf: &mut Vec<u8>) {
        wire::put_string(buf, self.name());
        match self {
            ExtendedRequest::Statvfs { path } => wire::put_string(buf, path),
            ExtendedRequest::Other { data, .. } => buf.extend_from_slice(data),
        }
    }

    pub(crate) fn decode(buf: &mut &[u8]) -> Result<Self> {
        let name = wire::take_string(buf)?;
        let data = Bytes::copy_from_slice(buf);
        *buf = &[];
        Self::new(name, data)
    }
}

/// Filesystem statistics, the reply body of `statvfs@openssh.com`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatVfs {
    /// File system block size
    pub bsize: u64,
    /// Fundamental block size
    pub frsize: u64,
    /// Number of blocks, in units of `frsize`
    pub blocks: u64,
    /// Free blocks
    pub bfree: u64,
    /// Free blocks available to non-root
    pub bavail: u64,
    /// Total inodes
    pub files: u64,
    /// Free inodes
    pub ffree: u64,
    /// Free inodes available to non-root
    pub favail: u64,
    /// File system id
    pub fsid: u64,
    /// Mount flags
    pub flag: u64,
    /// Maximum file name length
    pub namemax: u64,
}

impl StatVfs {
    pub const ENCODED_LEN: usize = 11 * 8;

    /// Total capacity in bytes
    pub fn total_space(&self) -> u64 {
        self.frsize.saturating_mul(self.blocks)
    }

    /// Free capacity in bytes
    pub fn free_space(&self) -> u64 {
        self.frsize.saturating_mul(self.bfree)
    }

    fn fields(&self) -> [u64; 11] {
        [
            self.bsize,
            self.frsize,
            self.blocks,
            self.bfree,
            self.bavail,
            self.files,
            self.ffree,
            self.favail,
            self.fsid,
            self.flag,
            self.namemax,
        ]
    }

    pub fn encode(&self, buf: &mut Vec<u8>) {
        for field in self.fields() {
            wire::put_u64(buf, field);
        }
    }

    /// Encode into a fresh buffer, ready to be placed in an EXTENDED_REPLY
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = Vec::with_capacity(Self::ENCODED_LEN);
        self.encode(&mut buf);
        Bytes::from(buf)
    }

    pub fn decode(buf: &mut &[u8]) -> Result<Self> {
        Ok(Self {
            bsize: wire::take_u64(buf)?,
            frsize: wire::take_u64(buf)?,
            blocks: wire::take_u64(buf)?,
            bfree: wire::take_u64(buf)?,
            bavail: wire::take_u64(buf)?,
            files: wire::take_u64(buf)?,
            ffree: wire::take_u64(buf)?,
            favail: wire::take_u64(buf)?,
            fsid: wire::take_u64(buf)?,
            flag: wire::take_u64(buf)?,
            namemax: wire::take_u64(buf)?,
        })
    }
}
