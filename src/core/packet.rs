//! # Packet Catalog
//!
//! The closed set of SFTP v3 packet kinds, each with a symmetric
//! marshal/unmarshal pair built on [`crate::core::wire`].
//!
//! ## Payload Layout
//! ```text
//! [Type(1)] [Body(N)]
//! ```
//! Every kind except INIT and VERSION starts its body with the uint32 request Id.
//!
//! Marshalling computes the exact payload size first and allocates once.
//! Unmarshalling reads fields in declared order with the checked decoders and
//! stops at the first error; bytes left over after the last declared field are
//! ignored.

use bytes::Bytes;

use crate::core::attrs::FileAttributes;
use crate::core::extended::{ExtendedRequest, ExtensionPair, StatVfs};
use crate::core::status::StatusError;
use crate::core::wire;
use crate::error::{ProtocolError, Result};

/// Packet type registry (draft-ietf-secsh-filexfer-02)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Init = 1,
    Version = 2,
    Open = 3,
    Close = 4,
    Read = 5,
    Write = 6,
    Lstat = 7,
    Fstat = 8,
    Setstat = 9,
    Fsetstat = 10,
    Opendir = 11,
    Readdir = 12,
    Remove = 13,
    Mkdir = 14,
    Rmdir = 15,
    Realpath = 16,
    Stat = 17,
    Rename = 18,
    Readlink = 19,
    Symlink = 20,
    Status = 101,
    Handle = 102,
    Data = 103,
    Name = 104,
    Attrs = 105,
    Extended = 200,
    ExtendedReply = 201,
}

impl PacketType {
    pub const ALL: [PacketType; 27] = [
        PacketType::Init,
        PacketType::Version,
        PacketType::Open,
        PacketType::Close,
        PacketType::Read,
        PacketType::Write,
        PacketType::Lstat,
        PacketType::Fstat,
        PacketType::Setstat,
        PacketType::Fsetstat,
        PacketType::Opendir,
        PacketType::Readdir,
        PacketType::Remove,
        PacketType::Mkdir,
        PacketType::Rmdir,
        PacketType::Realpath,
        PacketType::Stat,
        PacketType::Rename,
        PacketType::Readlink,
        PacketType::Symlink,
        PacketType::Status,
        PacketType::Handle,
        PacketType::Data,
        PacketType::Name,
        PacketType::Attrs,
        PacketType::Extended,
        PacketType::ExtendedReply,
    ];

    pub fn from_u8(tag: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| *t as u8 == tag)
    }

    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Registry name, used in logs
    pub fn name(self) -> &'static str {
        match self {
            PacketType::Init => "SSH_FXP_INIT",
            PacketType::Version => "SSH_FXP_VERSION",
            PacketType::Open => "SSH_FXP_OPEN",
            PacketType::Close => "SSH_FXP_CLOSE",
            PacketType::Read => "SSH_FXP_READ",
            PacketType::Write => "SSH_FXP_WRITE",
            PacketType::Lstat => "SSH_FXP_LSTAT",
            PacketType::Fstat => "SSH_FXP_FSTAT",
            PacketType::Setstat => "SSH_FXP_SETSTAT",
            PacketType::Fsetstat => "SSH_FXP_FSETSTAT",
            PacketType::Opendir => "SSH_FXP_OPENDIR",
            PacketType::Readdir => "SSH_FXP_READDIR",
            PacketType::Remove => "SSH_FXP_REMOVE",
            PacketType::Mkdir => "SSH_FXP_MKDIR",
            PacketType::Rmdir => "SSH_FXP_RMDIR",
            PacketType::Realpath => "SSH_FXP_REALPATH",
            PacketType::Stat => "SSH_FXP_STAT",
            PacketType::Rename => "SSH_FXP_RENAME",
            PacketType::Readlink => "SSH_FXP_READLINK",
            PacketType::Symlink => "SSH_FXP_SYMLINK",
            PacketType::Status => "SSH_FXP_STATUS",
            PacketType::Handle => "SSH_FXP_HANDLE",
            PacketType::Data => "SSH_FXP_DATA",
            PacketType::Name => "SSH_FXP_NAME",
            PacketType::Attrs => "SSH_FXP_ATTRS",
            PacketType::Extended => "SSH_FXP_EXTENDED",
            PacketType::ExtendedReply => "SSH_FXP_EXTENDED_REPLY",
        }
    }

    /// Whether this kind travels client to server after negotiation
    pub fn is_request(self) -> bool {
        matches!(
            self,
            PacketType::Open
                | PacketType::Close
                | PacketType::Read
                | PacketType::Write
                | PacketType::Lstat
                | PacketType::Fstat
                | PacketType::Setstat
                | PacketType::Fsetstat
                | PacketType::Opendir
                | PacketType::Readdir
                | PacketType::Remove
                | PacketType::Mkdir
                | PacketType::Rmdir
                | PacketType::Realpath
                | PacketType::Stat
                | PacketType::Rename
                | PacketType::Readlink
                | PacketType::Symlink
                | PacketType::Extended
        )
    }

    /// INIT and VERSION are the only kinds without a request Id
    pub fn has_id(self) -> bool {
        !matches!(self, PacketType::Init | PacketType::Version)
    }
}

impl TryFrom<u8> for PacketType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> Result<Self> {
        Self::from_u8(tag).ok_or(ProtocolError::UnknownPacketType(tag))
    }
}

/// OPEN pflags
pub mod open_flags {
    pub const READ: u32 = 0x0000_0001;
    pub const WRITE: u32 = 0x0000_0002;
    pub const APPEND: u32 = 0x0000_0004;
    pub const CREAT: u32 = 0x0000_0008;
    pub const TRUNC: u32 = 0x0000_0010;
    pub const EXCL: u32 = 0x0000_0020;
}

/// A packet kind with a fixed wire layout
pub trait WirePacket: Sized {
    const TYPE: PacketType;

    /// Exact size of the body (payload minus the type byte)
    fn body_len(&self) -> usize;

    fn encode_body(&self, buf: &mut Vec<u8>);

    /// Decode from the body, i.e. the payload after the type byte
    fn decode_body(body: &[u8]) -> Result<Self>;

    /// Encode the full payload: type byte followed by the body
    fn marshal(&self) -> Vec<u8> {
        let len = 1 + self.body_len();
        let mut buf = Vec::with_capacity(len);
        buf.push(Self::TYPE.as_u8());
        self.encode_body(&mut buf);
        debug_assert_eq!(buf.len(), len);
        buf
    }

    /// Decode a full payload, checking the type byte
    fn unmarshal(payload: &[u8]) -> Result<Self> {
        match payload.split_first() {
            Some((&tag, body)) if tag == Self::TYPE.as_u8() => Self::decode_body(body),
            Some((&tag, _)) => Err(ProtocolError::UnknownPacketType(tag)),
            None => Err(ProtocolError::ShortPacket),
        }
    }
}

fn extensions_len(extensions: &[ExtensionPair]) -> usize {
    extensions.iter().map(ExtensionPair::encoded_len).sum()
}

fn decode_extensions(mut body: &[u8]) -> Result<Vec<ExtensionPair>> {
    let mut extensions = Vec::new();
    while !body.is_empty() {
        extensions.push(ExtensionPair::decode(&mut body)?);
    }
    Ok(extensions)
}

/// SSH_FXP_INIT: client hello
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InitPacket {
    pub version: u32,
    pub extensions: Vec<ExtensionPair>,
}

impl WirePacket for InitPacket {
    const TYPE: PacketType = PacketType::Init;

    fn body_len(&self) -> usize {
        4 + extensions_len(&self.extensions)
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.version);
        for ext in &self.extensions {
            ext.encode(buf);
        }
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let version = wire::take_u32(&mut body)?;
        let extensions = decode_extensions(body)?;
        Ok(Self {
            version,
            extensions,
        })
    }
}

/// SSH_FXP_VERSION: server hello
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VersionPacket {
    pub version: u32,
    pub extensions: Vec<ExtensionPair>,
}

impl WirePacket for VersionPacket {
    const TYPE: PacketType = PacketType::Version;

    fn body_len(&self) -> usize {
        4 + extensions_len(&self.extensions)
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.version);
        for ext in &self.extensions {
            ext.encode(buf);
        }
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let version = wire::take_u32(&mut body)?;
        let extensions = decode_extensions(body)?;
        Ok(Self {
            version,
            extensions,
        })
    }
}

/// Kinds whose body is exactly `uint32 id || string field`
macro_rules! id_string_packet {
    ($(#[$meta:meta])* $name:ident, $kind:ident, $field:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub id: u32,
            pub $field: String,
        }

        impl WirePacket for $name {
            const TYPE: PacketType = PacketType::$kind;

            fn body_len(&self) -> usize {
                4 + wire::string_len(self.$field.as_bytes())
            }

            fn encode_body(&self, buf: &mut Vec<u8>) {
                wire::put_u32(buf, self.id);
                wire::put_string(buf, &self.$field);
            }

            fn decode_body(mut body: &[u8]) -> Result<Self> {
                let id = wire::take_u32(&mut body)?;
                let $field = wire::take_string(&mut body)?;
                Ok(Self { id, $field })
            }
        }
    };
}

id_string_packet!(
    /// SSH_FXP_CLOSE
    ClosePacket, Close, handle
);
id_string_packet!(
    /// SSH_FXP_LSTAT: attributes of `path`, not following a final symlink
    LstatPacket, Lstat, path
);
id_string_packet!(
    /// SSH_FXP_FSTAT
    FstatPacket, Fstat, handle
);
id_string_packet!(
    /// SSH_FXP_STAT: attributes of `path`, following symlinks
    StatPacket, Stat, path
);
id_string_packet!(
    /// SSH_FXP_OPENDIR
    OpendirPacket, Opendir, path
);
id_string_packet!(
    /// SSH_FXP_READDIR
    ReaddirPacket, Readdir, handle
);
id_string_packet!(
    /// SSH_FXP_REMOVE
    RemovePacket, Remove, filename
);
id_string_packet!(
    /// SSH_FXP_RMDIR
    RmdirPacket, Rmdir, path
);
id_string_packet!(
    /// SSH_FXP_REALPATH: canonicalize `path`, answered with a one-entry NAME
    RealpathPacket, Realpath, path
);
id_string_packet!(
    /// SSH_FXP_READLINK: target of the symlink at `path`, answered with NAME
    ReadlinkPacket, Readlink, path
);
id_string_packet!(
    /// SSH_FXP_HANDLE
    HandlePacket, Handle, handle
);

/// SSH_FXP_OPEN
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenPacket {
    pub id: u32,
    pub path: String,
    /// Bitwise OR of [`open_flags`]
    pub pflags: u32,
    pub attrs: FileAttributes,
}

impl WirePacket for OpenPacket {
    const TYPE: PacketType = PacketType::Open;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.path.as_bytes()) + 4 + self.attrs.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.path);
        wire::put_u32(buf, self.pflags);
        self.attrs.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let path = wire::take_string(&mut body)?;
        let pflags = wire::take_u32(&mut body)?;
        let attrs = FileAttributes::decode(&mut body)?;
        Ok(Self {
            id,
            path,
            pflags,
            attrs,
        })
    }
}

/// SSH_FXP_READ
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadPacket {
    pub id: u32,
    pub handle: String,
    pub offset: u64,
    pub len: u32,
}

impl WirePacket for ReadPacket {
    const TYPE: PacketType = PacketType::Read;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.handle.as_bytes()) + 8 + 4
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.handle);
        wire::put_u64(buf, self.offset);
        wire::put_u32(buf, self.len);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let handle = wire::take_string(&mut body)?;
        let offset = wire::take_u64(&mut body)?;
        let len = wire::take_u32(&mut body)?;
        Ok(Self {
            id,
            handle,
            offset,
            len,
        })
    }
}

/// SSH_FXP_WRITE. The declared length on the wire is `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WritePacket {
    pub id: u32,
    pub handle: String,
    pub offset: u64,
    pub data: Bytes,
}

impl WirePacket for WritePacket {
    const TYPE: PacketType = PacketType::Write;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.handle.as_bytes()) + 8 + 4 + self.data.len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.handle);
        wire::put_u64(buf, self.offset);
        wire::put_u32(buf, self.data.len() as u32);
        buf.extend_from_slice(&self.data);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let handle = wire::take_string(&mut body)?;
        let offset = wire::take_u64(&mut body)?;
        let len = wire::take_u32(&mut body)? as usize;
        let data = Bytes::copy_from_slice(wire::take_raw(&mut body, len)?);
        Ok(Self {
            id,
            handle,
            offset,
            data,
        })
    }
}

/// SSH_FXP_SETSTAT
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SetstatPacket {
    pub id: u32,
    pub path: String,
    pub attrs: FileAttributes,
}

impl WirePacket for SetstatPacket {
    const TYPE: PacketType = PacketType::Setstat;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.path.as_bytes()) + self.attrs.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.path);
        self.attrs.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let path = wire::take_string(&mut body)?;
        let attrs = FileAttributes::decode(&mut body)?;
        Ok(Self { id, path, attrs })
    }
}

/// SSH_FXP_FSETSTAT
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FsetstatPacket {
    pub id: u32,
    pub handle: String,
    pub attrs: FileAttributes,
}

impl WirePacket for FsetstatPacket {
    const TYPE: PacketType = PacketType::Fsetstat;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.handle.as_bytes()) + self.attrs.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.handle);
        self.attrs.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let handle = wire::take_string(&mut body)?;
        let attrs = FileAttributes::decode(&mut body)?;
        Ok(Self { id, handle, attrs })
    }
}

/// SSH_FXP_MKDIR
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MkdirPacket {
    pub id: u32,
    pub path: String,
    pub attrs: FileAttributes,
}

impl WirePacket for MkdirPacket {
    const TYPE: PacketType = PacketType::Mkdir;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.path.as_bytes()) + self.attrs.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.path);
        self.attrs.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let path = wire::take_string(&mut body)?;
        let attrs = FileAttributes::decode(&mut body)?;
        Ok(Self { id, path, attrs })
    }
}

/// SSH_FXP_RENAME
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenamePacket {
    pub id: u32,
    pub oldpath: String,
    pub newpath: String,
}

impl WirePacket for RenamePacket {
    const TYPE: PacketType = PacketType::Rename;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.oldpath.as_bytes()) + wire::string_len(self.newpath.as_bytes())
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.oldpath);
        wire::put_string(buf, &self.newpath);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let oldpath = wire::take_string(&mut body)?;
        let newpath = wire::take_string(&mut body)?;
        Ok(Self {
            id,
            oldpath,
            newpath,
        })
    }
}

/// SSH_FXP_SYMLINK
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymlinkPacket {
    pub id: u32,
    pub targetpath: String,
    pub linkpath: String,
}

impl WirePacket for SymlinkPacket {
    const TYPE: PacketType = PacketType::Symlink;

    fn body_len(&self) -> usize {
        4 + wire::string_len(self.targetpath.as_bytes())
            + wire::string_len(self.linkpath.as_bytes())
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_string(buf, &self.targetpath);
        wire::put_string(buf, &self.linkpath);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let targetpath = wire::take_string(&mut body)?;
        let linkpath = wire::take_string(&mut body)?;
        Ok(Self {
            id,
            targetpath,
            linkpath,
        })
    }
}

/// SSH_FXP_STATUS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusPacket {
    pub id: u32,
    pub status: StatusError,
}

impl WirePacket for StatusPacket {
    const TYPE: PacketType = PacketType::Status;

    fn body_len(&self) -> usize {
        4 + self.status.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        self.status.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let status = StatusError::decode(&mut body)?;
        Ok(Self { id, status })
    }
}

/// SSH_FXP_DATA. The declared length on the wire is `data.len()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataPacket {
    pub id: u32,
    pub data: Bytes,
}

impl WirePacket for DataPacket {
    const TYPE: PacketType = PacketType::Data;

    fn body_len(&self) -> usize {
        4 + 4 + self.data.len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_u32(buf, self.data.len() as u32);
        buf.extend_from_slice(&self.data);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let len = wire::take_u32(&mut body)? as usize;
        let data = Bytes::copy_from_slice(wire::take_raw(&mut body, len)?);
        Ok(Self { id, data })
    }
}

/// One entry of a NAME response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameEntry {
    pub filename: String,
    /// `ls -l` style rendering; informational only
    pub longname: String,
    pub attrs: FileAttributes,
}

impl NameEntry {
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        Self {
            longname: filename.clone(),
            filename,
            attrs: FileAttributes::default(),
        }
    }

    fn encoded_len(&self) -> usize {
        wire::string_len(self.filename.as_bytes())
            + wire::string_len(self.longname.as_bytes())
            + self.attrs.encoded_len()
    }
}

/// SSH_FXP_NAME
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamePacket {
    pub id: u32,
    pub entries: Vec<NameEntry>,
}

impl WirePacket for NamePacket {
    const TYPE: PacketType = PacketType::Name;

    fn body_len(&self) -> usize {
        4 + 4 + self.entries.iter().map(NameEntry::encoded_len).sum::<usize>()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        wire::put_u32(buf, self.entries.len() as u32);
        for entry in &self.entries {
            wire::put_string(buf, &entry.filename);
            wire::put_string(buf, &entry.longname);
            entry.attrs.encode(buf);
        }
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let count = wire::take_u32(&mut body)?;
        // Never trust the count for preallocation; an entry is at least 12 bytes
        let mut entries = Vec::with_capacity((count as usize).min(body.len() / 12));
        for _ in 0..count {
            let filename = wire::take_string(&mut body)?;
            let longname = wire::take_string(&mut body)?;
            let attrs = FileAttributes::decode(&mut body)?;
            entries.push(NameEntry {
                filename,
                longname,
                attrs,
            });
        }
        Ok(Self { id, entries })
    }
}

/// SSH_FXP_ATTRS
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttrsPacket {
    pub id: u32,
    pub attrs: FileAttributes,
}

impl WirePacket for AttrsPacket {
    const TYPE: PacketType = PacketType::Attrs;

    fn body_len(&self) -> usize {
        4 + self.attrs.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        self.attrs.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let attrs = FileAttributes::decode(&mut body)?;
        Ok(Self { id, attrs })
    }
}

/// SSH_FXP_EXTENDED
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPacket {
    pub id: u32,
    pub request: ExtendedRequest,
}

impl ExtendedPacket {
    pub fn statvfs(id: u32, path: impl Into<String>) -> Self {
        Self {
            id,
            request: ExtendedRequest::Statvfs { path: path.into() },
        }
    }
}

impl WirePacket for ExtendedPacket {
    const TYPE: PacketType = PacketType::Extended;

    fn body_len(&self) -> usize {
        4 + self.request.encoded_len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        self.request.encode(buf);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        let request = ExtendedRequest::decode(&mut body)?;
        Ok(Self { id, request })
    }
}

/// SSH_FXP_EXTENDED_REPLY; the body format depends on the request it answers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedReplyPacket {
    pub id: u32,
    pub data: Bytes,
}

impl ExtendedReplyPacket {
    /// Reply to `statvfs@openssh.com`
    pub fn statvfs(id: u32, vfs: &StatVfs) -> Self {
        Self {
            id,
            data: vfs.to_bytes(),
        }
    }

    /// Interpret the reply body as `statvfs@openssh.com` output
    pub fn to_statvfs(&self) -> Result<StatVfs> {
        let mut body = &self.data[..];
        StatVfs::decode(&mut body)
    }
}

impl WirePacket for ExtendedReplyPacket {
    const TYPE: PacketType = PacketType::ExtendedReply;

    fn body_len(&self) -> usize {
        4 + self.data.len()
    }

    fn encode_body(&self, buf: &mut Vec<u8>) {
        wire::put_u32(buf, self.id);
        buf.extend_from_slice(&self.data);
    }

    fn decode_body(mut body: &[u8]) -> Result<Self> {
        let id = wire::take_u32(&mut body)?;
        Ok(Self {
            id,
            data: Bytes::copy_from_slice(body),
        })
    }
}

/// Any packet of the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Init(InitPacket),
    Version(VersionPacket),
    Open(OpenPacket),
    Close(ClosePacket),
    Read(ReadPacket),
    Write(WritePacket),
    Lstat(LstatPacket),
    Fstat(FstatPacket),
    Setstat(SetstatPacket),
    Fsetstat(FsetstatPacket),
    Opendir(OpendirPacket),
    Readdir(ReaddirPacket),
    Remove(RemovePacket),
    Mkdir(MkdirPacket),
    Rmdir(RmdirPacket),
    Realpath(RealpathPacket),
    Stat(StatPacket),
    Rename(RenamePacket),
    Readlink(ReadlinkPacket),
    Symlink(SymlinkPacket),
    Status(StatusPacket),
    Handle(HandlePacket),
    Data(DataPacket),
    Name(NamePacket),
    Attrs(AttrsPacket),
    Extended(ExtendedPacket),
    ExtendedReply(ExtendedReplyPacket),
}

/// Expands `$body` once per variant with `$p` bound to the inner packet
macro_rules! for_each_variant {
    ($packet:expr, $p:ident => $body:expr) => {
        match $packet {
            Packet::Init($p) => $body,
            Packet::Version($p) => $body,
            Packet::Open($p) => $body,
            Packet::Close($p) => $body,
            Packet::Read($p) => $body,
            Packet::Write($p) => $body,
            Packet::Lstat($p) => $body,
            Packet::Fstat($p) => $body,
            Packet::Setstat($p) => $body,
            Packet::Fsetstat($p) => $body,
            Packet::Opendir($p) => $body,
            Packet::Readdir($p) => $body,
            Packet::Remove($p) => $body,
            Packet::Mkdir($p) => $body,
            Packet::Rmdir($p) => $body,
            Packet::Realpath($p) => $body,
            Packet::Stat($p) => $body,
            Packet::Rename($p) => $body,
            Packet::Readlink($p) => $body,
            Packet::Symlink($p) => $body,
            Packet::Status($p) => $body,
            Packet::Handle($p) => $body,
            Packet::Data($p) => $body,
            Packet::Name($p) => $body,
            Packet::Attrs($p) => $body,
            Packet::Extended($p) => $body,
            Packet::ExtendedReply($p) => $body,
        }
    };
}

macro_rules! impl_from_packet {
    ($($variant:ident($inner:ty)),* $(,)?) => {
        $(
            impl From<$inner> for Packet {
                fn from(p: $inner) -> Self {
                    Packet::$variant(p)
                }
            }
        )*
    };
}

impl_from_packet!(
    Init(InitPacket),
    Version(VersionPacket),
    Open(OpenPacket),
    Close(ClosePacket),
    Read(ReadPacket),
    Write(WritePacket),
    Lstat(LstatPacket),
    Fstat(FstatPacket),
    Setstat(SetstatPacket),
    Fsetstat(FsetstatPacket),
    Opendir(OpendirPacket),
    Readdir(ReaddirPacket),
    Remove(RemovePacket),
    Mkdir(MkdirPacket),
    Rmdir(RmdirPacket),
    Realpath(RealpathPacket),
    Stat(StatPacket),
    Rename(RenamePacket),
    Readlink(ReadlinkPacket),
    Symlink(SymlinkPacket),
    Status(StatusPacket),
    Handle(HandlePacket),
    Data(DataPacket),
    Name(NamePacket),
    Attrs(AttrsPacket),
    Extended(ExtendedPacket),
    ExtendedReply(ExtendedReplyPacket),
);

fn packet_type_of<P: WirePacket>(_: &P) -> PacketType {
    P::TYPE
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        for_each_variant!(self, p => packet_type_of(p))
    }

    /// Request Id; `None` for INIT and VERSION
    pub fn id(&self) -> Option<u32> {
        match self {
            Packet::Init(_) | Packet::Version(_) => None,
            Packet::Open(p) => Some(p.id),
            Packet::Close(p) => Some(p.id),
            Packet::Read(p) => Some(p.id),
            Packet::Write(p) => Some(p.id),
            Packet::Lstat(p) => Some(p.id),
            Packet::Fstat(p) => Some(p.id),
            Packet::Setstat(p) => Some(p.id),
            Packet::Fsetstat(p) => Some(p.id),
            Packet::Opendir(p) => Some(p.id),
            Packet::Readdir(p) => Some(p.id),
            Packet::Remove(p) => Some(p.id),
            Packet::Mkdir(p) => Some(p.id),
            Packet::Rmdir(p) => Some(p.id),
            Packet::Realpath(p) => Some(p.id),
            Packet::Stat(p) => Some(p.id),
            Packet::Rename(p) => Some(p.id),
            Packet::Readlink(p) => Some(p.id),
            Packet::Symlink(p) => Some(p.id),
            Packet::Status(p) => Some(p.id),
            Packet::Handle(p) => Some(p.id),
            Packet::Data(p) => Some(p.id),
            Packet::Name(p) => Some(p.id),
            Packet::Attrs(p) => Some(p.id),
            Packet::Extended(p) => Some(p.id),
            Packet::ExtendedReply(p) => Some(p.id),
        }
    }

    /// Full payload length, type byte included
    pub fn encoded_len(&self) -> usize {
        1 + for_each_variant!(self, p => p.body_len())
    }

    /// Encode the full payload (type byte + body)
    pub fn marshal(&self) -> Vec<u8> {
        for_each_variant!(self, p => p.marshal())
    }

    /// Decode a body for the given type tag
    pub fn decode(tag: u8, body: &[u8]) -> Result<Packet> {
        let packet_type = PacketType::try_from(tag)?;
        Ok(match packet_type {
            PacketType::Init => InitPacket::decode_body(body)?.into(),
            PacketType::Version => VersionPacket::decode_body(body)?.into(),
            PacketType::Open => OpenPacket::decode_body(body)?.into(),
            PacketType::Close => ClosePacket::decode_body(body)?.into(),
            PacketType::Read => ReadPacket::decode_body(body)?.into(),
            PacketType::Write => WritePacket::decode_body(body)?.into(),
            PacketType::Lstat => LstatPacket::decode_body(body)?.into(),
            PacketType::Fstat => FstatPacket::decode_body(body)?.into(),
            PacketType::Setstat => SetstatPacket::decode_body(body)?.into(),
            PacketType::Fsetstat => FsetstatPacket::decode_body(body)?.into(),
            PacketType::Opendir => OpendirPacket::decode_body(body)?.into(),
            PacketType::Readdir => ReaddirPacket::decode_body(body)?.into(),
            PacketType::Remove => RemovePacket::decode_body(body)?.into(),
            PacketType::Mkdir => MkdirPacket::decode_body(body)?.into(),
            PacketType::Rmdir => RmdirPacket::decode_body(body)?.into(),
            PacketType::Realpath => RealpathPacket::decode_body(body)?.into(),
            PacketType::Stat => StatPacket::decode_body(body)?.into(),
            PacketType::Rename => RenamePacket::decode_body(body)?.into(),
            PacketType::Readlink => ReadlinkPacket::decode_body(body)?.into(),
            PacketType::Symlink => SymlinkPacket::decode_body(body)?.into(),
            PacketType::Status => StatusPacket::decode_body(body)?.into(),
            PacketType::Handle => HandlePacket::decode_body(body)?.into(),
            PacketType::Data => DataPacket::decode_body(body)?.into(),
            PacketType::Name => NamePacket::decode_body(body)?.into(),
            PacketType::Attrs => AttrsPacket::decode_body(body)?.into(),
            PacketType::Extended => ExtendedPacket::decode_body(body)?.into(),
            PacketType::ExtendedReply => ExtendedReplyPacket::decode_body(body)?.into(),
        })
    }

    /// Decode a full payload (type byte + body)
    pub fn unmarshal(payload: &[u8]) -> Result<Packet> {
        match payload.split_first() {
            Some((&tag, body)) => Self::decode(tag, body),
            None => Err(ProtocolError::ShortPacket),
        }
    }

    /// Best-effort Id recovery from a body that failed to decode.
    ///
    /// Every kind past negotiation starts with the Id, unknown extension kinds
    /// included, so the first four bytes are used unless the tag is INIT or
    /// VERSION.
    pub fn recover_id(tag: u8, mut body: &[u8]) -> Option<u32> {
        if matches!(
            PacketType::from_u8(tag),
            Some(PacketType::Init | PacketType::Version)
        ) {
            return None;
        }
        wire::take_u32(&mut body).ok()
    }

    /// STATUS response for `id`
    pub fn status(id: u32, status: StatusError) -> Packet {
        Packet::Status(StatusPacket { id, status })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::core::status::StatusCode;

    #[test]
    fn test_registry_values() {
        assert_eq!(PacketType::Init.as_u8(), 1);
        assert_eq!(PacketType::Lstat.as_u8(), 7);
        assert_eq!(PacketType::Realpath.as_u8(), 16);
        assert_eq!(PacketType::Stat.as_u8(), 17);
        assert_eq!(PacketType::Readlink.as_u8(), 19);
        assert_eq!(PacketType::Status.as_u8(), 101);
        assert_eq!(PacketType::Attrs.as_u8(), 105);
        assert_eq!(PacketType::Extended.as_u8(), 200);
        assert_eq!(PacketType::ExtendedReply.as_u8(), 201);
        for t in PacketType::ALL {
            assert_eq!(PacketType::from_u8(t.as_u8()), Some(t));
        }
        assert_eq!(PacketType::from_u8(0), None);
        assert_eq!(PacketType::from_u8(21), None);
    }

    #[test]
    fn test_stat_and_lstat_tags_differ() {
        let stat = StatPacket {
            id: 1,
            path: "/a".into(),
        }
        .marshal();
        let lstat = LstatPacket {
            id: 1,
            path: "/a".into(),
        }
        .marshal();
        assert_eq!(stat[0], 17);
        assert_eq!(lstat[0], 7);
        assert_eq!(stat[1..], lstat[1..]);
        assert!(matches!(Packet::unmarshal(&stat).unwrap(), Packet::Stat(_)));
        assert!(matches!(Packet::unmarshal(&lstat).unwrap(), Packet::Lstat(_)));
    }

    #[test]
    fn test_realpath_and_readlink_tags_differ() {
        let realpath = RealpathPacket {
            id: 2,
            path: ".".into(),
        }
        .marshal();
        let readlink = ReadlinkPacket {
            id: 2,
            path: ".".into(),
        }
        .marshal();
        assert_eq!(realpath[0], 16);
        assert_eq!(readlink[0], 19);
        assert!(matches!(
            Packet::unmarshal(&realpath).unwrap(),
            Packet::Realpath(_)
        ));
        assert!(matches!(
            Packet::unmarshal(&readlink).unwrap(),
            Packet::Readlink(_)
        ));
    }

    #[test]
    fn test_open_wire_layout() {
        let open = OpenPacket {
            id: 7,
            path: "/tmp/x".into(),
            pflags: open_flags::READ,
            attrs: FileAttributes::default(),
        };
        let mut expected = vec![3u8, 0, 0, 0, 7, 0, 0, 0, 6];
        expected.extend_from_slice(b"/tmp/x");
        expected.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0]);

        let bytes = open.marshal();
        assert_eq!(bytes, expected);
        assert_eq!(OpenPacket::unmarshal(&bytes).unwrap(), open);
    }

    #[test]
    fn test_status_roundtrip_and_truncation() {
        let status = StatusPacket {
            id: 42,
            status: StatusError::new(StatusCode::NoSuchFile, "not found"),
        };
        let bytes = status.marshal();
        assert_eq!(StatusPacket::unmarshal(&bytes).unwrap(), status);
        assert!(matches!(
            StatusPacket::decode_body(&bytes[1..4]),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_write_declared_length_beyond_buffer() {
        let write = WritePacket {
            id: 1,
            handle: "h".into(),
            offset: 0,
            data: Bytes::from_static(b"abcd"),
        };
        let mut bytes = write.marshal();
        // Drop one data byte; the declared length now lies
        bytes.pop();
        assert!(matches!(
            WritePacket::unmarshal(&bytes),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_data_declared_length_beyond_buffer() {
        let mut body = Vec::new();
        wire::put_u32(&mut body, 9);
        wire::put_u32(&mut body, 1024);
        body.extend_from_slice(&[0u8; 16]);
        assert!(matches!(
            DataPacket::decode_body(&body),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut bytes = ClosePacket {
            id: 3,
            handle: "h1".into(),
        }
        .marshal();
        bytes.extend_from_slice(&[1, 2, 3]);
        let decoded = ClosePacket::unmarshal(&bytes).unwrap();
        assert_eq!(decoded.handle, "h1");
    }

    #[test]
    fn test_unmarshal_checks_tag() {
        let bytes = ClosePacket::default().marshal();
        assert!(matches!(
            RemovePacket::unmarshal(&bytes),
            Err(ProtocolError::UnknownPacketType(4))
        ));
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            Packet::decode(99, &[0, 0, 0, 1]),
            Err(ProtocolError::UnknownPacketType(99))
        ));
        assert_eq!(Packet::recover_id(99, &[0, 0, 0, 1]), Some(1));
    }

    #[test]
    fn test_recover_id() {
        assert_eq!(Packet::recover_id(3, &[0, 0, 0, 5, 0xFF]), Some(5));
        assert_eq!(Packet::recover_id(3, &[0, 0]), None);
        assert_eq!(Packet::recover_id(1, &[0, 0, 0, 3]), None);
    }

    #[test]
    fn test_init_extension_list() {
        let init = InitPacket {
            version: 3,
            extensions: vec![
                ExtensionPair::new("statvfs@openssh.com", "2"),
                ExtensionPair::new("", ""),
            ],
        };
        let bytes = init.marshal();
        assert_eq!(bytes.len(), 1 + init.body_len());
        assert_eq!(InitPacket::unmarshal(&bytes).unwrap(), init);
    }

    #[test]
    fn test_version_roundtrip() {
        let bare = VersionPacket {
            version: 3,
            extensions: Vec::new(),
        };
        assert_eq!(bare.marshal(), vec![2, 0, 0, 0, 3]);
        assert_eq!(
            Packet::unmarshal(&bare.marshal()).unwrap(),
            Packet::Version(bare)
        );

        let advertised = VersionPacket {
            version: 3,
            extensions: vec![ExtensionPair::new("statvfs@openssh.com", "2")],
        };
        let bytes = advertised.marshal();
        assert_eq!(bytes.len(), 1 + advertised.body_len());
        assert_eq!(VersionPacket::unmarshal(&bytes).unwrap(), advertised);
    }

    #[test]
    fn test_init_truncated_extension() {
        let mut bytes = InitPacket {
            version: 3,
            extensions: vec![ExtensionPair::new("a", "b")],
        }
        .marshal();
        bytes.pop();
        assert!(matches!(
            InitPacket::unmarshal(&bytes),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_name_spoofed_count() {
        let mut body = Vec::new();
        wire::put_u32(&mut body, 1);
        wire::put_u32(&mut body, u32::MAX);
        assert!(matches!(
            NamePacket::decode_body(&body),
            Err(ProtocolError::ShortPacket)
        ));
    }

    #[test]
    fn test_statvfs_extended_roundtrip() {
        let request = ExtendedPacket::statvfs(11, "/srv");
        let bytes = request.marshal();
        assert_eq!(
            Packet::unmarshal(&bytes).unwrap(),
            Packet::Extended(request)
        );

        let vfs = StatVfs {
            frsize: 512,
            blocks: 10,
            bfree: 4,
            ..Default::default()
        };
        let reply = ExtendedReplyPacket::statvfs(11, &vfs);
        let decoded = ExtendedReplyPacket::unmarshal(&reply.marshal()).unwrap();
        assert_eq!(decoded.to_statvfs().unwrap(), vfs);
        assert_eq!(decoded.to_statvfs().unwrap().total_space(), 5120);
    }

    #[test]
    fn test_packet_id_and_type() {
        let packet = Packet::from(ReadPacket {
            id: 77,
            handle: "h".into(),
            offset: u64::MAX,
            len: 32768,
        });
        assert_eq!(packet.id(), Some(77));
        assert_eq!(packet.packet_type(), PacketType::Read);
        assert_eq!(packet.encoded_len(), packet.marshal().len());

        let init = Packet::from(InitPacket::default());
        assert_eq!(init.id(), None);
    }
}
