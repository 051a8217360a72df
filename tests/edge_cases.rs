#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for hostile and malformed input
//! Covers truncation, spoofed lengths, framing limits and trailing bytes

use bytes::{Bytes, BytesMut};
use sftp_wire::core::codec::{recv_frame, send_frame, Frame, FrameCodec};
use sftp_wire::core::packet::{
    DataPacket, NamePacket, OpenPacket, Packet, PacketType, ReadPacket, StatPacket,
    WirePacket, WritePacket,
};
use sftp_wire::core::status::{StatusCode, StatusError};
use sftp_wire::core::wire;
use sftp_wire::error::ProtocolError;
use tokio_util::codec::Decoder;

fn status_payload() -> Vec<u8> {
    Packet::status(
        9,
        StatusError::new(StatusCode::NoSuchFile, "no such file"),
    )
    .marshal()
}

// ============================================================================
// TRUNCATION
// ============================================================================

#[test]
fn test_status_truncated_inside_id() {
    let payload = status_payload();
    // Tag plus two bytes of the id
    let err = Packet::unmarshal(&payload[..3]).unwrap_err();
    assert!(matches!(err, ProtocolError::ShortPacket));
}

#[test]
fn test_every_prefix_of_status_is_short() {
    let payload = status_payload();
    for cut in 1..payload.len() {
        match Packet::unmarshal(&payload[..cut]) {
            Err(ProtocolError::ShortPacket) => {}
            other => panic!("prefix {cut} decoded as {other:?}"),
        }
    }
    assert!(Packet::unmarshal(&payload).is_ok());
}

#[test]
fn test_every_prefix_of_open_is_short() {
    let payload = Packet::Open(OpenPacket {
        id: 1,
        path: "/var/tmp/file".into(),
        pflags: 0x1a,
        attrs: Default::default(),
    })
    .marshal();
    for cut in 1..payload.len() {
        assert!(matches!(
            Packet::unmarshal(&payload[..cut]),
            Err(ProtocolError::ShortPacket)
        ));
    }
}

#[test]
fn test_empty_payload_is_short() {
    assert!(matches!(
        Packet::unmarshal(&[]),
        Err(ProtocolError::ShortPacket)
    ));
}

// ============================================================================
// SPOOFED LENGTHS
// ============================================================================

#[test]
fn test_string_length_beyond_buffer() {
    let mut body = Vec::new();
    wire::put_u32(&mut body, 4);
    wire::put_u32(&mut body, u32::MAX);
    body.extend_from_slice(b"abc");
    assert!(matches!(
        StatPacket::decode_body(&body),
        Err(ProtocolError::ShortPacket)
    ));
}

#[test]
fn test_write_declares_more_than_present() {
    let mut payload = vec![PacketType::Write.as_u8()];
    wire::put_u32(&mut payload, 3);
    wire::put_string(&mut payload, "h");
    wire::put_u64(&mut payload, 0);
    wire::put_u32(&mut payload, 1 << 20);
    payload.extend_from_slice(&[0xAB; 16]);
    assert!(matches!(
        Packet::unmarshal(&payload),
        Err(ProtocolError::ShortPacket)
    ));
}

#[test]
fn test_data_declared_length_is_data_length() {
    let packet = DataPacket {
        id: 2,
        data: Bytes::from_static(b"hello"),
    };
    let payload = packet.marshal();
    // tag, id, len
    assert_eq!(&payload[5..9], &5u32.to_be_bytes());
    assert_eq!(payload.len(), 1 + 4 + 4 + 5);
}

#[test]
fn test_name_count_without_entries() {
    let mut payload = vec![PacketType::Name.as_u8()];
    wire::put_u32(&mut payload, 1);
    wire::put_u32(&mut payload, u32::MAX);
    assert!(matches!(
        NamePacket::unmarshal(&payload),
        Err(ProtocolError::ShortPacket)
    ));
}

// ============================================================================
// TRAILING BYTES AND TAGS
// ============================================================================

#[test]
fn test_trailing_bytes_ignored() {
    let packet = ReadPacket {
        id: 4,
        handle: "fd".into(),
        offset: 1 << 40,
        len: 32768,
    };
    let mut payload = packet.marshal();
    payload.extend_from_slice(&[1, 2, 3, 4, 5]);
    assert_eq!(ReadPacket::unmarshal(&payload).unwrap(), packet);
}

#[test]
fn test_unknown_tag() {
    assert!(matches!(
        Packet::unmarshal(&[99, 0, 0, 0, 1]),
        Err(ProtocolError::UnknownPacketType(99))
    ));
    assert_eq!(Packet::recover_id(99, &[0, 0, 0, 1]), Some(1));
}

#[test]
fn test_wrong_tag_for_kind() {
    let payload = WritePacket {
        id: 1,
        handle: "h".into(),
        offset: 0,
        data: Bytes::new(),
    }
    .marshal();
    assert!(ReadPacket::unmarshal(&payload).is_err());
}

// ============================================================================
// FRAMING LIMITS
// ============================================================================

#[tokio::test]
async fn test_oversized_frame_rejected_before_read() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(64u32 * 1024 * 1024).to_be_bytes());
    bytes.extend_from_slice(&[0u8; 8]);
    let mut reader = &bytes[..];
    let err = recv_frame(&mut reader, 256 * 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::OversizedPacket(n) if n == 64 * 1024 * 1024));
    // Payload was never consumed
    assert_eq!(reader.len(), 8);
}

#[tokio::test]
async fn test_zero_length_frame_fatal() {
    let bytes = [0u8, 0, 0, 0];
    let mut reader = &bytes[..];
    let err = recv_frame(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::EmptyFrame));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn test_eof_mid_header_and_mid_payload() {
    let mut reader: &[u8] = &[0, 0];
    let err = recv_frame(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));

    let mut reader: &[u8] = &[0, 0, 0, 10, 4, 0];
    let err = recv_frame(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));

    let mut reader: &[u8] = &[];
    let err = recv_frame(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn test_undecodable_body_still_frames() {
    let mut bytes = Vec::new();
    send_frame(&mut bytes, &[PacketType::Stat.as_u8(), 0, 0])
        .await
        .unwrap();
    let mut reader = &bytes[..];
    let frame = recv_frame(&mut reader, 1024).await.unwrap();
    assert!(matches!(frame.decode(), Err(ProtocolError::ShortPacket)));
    assert!(reader.is_empty());
}

#[test]
fn test_codec_waits_for_full_frame() {
    let payload = status_payload();
    let mut framed = BytesMut::new();
    framed.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    framed.extend_from_slice(&payload);

    let mut codec = FrameCodec::default();
    let mut partial = BytesMut::from(&framed[..framed.len() - 1]);
    assert!(codec.decode(&mut partial).unwrap().is_none());

    let mut full = framed.clone();
    let frame = codec.decode(&mut full).unwrap().unwrap();
    assert_eq!(frame.payload().as_ref(), &payload[..]);
    assert!(full.is_empty());
}

#[test]
fn test_codec_rejects_oversized_header() {
    let mut codec = FrameCodec::new(34_000);
    let mut buf = BytesMut::from(&(1u32 << 20).to_be_bytes()[..]);
    assert!(matches!(
        codec.decode(&mut buf),
        Err(ProtocolError::OversizedPacket(_))
    ));
}

#[test]
fn test_frame_requires_type_byte() {
    assert!(matches!(Frame::new(Vec::new()), Err(ProtocolError::EmptyFrame)));
}
