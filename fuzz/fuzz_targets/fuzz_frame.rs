#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use sftp_wire::FrameCodec;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = FrameCodec::new(64 * 1024);
    let mut buf = BytesMut::from(data);
    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        let _ = frame.decode();
    }
});
