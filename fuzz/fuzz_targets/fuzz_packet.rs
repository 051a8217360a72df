#![no_main]

use libfuzzer_sys::fuzz_target;
use sftp_wire::Packet;

fuzz_target!(|data: &[u8]| {
    // Arbitrary payloads must decode or fail, never panic
    if let Ok(packet) = Packet::unmarshal(data) {
        let again = packet.marshal();
        assert_eq!(Packet::unmarshal(&again).ok(), Some(packet));
    }
    if let Some((&tag, body)) = data.split_first() {
        let _ = Packet::recover_id(tag, body);
    }
});
