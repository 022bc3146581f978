#![no_main]

use libfuzzer_sys::fuzz_target;
use stopwait::Packet;

fuzz_target!(|packet: Packet| {
    let Ok(bytes) = packet.encode() else {
        return;
    };
    assert_eq!(bytes.len(), packet.encoded_len());

    let out = Packet::decode(&bytes).unwrap();
    assert_eq!(packet, out);
});
