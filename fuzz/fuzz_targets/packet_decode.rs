#![no_main]

use libfuzzer_sys::fuzz_target;
use stopwait::{consts::{HEADER_LEN, UDP_MAX_PAYLOAD}, EncodingError, Packet};

fuzz_target!(|data: &[u8]| {
    if data.len() > UDP_MAX_PAYLOAD {
        return;
    }

    match Packet::decode(data) {
        Ok(packet) => {
            let encoded = packet.encode().unwrap();
            assert_eq!(&encoded[..], data);
        }
        Err(EncodingError::NotEnoughData(len, _)) => assert!(len < HEADER_LEN),
        Err(EncodingError::UnknownPacketType(ty)) => assert_eq!(ty, data[0]),
        Err(e) => panic!("unexpected decode error: {e}"),
    }
});
