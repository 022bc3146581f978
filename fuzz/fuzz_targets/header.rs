#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use serde::{de::Deserialize, ser::Serialize};
use stopwait::{
    consts::HEADER_LEN,
    net::{deserializer::WireDeserializer, serializer::WireSerializer},
    protocol::PacketHeader,
};

fuzz_target!(|header: PacketHeader| {
    roundtrip(header);
});

fn roundtrip(header: PacketHeader) {
    let mut buff = BytesMut::with_capacity(HEADER_LEN);
    let mut ser = WireSerializer::new(&mut buff);
    header.serialize(&mut ser).unwrap();
    assert_eq!(ser.size, HEADER_LEN);

    let buf = buff.freeze();
    let mut deser = WireDeserializer::new(&buf[..]);
    let out = PacketHeader::deserialize(&mut deser).unwrap();
    assert_eq!(deser.consumed, HEADER_LEN);
    assert_eq!(header, out);
}
