mod packet_id;
pub use packet_id::*;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::{
    consts::{HEADER_LEN, UDP_MAX_PAYLOAD},
    error::EncodingError,
    net::{deserializer::WireDeserializer, serializer::WireSerializer},
};

/// Kind of packet, stored in the first header byte
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Default = 0,
    Ack = 1,
    Data = 2,
    Fin = 4,
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::Default),
            1 => Ok(PacketType::Ack),
            2 => Ok(PacketType::Data),
            4 => Ok(PacketType::Fin),
            other => Err(EncodingError::UnknownPacketType(other)),
        }
    }
}

/// Header at the start of every datagram
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    pub packet_type: u8,
    pub id: PacketId,
}

/// A decoded datagram.
///
/// `payload` is `None` when nothing follows the header, never `Some` of an
/// empty buffer, so encoding and decoding are exact inverses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub id: PacketId,
    pub payload: Option<Bytes>,
}

impl Packet {
    pub fn new(packet_type: PacketType, id: PacketId, payload: Option<Bytes>) -> Self {
        Self {
            packet_type,
            id,
            payload: payload.filter(|p| !p.is_empty()),
        }
    }

    pub fn data(id: PacketId, payload: Bytes) -> Self {
        Self::new(PacketType::Data, id, Some(payload))
    }

    pub fn ack(id: PacketId) -> Self {
        Self::new(PacketType::Ack, id, None)
    }

    pub fn payload_len(&self) -> usize {
        self.payload.as_ref().map_or(0, Bytes::len)
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload_len()
    }

    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            packet_type: self.packet_type.into(),
            id: self.id,
        }
    }

    /// Writes the 9 byte header followed by the payload, if any
    pub fn encode(&self) -> Result<Bytes, EncodingError> {
        let max = UDP_MAX_PAYLOAD - HEADER_LEN;
        if self.payload_len() > max {
            return Err(EncodingError::PayloadTooLarge(self.payload_len(), max));
        }

        let mut buf = BytesMut::with_capacity(self.encoded_len());
        let mut ser = WireSerializer::new(&mut buf);
        self.header().serialize(&mut ser)?;
        debug_assert_eq!(ser.size, HEADER_LEN);

        if let Some(payload) = &self.payload {
            buf.put_slice(payload);
        }
        Ok(buf.freeze())
    }

    /// Parses a datagram. Everything after the header becomes the payload.
    pub fn decode(datagram: &[u8]) -> Result<Self, EncodingError> {
        if datagram.len() < HEADER_LEN {
            return Err(EncodingError::NotEnoughData(datagram.len(), HEADER_LEN));
        }

        let mut deser = WireDeserializer::new(datagram);
        let header = PacketHeader::deserialize(&mut deser)?;
        let packet_type = PacketType::try_from(header.packet_type)?;

        let body = &datagram[deser.consumed..];
        let payload = (!body.is_empty()).then(|| Bytes::copy_from_slice(body));

        Ok(Packet {
            packet_type,
            id: header.id,
            payload,
        })
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} id: {} size: {}",
            self.packet_type,
            self.id,
            self.encoded_len()
        )
    }
}

#[cfg(feature = "arbitrary")]
impl<'a> arbitrary::Arbitrary<'a> for Packet {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        let packet_type: PacketType = u.arbitrary()?;
        let id: PacketId = u.arbitrary()?;
        let payload: Option<Vec<u8>> = u.arbitrary()?;
        Ok(Packet::new(packet_type, id, payload.map(Bytes::from)))
    }
}
