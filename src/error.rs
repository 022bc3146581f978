use serde::{de::Error as DeError, ser::Error as SerError};
use std::num::TryFromIntError;

use thiserror::*;

use crate::protocol::PacketId;

pub type Result<T> = std::result::Result<T, StopWaitError>;

/// An error for the stop-and-wait channel
#[derive(Error, Debug)]
pub enum StopWaitError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Bad config: {0}")]
    BadConfig(String),

    #[error("Bad conversion: {0}")]
    IntConversion(#[from] TryFromIntError),

    #[error("Protocol violation: ack for packet {id} that was never sent")]
    ProtocolViolation { id: PacketId },

    #[error("Packet {id} was not acknowledged after {attempts} transmissions")]
    RetryLimitExceeded { id: PacketId, attempts: usize },

    #[error("Received {received} bytes while expecting {expected}")]
    LengthOverrun { expected: usize, received: usize },

    #[error("Transport closed")]
    Closed,
}

/// An error that happens while encoding or decoding a packet
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Not enough data, {0} < {1}")]
    NotEnoughData(usize, usize),
    #[error("Unknown packet type {0}")]
    UnknownPacketType(u8),
    #[error("Payload of {0} bytes exceeds the {1} byte limit")]
    PayloadTooLarge(usize, usize),
    #[error("Invalid integer conversion")]
    IntConversion(#[from] TryFromIntError),
    #[error("Serde error")]
    CustomError,
}

impl SerError for EncodingError {
    fn custom<T>(_msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        EncodingError::CustomError
    }
}

impl DeError for EncodingError {
    fn custom<T>(_msg: T) -> Self
    where
        T: std::fmt::Display,
    {
        EncodingError::CustomError
    }
}
