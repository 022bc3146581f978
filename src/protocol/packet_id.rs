use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Identifier carried in every packet header.
///
/// DATA ids are assigned by the sender, starting at 1. An ACK carries the id
/// of the DATA packet it acknowledges.
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Eq, PartialEq, Hash, Ord, PartialOrd, Copy, Clone, Debug, Default, Serialize, Deserialize)]
pub struct PacketId(pub u64);

impl PacketId {
    /// The id following this one
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

macro_rules! impl_convers_ids {
    ($ty: path) => {
        impl Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<u64> for $ty {
            fn from(value: u64) -> Self {
                $ty(value)
            }
        }

        impl From<$ty> for u64 {
            fn from(value: $ty) -> Self {
                value.0
            }
        }
    };
}

impl_convers_ids!(PacketId);
