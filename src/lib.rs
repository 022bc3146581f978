pub mod channel;
pub mod consts;
pub mod error;
pub mod net;
pub mod protocol;

pub use channel::{config::ChannelConfig, mode::Mode, stats::ChannelStats, Channel};
pub use error::{EncodingError, Result, StopWaitError};
pub use net::{
    memory::{LinkFaults, MemoryTransport},
    socket::{Received, Socket, UdpTransport},
};
pub use protocol::{Packet, PacketId, PacketType};
