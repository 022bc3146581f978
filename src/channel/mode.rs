use crate::protocol::PacketId;

/// The role a channel is currently performing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Sending,
    Receiving,
}

/// What a sending channel does after handling one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendStep {
    /// Keep waiting for the in-flight chunk's ACK
    Wait,
    /// Nothing arrived in time, transmit the in-flight chunk again
    Retransmit,
    /// The in-flight chunk was acknowledged
    Acked,
    /// The peer started sending a packet with this id
    RoleSwitch(PacketId),
}
