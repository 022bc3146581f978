/// Counters accumulated over the lifetime of a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// First transmissions of DATA packets
    pub data_sent: u64,
    pub retransmissions: u64,
    pub acks_sent: u64,
    pub acks_received: u64,
    /// DATA packets received again after they were delivered
    pub duplicates: u64,
    /// ACKs for chunks that were already acknowledged
    pub stale_acks: u64,
    pub role_switches: u64,
    /// Receive failures absorbed as timeouts
    pub transport_faults: u64,
    /// Packets with no meaning in the current mode
    pub ignored: u64,
}
