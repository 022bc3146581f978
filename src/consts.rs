use std::time::Duration;

/// Size of the packet header on the wire: type (1) + id (8)
pub const HEADER_LEN: usize = 9;
/// Largest payload carried by one DATA packet in the reference configuration
pub const MAX_PAYLOAD: usize = 60_000;
/// Largest datagram produced in the reference configuration
pub const MAX_DATAGRAM: usize = HEADER_LEN + MAX_PAYLOAD;
/// Largest payload a single IPv4 UDP datagram can carry
pub const UDP_MAX_PAYLOAD: usize = 65_507;
/// How long a single receive waits before the channel retransmits or polls again
pub const POLL_TIMEOUT: Duration = Duration::from_millis(10);
/// Suggested value for `ChannelConfig::retry_limit`. Not applied by default.
pub const ASSURANCE_LIMIT: usize = 3;
