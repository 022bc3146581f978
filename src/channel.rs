pub mod config;
pub mod mode;
pub mod stats;

use std::collections::HashSet;

use bytes::{Bytes, BytesMut};
use tokio::net::ToSocketAddrs;

use self::{
    config::ChannelConfig,
    mode::{Mode, SendStep},
    stats::ChannelStats,
};

use crate::{
    consts::UDP_MAX_PAYLOAD,
    error::{Result, StopWaitError},
    net::socket::{Received, Socket, UdpTransport},
    protocol::{Packet, PacketId, PacketType},
};

/// A stop-and-wait reliable channel to a single peer.
///
/// One side calls [`Channel::send`] while the other calls [`Channel::recv`]
/// with the number of bytes it expects. Every DATA packet is retransmitted
/// until the peer acknowledges it. DATA ids are deduplicated on the receiving
/// side, so the transport may drop, duplicate or reorder datagrams.
///
/// The id sets are never pruned and grow for the lifetime of the channel.
pub struct Channel<S: Socket = UdpTransport> {
    socket: S,
    config: ChannelConfig,
    mode: Mode,
    next_id: PacketId,

    // ids of DATA packets we transmitted
    sent_ids: HashSet<PacketId>,
    // ids of our DATA packets the peer acknowledged
    acked_ids: HashSet<PacketId>,
    // ids of peer DATA packets already delivered to the caller
    seen_ids: HashSet<PacketId>,

    stats: ChannelStats,
}

impl<S: Socket> std::fmt::Debug for Channel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("mode", &self.mode)
            .field("next_id", &self.next_id)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Channel {
    /// Binds a UDP socket to `local` and pairs it with `remote`
    pub async fn bind(
        config: ChannelConfig,
        local: impl ToSocketAddrs,
        remote: impl ToSocketAddrs,
    ) -> Result<Self> {
        let socket = UdpTransport::bind(local, remote).await?;
        Channel::new(socket, config)
    }
}

impl<S: Socket> Channel<S> {
    pub fn new(socket: S, config: ChannelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Channel {
            socket,
            config,
            mode: Mode::default(),
            next_id: PacketId(1),
            sent_ids: Default::default(),
            acked_ids: Default::default(),
            seen_ids: Default::default(),
            stats: Default::default(),
        })
    }

    /// Reliably sends `data` to the peer, one chunk at a time.
    ///
    /// Each chunk is retransmitted every `poll_timeout` until its ACK arrives.
    /// If the peer starts sending its own data meanwhile, the channel switches
    /// to [`Mode::Receiving`] and the remaining chunks are dropped. The full
    /// length of `data` is returned in both cases.
    ///
    /// Fails with [`StopWaitError::ProtocolViolation`] if the peer acknowledges
    /// an id this channel never sent.
    pub async fn send(&mut self, data: &[u8]) -> Result<usize> {
        self.mode = Mode::Sending;
        let packets = self.segment(data);
        tracing::debug!("Sending {} bytes in {} packets", data.len(), packets.len());

        'chunks: for (index, packet) in packets.iter().enumerate() {
            let datagram = packet.encode()?;
            self.sent_ids.insert(packet.id);
            self.socket.send(&datagram).await?;
            self.stats.data_sent += 1;
            tracing::trace!("Sent {packet}");

            let mut attempts = 1;
            loop {
                let step = match self.poll().await? {
                    Some(inbound) => self.on_sending(packet.id, inbound).await?,
                    None => SendStep::Retransmit,
                };

                match step {
                    SendStep::Wait => {}
                    SendStep::Acked => break,
                    SendStep::Retransmit => {
                        if let Some(limit) = self.config.retry_limit {
                            if attempts >= limit {
                                tracing::warn!("Giving up on packet {} after {attempts} attempts", packet.id);
                                return Err(StopWaitError::RetryLimitExceeded {
                                    id: packet.id,
                                    attempts,
                                });
                            }
                        }
                        self.socket.send(&datagram).await?;
                        attempts += 1;
                        self.stats.retransmissions += 1;
                        tracing::debug!("Retransmitted packet {} (attempt {attempts})", packet.id);
                    }
                    SendStep::RoleSwitch(id) => {
                        self.mode = Mode::Receiving;
                        self.stats.role_switches += 1;
                        tracing::debug!(
                            "Peer started sending packet {id}, abandoning {} unsent packets",
                            packets.len() - index - 1
                        );
                        break 'chunks;
                    }
                }
            }
        }

        Ok(data.len())
    }

    /// Receives exactly `expected_len` bytes from the peer.
    ///
    /// Every DATA packet is acknowledged, including duplicates; only the first
    /// copy of each id contributes to the result. There is no end-of-message
    /// marker, so if the peer sends fewer bytes this never returns. If it
    /// sends more, the call fails with [`StopWaitError::LengthOverrun`].
    pub async fn recv(&mut self, expected_len: usize) -> Result<Bytes> {
        self.mode = Mode::Receiving;
        let mut collected = BytesMut::new();

        while collected.len() < expected_len {
            let Some(packet) = self.poll().await? else {
                continue;
            };
            if let Some(payload) = self.on_receiving(packet).await? {
                collected.extend_from_slice(&payload);
            }
        }

        if collected.len() > expected_len {
            tracing::warn!("Expected {expected_len} bytes but received {}", collected.len());
            return Err(StopWaitError::LengthOverrun {
                expected: expected_len,
                received: collected.len(),
            });
        }

        Ok(collected.freeze())
    }

    /// Closes the underlying transport
    pub async fn close(mut self) -> Result<()> {
        tracing::debug!("Closing channel");
        self.socket.close().await
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Id the next DATA packet will carry
    pub fn next_id(&self) -> PacketId {
        self.next_id
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn is_acked(&self, id: PacketId) -> bool {
        self.acked_ids.contains(&id)
    }

    /// Splits `data` into DATA packets of at most `max_payload` bytes
    fn segment(&mut self, data: &[u8]) -> Vec<Packet> {
        let data = Bytes::copy_from_slice(data);
        let max = self.config.max_payload;

        (0..data.len())
            .step_by(max)
            .map(|start| {
                let end = (start + max).min(data.len());
                let id = self.next_id;
                self.next_id = id.next();
                Packet::data(id, data.slice(start..end))
            })
            .collect()
    }

    /// Waits one `poll_timeout` for an inbound packet.
    ///
    /// The receive size is the UDP ceiling rather than our own `max_datagram`,
    /// so chunks from a peer with a larger `max_payload` arrive whole.
    /// Transport faults are absorbed and reported as `None`, the same as a timeout.
    async fn poll(&mut self) -> Result<Option<Packet>> {
        let received = self
            .socket
            .recv(UDP_MAX_PAYLOAD, self.config.poll_timeout)
            .await;

        match received {
            Received::Datagram(datagram) => {
                let packet = Packet::decode(&datagram)?;
                tracing::trace!("Received {packet}");
                Ok(Some(packet))
            }
            Received::Timeout => Ok(None),
            Received::Fault(e) => {
                self.stats.transport_faults += 1;
                tracing::debug!("Transport fault treated as timeout: {e}");
                Ok(None)
            }
        }
    }

    async fn on_sending(&mut self, in_flight: PacketId, packet: Packet) -> Result<SendStep> {
        match packet.packet_type {
            PacketType::Ack => {
                if !self.sent_ids.contains(&packet.id) {
                    tracing::warn!("Ack for packet {} that was never sent", packet.id);
                    return Err(StopWaitError::ProtocolViolation { id: packet.id });
                }

                self.stats.acks_received += 1;
                self.acked_ids.insert(packet.id);
                if packet.id == in_flight {
                    return Ok(SendStep::Acked);
                }

                self.stats.stale_acks += 1;
                tracing::debug!("Stale ack for packet {} while waiting on {in_flight}", packet.id);
                Ok(SendStep::Wait)
            }
            PacketType::Data if self.seen_ids.contains(&packet.id) => {
                // Peer missed our ack for data we already delivered
                self.stats.duplicates += 1;
                self.send_ack(packet.id).await?;
                Ok(SendStep::Wait)
            }
            PacketType::Data => Ok(SendStep::RoleSwitch(packet.id)),
            PacketType::Fin | PacketType::Default => {
                self.stats.ignored += 1;
                tracing::trace!("Ignoring {packet} while sending");
                Ok(SendStep::Wait)
            }
        }
    }

    /// Returns the payload to deliver, if the packet carries new data
    async fn on_receiving(&mut self, packet: Packet) -> Result<Option<Bytes>> {
        if packet.packet_type != PacketType::Data {
            self.stats.ignored += 1;
            tracing::trace!("Ignoring {packet} while receiving");
            return Ok(None);
        }

        self.send_ack(packet.id).await?;

        if !self.seen_ids.insert(packet.id) {
            self.stats.duplicates += 1;
            tracing::trace!("Duplicate packet {}", packet.id);
            return Ok(None);
        }

        Ok(Some(packet.payload.unwrap_or_default()))
    }

    async fn send_ack(&mut self, id: PacketId) -> Result<()> {
        let datagram = Packet::ack(id).encode()?;
        self.socket.send(&datagram).await?;
        self.stats.acks_sent += 1;
        tracing::trace!("Acknowledged packet {id}");
        Ok(())
    }
}
