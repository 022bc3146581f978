//! In-process datagram link for tests and simulations.
//!
//! [`MemoryTransport::pair`] returns two connected endpoints. Each direction
//! applies its own [`LinkFaults`] on send, so a test can make one side lossy
//! while the other stays clean.

use std::{collections::HashSet, io, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use random::Source;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::socket::{Received, Socket};
use crate::error::{Result, StopWaitError};

/// Fault model applied to datagrams leaving one endpoint.
///
/// Probabilities are in `[0.0, 1.0]`. The default is a clean pass-through.
#[derive(Debug, Clone)]
pub struct LinkFaults {
    /// Probability that a datagram is silently dropped
    pub loss_rate: f64,
    /// Probability that a delivered datagram is delivered twice
    pub duplicate_rate: f64,
    /// Drop the first transmission of every distinct datagram
    pub drop_first_copy: bool,
    pub seed: u64,
}

impl Default for LinkFaults {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            drop_first_copy: false,
            seed: 10,
        }
    }
}

impl LinkFaults {
    pub fn lossy(loss_rate: f64) -> Self {
        Self {
            loss_rate,
            ..Default::default()
        }
    }

    pub fn duplicating(duplicate_rate: f64) -> Self {
        Self {
            duplicate_rate,
            ..Default::default()
        }
    }

    pub fn drop_first_copy() -> Self {
        Self {
            drop_first_copy: true,
            ..Default::default()
        }
    }
}

/// One end of an in-memory datagram link
pub struct MemoryTransport {
    tx: Option<UnboundedSender<Bytes>>,
    rx: UnboundedReceiver<Bytes>,
    faults: LinkFaults,
    random: random::Default,
    transmitted: HashSet<Bytes>,
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("faults", &self.faults)
            .field("open", &self.tx.is_some())
            .finish()
    }
}

impl MemoryTransport {
    /// Creates two connected endpoints. `a_faults` applies to datagrams sent
    /// by the first endpoint, `b_faults` to those sent by the second.
    pub fn pair(a_faults: LinkFaults, b_faults: LinkFaults) -> (Self, Self) {
        let (a_tx, b_rx) = unbounded_channel();
        let (b_tx, a_rx) = unbounded_channel();
        (
            Self::new(a_tx, a_rx, a_faults),
            Self::new(b_tx, b_rx, b_faults),
        )
    }

    /// Two endpoints joined by a link that never loses or duplicates
    pub fn lossless() -> (Self, Self) {
        Self::pair(LinkFaults::default(), LinkFaults::default())
    }

    fn new(tx: UnboundedSender<Bytes>, rx: UnboundedReceiver<Bytes>, faults: LinkFaults) -> Self {
        let random = random::default(faults.seed);
        MemoryTransport {
            tx: Some(tx),
            rx,
            faults,
            random,
            transmitted: HashSet::new(),
        }
    }

    fn roll(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.random.read_f64() < rate
    }

    /// How many copies of `datagram` the link delivers
    fn copies(&mut self, datagram: &Bytes) -> usize {
        if self.faults.drop_first_copy && self.transmitted.insert(datagram.clone()) {
            return 0;
        }
        if self.roll(self.faults.loss_rate) {
            return 0;
        }
        if self.roll(self.faults.duplicate_rate) {
            return 2;
        }
        1
    }
}

#[async_trait]
impl Socket for MemoryTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<usize> {
        let datagram = Bytes::copy_from_slice(datagram);
        let copies = self.copies(&datagram);
        let tx = self.tx.as_ref().ok_or(StopWaitError::Closed)?;

        if copies == 0 {
            tracing::trace!("Link dropped {} bytes", datagram.len());
        }
        for _ in 0..copies {
            // The peer hanging up looks like loss from this side
            let _result = tx.send(datagram.clone());
        }
        Ok(datagram.len())
    }

    async fn recv(&mut self, max_bytes: usize, timeout: Duration) -> Received {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(datagram)) if datagram.len() > max_bytes => {
                Received::Datagram(datagram.slice(..max_bytes))
            }
            Ok(Some(datagram)) => Received::Datagram(datagram),
            Ok(None) => {
                // Peer is gone; wait out the timeout so callers do not spin
                tokio::time::sleep(timeout).await;
                Received::Fault(io::ErrorKind::BrokenPipe.into())
            }
            Err(_elapsed) => Received::Timeout,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(_tx) => {
                self.rx.close();
                Ok(())
            }
            None => Err(StopWaitError::Closed),
        }
    }
}
