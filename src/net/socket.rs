use std::{io, net::SocketAddr, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{
    net::{lookup_host, ToSocketAddrs, UdpSocket},
    time::Instant,
};

use crate::error::{Result, StopWaitError};

/// Outcome of a single timed receive on a [`Socket`]
#[derive(Debug)]
pub enum Received {
    /// One datagram, truncated to the requested maximum
    Datagram(Bytes),
    /// Nothing arrived before the timeout elapsed
    Timeout,
    /// The transport failed. Channels treat this exactly like [`Received::Timeout`];
    /// it is kept separate so the failure can be logged and counted.
    Fault(io::Error),
}

/// An unreliable datagram transport paired with a single remote endpoint.
///
/// Datagrams may be dropped, duplicated or reordered. Receive errors are not
/// propagated, they are reported as [`Received::Fault`].
#[async_trait]
pub trait Socket: Send {
    /// Best effort send of one datagram, returning the number of bytes handed to the transport
    async fn send(&mut self, datagram: &[u8]) -> Result<usize>;

    /// Wait up to `timeout` for one datagram of at most `max_bytes`
    async fn recv(&mut self, max_bytes: usize, timeout: Duration) -> Received;

    /// Release the transport. Later sends fail with [`StopWaitError::Closed`].
    async fn close(&mut self) -> Result<()>;
}

/// [`Socket`] over a tokio UDP socket with a fixed remote address.
///
/// Datagrams from any other address are discarded.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    remote: SocketAddr,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Binds `local` and resolves `remote` to its first address
    pub async fn bind(local: impl ToSocketAddrs, remote: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(local).await?;
        let remote = lookup_host(remote).await?.next().ok_or_else(|| {
            StopWaitError::BadConfig("remote address did not resolve".to_string())
        })?;
        Ok(Self::new(socket, remote))
    }

    pub fn new(socket: UdpSocket, remote: SocketAddr) -> Self {
        UdpTransport {
            socket: Some(socket),
            remote,
            buf: Vec::new(),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        let socket = self.socket.as_ref().ok_or(StopWaitError::Closed)?;
        Ok(socket.local_addr()?)
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote
    }
}

#[async_trait]
impl Socket for UdpTransport {
    async fn send(&mut self, datagram: &[u8]) -> Result<usize> {
        let socket = self.socket.as_ref().ok_or(StopWaitError::Closed)?;
        Ok(socket.send_to(datagram, self.remote).await?)
    }

    async fn recv(&mut self, max_bytes: usize, timeout: Duration) -> Received {
        let Some(socket) = self.socket.as_ref() else {
            tokio::time::sleep(timeout).await;
            return Received::Fault(io::ErrorKind::NotConnected.into());
        };

        if self.buf.len() < max_bytes {
            self.buf.resize(max_bytes, 0);
        }

        let deadline = Instant::now() + timeout;
        loop {
            let received =
                tokio::time::timeout_at(deadline, socket.recv_from(&mut self.buf[..max_bytes]))
                    .await;
            match received {
                Ok(Ok((len, addr))) if addr != self.remote => {
                    tracing::trace!("Dropped {len} bytes from unexpected address {addr}");
                }
                Ok(Ok((len, addr))) => {
                    tracing::trace!("Received {len} bytes from {addr}");
                    return Received::Datagram(Bytes::copy_from_slice(&self.buf[..len]));
                }
                Ok(Err(e)) => return Received::Fault(e),
                Err(_elapsed) => return Received::Timeout,
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self.socket.take() {
            Some(_socket) => Ok(()),
            None => Err(StopWaitError::Closed),
        }
    }
}
