use anyhow::Context;
use std::net::{Ipv4Addr, SocketAddr};
use stopwait::{Channel, ChannelConfig, UdpTransport};
use tokio::net::UdpSocket;
use tracing_subscriber::EnvFilter;

const ROUNDS: usize = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let localhost = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    let ping_socket = UdpSocket::bind(localhost).await?;
    let pong_socket = UdpSocket::bind(localhost).await?;
    let ping_addr = ping_socket.local_addr()?;
    let pong_addr = pong_socket.local_addr()?;

    let mut ping = Channel::new(UdpTransport::new(ping_socket, pong_addr), ChannelConfig::default())?;
    let mut pong = Channel::new(UdpTransport::new(pong_socket, ping_addr), ChannelConfig::default())?;

    let server = tokio::spawn(async move {
        for _ in 0..ROUNDS {
            let len = pong.recv(8).await?;
            let len = u64::from_le_bytes(len[..].try_into()?) as usize;
            let body = pong.recv(len).await?;
            tracing::info!("Got {} bytes, echoing", body.len());
            pong.send(&body).await?;
        }
        pong.close().await?;
        anyhow::Ok(())
    });

    for round in 0..ROUNDS {
        let body = vec![round as u8; 25_000 * (round + 1)];
        ping.send(&(body.len() as u64).to_le_bytes()).await?;
        ping.send(&body).await?;

        let echo = ping.recv(body.len()).await?;
        anyhow::ensure!(echo[..] == body[..], "echo mismatch in round {round}");
        tracing::info!("Round {round}: {} bytes echoed, {:?}", echo.len(), ping.stats());
    }

    server.await.context("echo task panicked")??;
    ping.close().await?;
    Ok(())
}
