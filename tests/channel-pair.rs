use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use anyhow::Context;
use once_cell::sync::Lazy;
use quickcheck::{QuickCheck, TestResult};
use bytes::Bytes;
use stopwait::{
    Channel, ChannelConfig, LinkFaults, MemoryTransport, Mode, Packet, PacketId, Socket,
    StopWaitError, UdpTransport,
};
use tokio::{net::UdpSocket, task::JoinHandle, time::timeout};
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

const DEADLINE: Duration = Duration::from_secs(20);

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

fn spawn_send<S: Socket + 'static>(
    mut chan: Channel<S>,
    payload: Vec<u8>,
) -> JoinHandle<Result<(usize, Channel<S>), StopWaitError>> {
    tokio::spawn(async move {
        let sent = chan.send(&payload).await?;
        Ok((sent, chan))
    })
}

fn memory_pair(
    config: ChannelConfig,
    a_faults: LinkFaults,
    b_faults: LinkFaults,
) -> anyhow::Result<(Channel<MemoryTransport>, Channel<MemoryTransport>)> {
    let (a, b) = MemoryTransport::pair(a_faults, b_faults);
    Ok((
        Channel::new(a, config.clone())?,
        Channel::new(b, config)?,
    ))
}

async fn udp_pair(config: ChannelConfig) -> anyhow::Result<(Channel, Channel)> {
    let localhost = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    let a = UdpSocket::bind(localhost).await?;
    let b = UdpSocket::bind(localhost).await?;
    let (a_addr, b_addr) = (a.local_addr()?, b.local_addr()?);

    Ok((
        Channel::new(UdpTransport::new(a, b_addr), config.clone())?,
        Channel::new(UdpTransport::new(b, a_addr), config)?,
    ))
}

#[tokio::test]
async fn lossless_link_delivers_reference_payload() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (tx, mut rx) = memory_pair(
        ChannelConfig::default(),
        LinkFaults::default(),
        LinkFaults::default(),
    )?;
    let payload = pattern(150_000);

    let sender = spawn_send(tx, payload.clone());
    let received = timeout(DEADLINE, rx.recv(150_000)).await??;
    let (sent, tx) = timeout(DEADLINE, sender).await???;

    assert_eq!(sent, 150_000);
    assert_eq!(&received[..], &payload[..]);
    assert_eq!(tx.stats().data_sent, 3);
    assert_eq!(rx.stats().acks_sent, 3);
    Ok(())
}

#[tokio::test]
async fn first_transmission_loss_only_costs_latency() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (tx, mut rx) = memory_pair(
        ChannelConfig::new(1_000)?,
        LinkFaults::drop_first_copy(),
        LinkFaults::default(),
    )?;
    let payload = pattern(4_500);

    let sender = spawn_send(tx, payload.clone());
    let received = timeout(DEADLINE, rx.recv(payload.len())).await??;
    let (sent, tx) = timeout(DEADLINE, sender).await???;

    assert_eq!(sent, payload.len());
    assert_eq!(&received[..], &payload[..]);
    assert!(tx.stats().retransmissions >= 5);
    Ok(())
}

#[tokio::test]
async fn lossy_duplicating_link_still_delivers_in_order() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let faults = |seed| LinkFaults {
        duplicate_rate: 0.25,
        seed,
        ..LinkFaults::lossy(0.25)
    };
    let (tx, mut rx) = memory_pair(ChannelConfig::new(512)?, faults(3), faults(11))?;
    let payload = pattern(20_000);

    let sender = spawn_send(tx, payload.clone());
    let received = timeout(DEADLINE, rx.recv(payload.len()))
        .await
        .context("receiver stalled")??;

    assert_eq!(&received[..], &payload[..]);
    // The final ack may be lost with nobody left to answer a retransmission
    sender.abort();
    Ok(())
}

#[tokio::test]
async fn larger_peer_chunks_are_not_truncated() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (a, b) = MemoryTransport::lossless();
    let tx = Channel::new(a, ChannelConfig::new(1_000)?)?;
    let mut rx = Channel::new(b, ChannelConfig::new(100)?)?;
    let payload = pattern(2_500);

    let sender = spawn_send(tx, payload.clone());
    let received = timeout(DEADLINE, rx.recv(payload.len())).await??;
    let (sent, tx) = timeout(DEADLINE, sender).await???;

    assert_eq!(sent, payload.len());
    assert_eq!(&received[..], &payload[..]);
    assert_eq!(tx.stats().data_sent, 3);
    Ok(())
}

#[tokio::test]
async fn short_read_of_a_larger_chunk_is_an_overrun() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (a, b) = MemoryTransport::lossless();
    let tx = Channel::new(a, ChannelConfig::new(1_000)?)?;
    let mut rx = Channel::new(b, ChannelConfig::new(100)?)?;

    let sender = spawn_send(tx, pattern(1_000));
    let err = timeout(DEADLINE, rx.recv(100)).await?.unwrap_err();
    assert!(matches!(
        err,
        StopWaitError::LengthOverrun {
            expected: 100,
            received: 1_000
        }
    ));

    let (sent, _tx) = timeout(DEADLINE, sender).await???;
    assert_eq!(sent, 1_000);
    Ok(())
}

#[tokio::test]
async fn lost_final_ack_while_peer_replies() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    // Everything b sends, its ack included, is lost the first time
    let (mut a, mut b) = memory_pair(
        ChannelConfig::new(64)?,
        LinkFaults::default(),
        LinkFaults::drop_first_copy(),
    )?;
    let request = pattern(100);
    let reply = pattern(40);

    let responder = {
        let reply = reply.clone();
        tokio::spawn(async move {
            let request = b.recv(100).await?;
            b.send(&reply).await?;
            Ok::<_, StopWaitError>((request, b))
        })
    };

    assert_eq!(timeout(DEADLINE, a.send(&request)).await??, request.len());
    let received = timeout(DEADLINE, a.recv(reply.len())).await??;
    let (delivered, b) = timeout(DEADLINE, responder).await???;

    assert_eq!(&delivered[..], &request[..]);
    assert_eq!(&received[..], &reply[..]);
    assert_eq!(b.stats().data_sent, 1);
    assert!(b.stats().retransmissions >= 1);
    Ok(())
}

#[tokio::test]
async fn peers_swap_roles_between_calls() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (mut a, mut b) = memory_pair(
        ChannelConfig::new(8)?,
        LinkFaults::default(),
        LinkFaults::default(),
    )?;

    let responder = tokio::spawn(async move {
        for _ in 0..3 {
            let request = b.recv(12).await?;
            let mut reply = request.to_vec();
            reply.reverse();
            b.send(&reply).await?;
        }
        Ok::<_, StopWaitError>(b)
    });

    for round in 0..3u8 {
        let request = [round; 12];
        a.send(&request).await?;
        let reply = timeout(DEADLINE, a.recv(12)).await??;
        assert_eq!(&reply[..], &request[..]);
        assert_eq!(a.mode(), Mode::Receiving);
    }

    let b = timeout(DEADLINE, responder).await???;
    assert_eq!(b.stats().data_sent, 6);
    assert_eq!(a.next_id().0, 7);
    Ok(())
}

#[tokio::test]
async fn udp_loopback_delivers_reference_payload() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (tx, mut rx) = udp_pair(ChannelConfig::default()).await?;
    let payload = pattern(150_000);

    let sender = spawn_send(tx, payload.clone());
    let received = timeout(DEADLINE, rx.recv(payload.len())).await??;
    let (sent, tx) = timeout(DEADLINE, sender).await???;

    assert_eq!(sent, payload.len());
    assert_eq!(&received[..], &payload[..]);

    tx.close().await?;
    rx.close().await?;
    Ok(())
}

#[tokio::test]
async fn bind_resolves_the_remote_address() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let peer_socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    let peer_addr = peer_socket.local_addr()?;

    let mut chan = Channel::bind(ChannelConfig::new(64)?, (Ipv4Addr::LOCALHOST, 0), peer_addr).await?;
    let chan_addr = chan.socket().local_addr()?;
    assert_eq!(chan.socket().remote_addr(), peer_addr);

    let mut peer = Channel::new(UdpTransport::new(peer_socket, chan_addr), ChannelConfig::new(64)?)?;
    let sender = tokio::spawn(async move { peer.send(b"over udp").await });

    let received = timeout(DEADLINE, chan.recv(8)).await??;
    assert_eq!(&received[..], b"over udp");
    assert_eq!(timeout(DEADLINE, sender).await???, 8);
    Ok(())
}

#[tokio::test]
async fn datagrams_from_strangers_are_ignored() -> anyhow::Result<()> {
    Lazy::force(&TRACING);
    let (mut chan, mut peer) = udp_pair(ChannelConfig::new(64)?).await?;
    let chan_addr = chan.socket().local_addr()?;

    let stranger = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await?;
    stranger
        .send_to(&Packet::ack(PacketId(999)).encode()?, chan_addr)
        .await?;
    stranger
        .send_to(
            &Packet::data(PacketId(5), Bytes::from_static(b"spoof")).encode()?,
            chan_addr,
        )
        .await?;

    let receiver = tokio::spawn(async move { peer.recv(5).await });
    assert_eq!(timeout(DEADLINE, chan.send(b"hello")).await??, 5);
    assert_eq!(&timeout(DEADLINE, receiver).await???[..], b"hello");

    assert_eq!(chan.mode(), Mode::Sending);
    assert_eq!(chan.stats().role_switches, 0);
    Ok(())
}

#[test]
fn arbitrary_payloads_arrive_intact() {
    fn prop(payload: Vec<u8>) -> TestResult {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => return TestResult::error(e.to_string()),
        };

        let outcome = runtime.block_on(async move {
            let (tx, mut rx) = memory_pair(
                ChannelConfig::new(7)?,
                LinkFaults::default(),
                LinkFaults::default(),
            )?;
            let sender = spawn_send(tx, payload.clone());
            let received = timeout(DEADLINE, rx.recv(payload.len())).await??;
            let (sent, _tx) = sender.await??;
            anyhow::Ok(sent == payload.len() && received[..] == payload[..])
        });

        match outcome {
            Ok(passed) => TestResult::from_bool(passed),
            Err(e) => TestResult::error(e.to_string()),
        }
    }

    QuickCheck::new()
        .tests(30)
        .quickcheck(prop as fn(Vec<u8>) -> TestResult);
}
