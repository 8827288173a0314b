//! Pinger against fake game servers

mod common;

use std::time::{Duration, Instant};

use bytes::Bytes;
use common::{FakeGameServer, FakeState};
use extinfo_relay::pinger::{Pinger, PingerConfig};

async fn pinger() -> Pinger {
    common::init_tracing();
    Pinger::bind(PingerConfig::with_addr("127.0.0.1:0".parse().unwrap()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_no_responder_closes_with_zero_items() {
    let pinger = pinger().await;
    let fake = FakeGameServer::start(FakeState {
        silent: true,
        ..Default::default()
    })
    .await;

    let started = Instant::now();
    let mut response = pinger
        .send(&fake.host, fake.port, Bytes::from_static(&[1]), Duration::from_millis(300))
        .await
        .unwrap();

    let mut items = 0;
    while tokio::time::timeout(Duration::from_secs(3), response.recv())
        .await
        .unwrap()
        .is_some()
    {
        items += 1;
    }

    assert_eq!(items, 0);
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_multi_packet_response() {
    let pinger = pinger().await;
    let fake = FakeGameServer::start(FakeState::default()).await;

    let mut response = pinger
        .send(&fake.host, fake.port, Bytes::from_static(&[0, 1, 0xff]), Duration::from_secs(2))
        .await
        .unwrap();

    // client number list plus one stats packet per client
    let mut packets = 0;
    while packets < 4 {
        let packet = response.recv().await.unwrap();
        assert!(packet.starts_with(&[0, 1, 0xff]));
        packets += 1;
    }
    response.cancel();
    assert_eq!(response.recv().await, None);
}

#[tokio::test]
async fn test_concurrent_requests_to_different_servers() {
    let pinger = pinger().await;
    let first = FakeGameServer::start(FakeState {
        map: "first".into(),
        ..Default::default()
    })
    .await;
    let second = FakeGameServer::start(FakeState {
        map: "second".into(),
        ..Default::default()
    })
    .await;

    let timeout = Duration::from_secs(2);
    let mut a = pinger
        .send(&first.host, first.port, Bytes::from_static(&[1]), timeout)
        .await
        .unwrap();
    let mut b = pinger
        .send(&second.host, second.port, Bytes::from_static(&[1]), timeout)
        .await
        .unwrap();

    let from_a = a.recv().await.unwrap();
    let from_b = b.recv().await.unwrap();

    assert!(from_a.windows(5).any(|w| w == b"first"));
    assert!(from_b.windows(6).any(|w| w == b"second"));
    assert_ne!(a.peer_addr(), b.peer_addr());
}

#[tokio::test]
async fn test_dropping_pinger_ends_pending_responses() {
    let pinger = pinger().await;
    let fake = FakeGameServer::start(FakeState {
        silent: true,
        ..Default::default()
    })
    .await;

    let mut response = pinger
        .send(&fake.host, fake.port, Bytes::from_static(&[1]), Duration::from_secs(30))
        .await
        .unwrap();
    drop(pinger);

    let ended = tokio::time::timeout(Duration::from_secs(2), response.recv()).await;
    assert_eq!(ended.unwrap(), None);
}
