// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::{FakeClock, WorkerId};

fn line(content: &str) -> Event {
    Event::Line { worker_id: WorkerId::new("worker_001"), content: content.to_string() }
}

fn publisher_with(clock: FakeClock, config: PublisherConfig) -> EventPublisher<FakeClock> {
    EventPublisher::new(clock, config)
}

#[tokio::test]
async fn delivers_events_in_publish_order() {
    let publisher = publisher_with(FakeClock::new(), PublisherConfig::default());
    let mut rx = publisher.subscribe_all();

    publisher.publish(line("one"));
    publisher.publish(line("two"));
    publisher.publish(line("three"));

    for expected in ["one", "two", "three"] {
        match rx.recv().await.unwrap() {
            Event::Line { content, .. } => assert_eq!(content, expected),
            other => panic!("unexpected event {other:?}"),
        }
    }
}

#[tokio::test]
async fn depth_filter_excludes_out_of_range_events() {
    let publisher = publisher_with(FakeClock::new(), PublisherConfig::default());
    let mut shallow = publisher.subscribe(0, 0);
    let mut deep = publisher.subscribe(1, 3);

    publisher.publish_at(0, line("top"));
    publisher.publish_at(2, line("nested"));

    match shallow.recv().await.unwrap() {
        Event::Line { content, .. } => assert_eq!(content, "top"),
        other => panic!("unexpected {other:?}"),
    }
    match deep.recv().await.unwrap() {
        Event::Line { content, .. } => assert_eq!(content, "nested"),
        other => panic!("unexpected {other:?}"),
    }
    // Neither saw the other's event.
    assert!(shallow.try_recv().is_err());
    assert!(deep.try_recv().is_err());
}

#[tokio::test]
async fn slow_subscriber_loses_events_not_the_publisher() {
    let clock = FakeClock::new();
    let publisher = publisher_with(
        clock.clone(),
        PublisherConfig { rate_per_sec: 1.0, burst: 2.0, buffer: 16 },
    );
    let mut rx = publisher.subscribe_all();

    // Burst of three with no time passing: bucket holds 2 tokens.
    publisher.publish(line("a"));
    publisher.publish(line("b"));
    publisher.publish(line("c"));

    assert_eq!(publisher.dropped(), 1);
    assert!(rx.recv().await.is_some());
    assert!(rx.recv().await.is_some());
    assert!(rx.try_recv().is_err());

    // After two seconds the bucket has refilled.
    clock.advance(std::time::Duration::from_secs(2));
    publisher.publish(line("d"));
    match rx.recv().await.unwrap() {
        Event::Line { content, .. } => assert_eq!(content, "d"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn closed_receiver_is_pruned() {
    let publisher = publisher_with(FakeClock::new(), PublisherConfig::default());
    let rx = publisher.subscribe_all();
    assert_eq!(publisher.subscriber_count(), 1);

    drop(rx);
    publisher.publish(line("into the void"));
    assert_eq!(publisher.subscriber_count(), 0);
}

#[tokio::test]
async fn heartbeat_fires_when_idle() {
    let publisher = Arc::new(EventPublisher::new(
        fm_core::SystemClock,
        PublisherConfig::default(),
    ));
    let mut rx = publisher.subscribe_all();
    let cancel = CancellationToken::new();
    let handle =
        spawn_heartbeat(publisher.clone(), Duration::from_millis(50), cancel.clone());

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
    assert!(matches!(event, Event::Heartbeat { .. }));

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn heartbeat_suppressed_while_busy() {
    let publisher = Arc::new(EventPublisher::new(
        fm_core::SystemClock,
        PublisherConfig::default(),
    ));
    let mut rx = publisher.subscribe_all();
    let cancel = CancellationToken::new();
    let handle =
        spawn_heartbeat(publisher.clone(), Duration::from_millis(100), cancel.clone());

    // Keep the bus busy for a while; no heartbeat should interleave.
    for _ in 0..6 {
        publisher.publish(line("busy"));
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    while let Ok(event) = rx.try_recv() {
        assert!(!matches!(event, Event::Heartbeat { .. }));
    }

    cancel.cancel();
    handle.await.unwrap();
}
