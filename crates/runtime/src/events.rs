// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process event bus.
//!
//! One-way publication: sessions hold the publisher, observers hold plain
//! `mpsc` receivers. Delivery is best-effort per subscriber — a token
//! bucket caps the rate and a bounded channel absorbs bursts; a subscriber
//! that cannot keep up loses events, never the publisher. Events that are
//! delivered preserve publish order. Heartbeats fire when the bus has been
//! idle for the configured interval.

use fm_core::{Clock, Event, SystemClock};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Per-subscriber delivery limits.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Token refill rate per subscriber.
    pub rate_per_sec: f64,
    /// Token bucket capacity (burst size).
    pub burst: f64,
    /// Bounded channel depth per subscriber.
    pub buffer: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self { rate_per_sec: 15.0, burst: 8.0, buffer: 256 }
    }
}

struct TokenBucket {
    tokens: f64,
    last_refill: f64,
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    fn new(rate: f64, capacity: f64, now: f64) -> Self {
        Self { tokens: capacity, last_refill: now, rate, capacity }
    }

    fn allow(&mut self, now: f64) -> bool {
        let delta = (now - self.last_refill).max(0.0);
        self.last_refill = now;
        self.tokens = (self.tokens + delta * self.rate).min(self.capacity);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

struct Subscriber {
    tx: mpsc::Sender<Event>,
    bucket: TokenBucket,
    min_depth: u32,
    max_depth: u32,
}

struct Inner {
    subscribers: Vec<Subscriber>,
    last_publish: f64,
    dropped: u64,
}

/// Topic bus for status/line/dialogue/decision/heartbeat events.
pub struct EventPublisher<C: Clock = SystemClock> {
    clock: C,
    config: PublisherConfig,
    inner: Mutex<Inner>,
}

impl<C: Clock> EventPublisher<C> {
    pub fn new(clock: C, config: PublisherConfig) -> Self {
        let now = clock.epoch_secs();
        Self {
            clock,
            config,
            inner: Mutex::new(Inner { subscribers: Vec::new(), last_publish: now, dropped: 0 }),
        }
    }

    /// Subscribe to events at orchestration depths `min_depth..=max_depth`.
    pub fn subscribe(&self, min_depth: u32, max_depth: u32) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(self.config.buffer);
        let now = self.clock.epoch_secs();
        self.inner.lock().subscribers.push(Subscriber {
            tx,
            bucket: TokenBucket::new(self.config.rate_per_sec, self.config.burst, now),
            min_depth,
            max_depth,
        });
        rx
    }

    /// Subscribe with the depth filter wide open.
    pub fn subscribe_all(&self) -> mpsc::Receiver<Event> {
        self.subscribe(0, u32::MAX)
    }

    /// Publish at depth 0 (top-level workers).
    pub fn publish(&self, event: Event) {
        self.publish_at(0, event);
    }

    /// Publish an event produced at the given orchestration depth.
    pub fn publish_at(&self, depth: u32, event: Event) {
        let now = self.clock.epoch_secs();
        let mut inner = self.inner.lock();
        inner.last_publish = now;

        let mut dropped = 0u64;
        inner.subscribers.retain_mut(|sub| {
            if depth < sub.min_depth || depth > sub.max_depth {
                return true;
            }
            if !sub.bucket.allow(now) {
                dropped += 1;
                return true;
            }
            match sub.tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    dropped += 1;
                    true
                }
                // Receiver gone: forget the subscriber.
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        if dropped > 0 {
            inner.dropped += dropped;
            debug!(topic = event.topic(), dropped, "subscribers lagging, events dropped");
        }
    }

    /// Total events dropped across all subscribers.
    pub fn dropped(&self) -> u64 {
        self.inner.lock().dropped
    }

    /// Number of live subscribers (lagging receivers are pruned on publish).
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    /// Seconds since the last publish.
    fn idle_for(&self) -> f64 {
        self.clock.epoch_secs() - self.inner.lock().last_publish
    }
}

/// Emit heartbeats whenever the bus has been idle for `interval`.
///
/// Runs until `cancel` fires.
pub fn spawn_heartbeat<C: Clock>(
    publisher: Arc<EventPublisher<C>>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {
                    if publisher.idle_for() >= interval.as_secs_f64() {
                        let timestamp = publisher.clock.epoch_secs();
                        publisher.publish(Event::Heartbeat { timestamp });
                    }
                }
            }
        }
    })
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
