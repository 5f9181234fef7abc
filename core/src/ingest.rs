//! Boundary between the socket side and the processing core.
//!
//! One producer pushes raw datagrams, one consumer drains them each tick.
//! When full, the oldest pending datagram is discarded so the core always
//! sees the freshest spectral and track state.

use crate::prelude::DropReason;
use crate::telemetry::{LogManager, PacketCounters};
use crossbeam::queue::ArrayQueue;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A received datagram and the wall-clock time it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Datagram {
    pub received_at_s: f64,
    pub payload: Vec<u8>,
}

impl Datagram {
    pub fn new(received_at_s: f64, payload: Vec<u8>) -> Self {
        Self {
            received_at_s,
            payload,
        }
    }

    pub fn now(payload: Vec<u8>) -> Self {
        Self::new(unix_time_s(), payload)
    }
}

/// Seconds since the Unix epoch.
pub fn unix_time_s() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

pub struct DatagramQueue {
    queue: ArrayQueue<Datagram>,
    counters: Arc<PacketCounters>,
    logger: LogManager,
}

impl DatagramQueue {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, counters: Arc<PacketCounters>) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            counters,
            logger: LogManager::new("ingest"),
        }
    }

    /// Enqueues `datagram`, evicting the oldest pending one when full.
    /// Returns `true` when an eviction happened.
    pub fn push(&self, datagram: Datagram) -> bool {
        match self.queue.force_push(datagram) {
            Some(evicted) => {
                self.counters.record_drop(DropReason::Overflow);
                self.logger.warn(&format!(
                    "queue full ({}), dropped datagram received at {:.3}",
                    self.queue.capacity(),
                    evicted.received_at_s
                ));
                true
            }
            None => false,
        }
    }

    pub fn pop(&self) -> Option<Datagram> {
        self.queue.pop()
    }

    /// Removes everything pending at the time of the call, oldest first.
    pub fn drain(&self) -> Vec<Datagram> {
        let pending = self.queue.len();
        (0..pending).map_while(|_| self.queue.pop()).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
