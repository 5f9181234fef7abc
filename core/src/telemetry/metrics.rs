use crate::prelude::DropReason;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Diagnostic packet counters shared between the receive side and the pipeline.
pub struct PacketCounters {
    inner: Mutex<CounterSnapshot>,
}

/// Point-in-time copy of the packet counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    pub received: u64,
    pub decoded_raw_adc: u64,
    pub decoded_targets: u64,
    pub dropped_truncated: u64,
    pub dropped_malformed: u64,
    pub dropped_unknown: u64,
    pub dropped_overflow: u64,
}

impl CounterSnapshot {
    pub fn dropped_total(&self) -> u64 {
        self.dropped_truncated + self.dropped_malformed + self.dropped_unknown + self.dropped_overflow
    }
}

impl PacketCounters {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CounterSnapshot::default()),
        }
    }

    pub fn record_received(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.received += 1;
        }
    }

    pub fn record_raw_adc(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.decoded_raw_adc += 1;
        }
    }

    pub fn record_targets(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.decoded_targets += 1;
        }
    }

    pub fn record_drop(&self, reason: DropReason) {
        if let Ok(mut counts) = self.inner.lock() {
            match reason {
                DropReason::Truncated => counts.dropped_truncated += 1,
                DropReason::Malformed => counts.dropped_malformed += 1,
                DropReason::Unknown => counts.dropped_unknown += 1,
                DropReason::Overflow => counts.dropped_overflow += 1,
            }
        }
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        if let Ok(counts) = self.inner.lock() {
            *counts
        } else {
            CounterSnapshot::default()
        }
    }

    pub fn reset(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            *counts = CounterSnapshot::default();
        }
    }
}

impl Default for PacketCounters {
    fn default() -> Self {
        Self::new()
    }
}
