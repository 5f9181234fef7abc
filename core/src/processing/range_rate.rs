use crate::math::StatsHelper;
use crate::prelude::ConfigError;
use crate::protocol::{TargetTrack, TargetTrackData};
use crate::telemetry::LogManager;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// How consecutive raw estimates are combined into the published value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// Mean of the last `smoothing` raw estimates of the track.
    #[default]
    MovingAverage,
    /// Publish the raw estimate unchanged. Matches the historical output,
    /// which averaged `smoothing` copies of the same value.
    Passthrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Samples inspected on each side of the evaluated index.
    pub detection_window: usize,
    /// Number of cycles averaged by the smoothing step.
    pub smoothing: usize,
    pub smoothing_mode: SmoothingMode,
    /// Retained (timestamp, range) samples per track.
    pub max_history: usize,
    /// Pairs closer together than this are ignored.
    pub min_dt_s: f64,
    /// A track without detections for this long reports as stale.
    pub stale_after_s: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            detection_window: 5,
            smoothing: 3,
            smoothing_mode: SmoothingMode::MovingAverage,
            max_history: 100,
            min_dt_s: 1e-3,
            stale_after_s: 2.0,
        }
    }
}

impl EstimatorConfig {
    pub fn window(&self) -> usize {
        self.detection_window.max(1)
    }

    pub fn smoothing_len(&self) -> usize {
        self.smoothing.max(1)
    }

    pub fn history_len(&self) -> usize {
        self.max_history.max(2)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_dt_s.is_finite() || self.min_dt_s < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "min_dt_s",
                value: self.min_dt_s,
            });
        }
        if !self.stale_after_s.is_finite() || self.stale_after_s <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "stale_after_s",
                value: self.stale_after_s,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackHistoryEntry {
    pub timestamp_s: f64,
    pub range_m: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    New,
    Active,
    Stale,
}

/// Bounded sample history of one producer track id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackHistory {
    pub target_id: u32,
    pub first_seen_s: f64,
    pub last_seen_s: f64,
    pub detections: u64,
    pub samples: VecDeque<TrackHistoryEntry>,
    #[serde(skip)]
    recent_estimates: VecDeque<f64>,
    pub range_rate_mps: f64,
}

impl TrackHistory {
    fn new(target_id: u32, now_s: f64) -> Self {
        Self {
            target_id,
            first_seen_s: now_s,
            last_seen_s: now_s,
            detections: 0,
            samples: VecDeque::new(),
            recent_estimates: VecDeque::new(),
            range_rate_mps: 0.0,
        }
    }

    fn push(&mut self, entry: TrackHistoryEntry, capacity: usize) {
        self.samples.push_back(entry);
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
        self.last_seen_s = entry.timestamp_s;
        self.detections += 1;
    }

    /// Mean closing speed over the pairs within `window` samples of `index`.
    /// Positive while range decreases. `None` when no pair is usable.
    pub fn range_rate_at(&self, index: usize, window: usize, min_dt_s: f64) -> Option<f64> {
        if index >= self.samples.len() {
            return None;
        }
        let window = window.max(1);
        let start = index.saturating_sub(window);
        let end = (index + window).min(self.samples.len() - 1);

        let rates: Vec<f64> = (start + 1..=end)
            .filter_map(|k| {
                let prev = self.samples[k - 1];
                let cur = self.samples[k];
                let dt = cur.timestamp_s - prev.timestamp_s;
                (dt > min_dt_s).then(|| -(cur.range_m - prev.range_m) / dt)
            })
            .collect();
        StatsHelper::mean(&rates)
    }

    pub fn state(&self, now_s: f64, stale_after_s: f64) -> TrackState {
        if now_s - self.last_seen_s > stale_after_s {
            TrackState::Stale
        } else if self.detections <= 1 {
            TrackState::New
        } else {
            TrackState::Active
        }
    }
}

/// Range-rate result for one detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeRate {
    pub target_id: u32,
    /// Smoothed value, positive when approaching.
    pub range_rate_mps: f64,
    /// Unsmoothed estimate of this cycle.
    pub raw_mps: f64,
    /// False when the producer's radial speed was used instead of history.
    pub from_history: bool,
}

/// Per-track sliding history and range-rate estimation.
pub struct RangeRateEstimator {
    config: EstimatorConfig,
    tracks: HashMap<u32, TrackHistory>,
    logger: LogManager,
}

impl RangeRateEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        let logger = LogManager::new("range-rate");
        if config.detection_window == 0 || config.smoothing == 0 {
            logger.detail("degenerate window or smoothing size, using 1");
        }
        Self {
            config,
            tracks: HashMap::new(),
            logger,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Applies new settings; retained estimates beyond the new smoothing length are dropped.
    pub fn set_config(&mut self, config: EstimatorConfig) {
        self.config = config;
        let history = config.history_len();
        let smoothing = config.smoothing_len();
        for track in self.tracks.values_mut() {
            while track.samples.len() > history {
                track.samples.pop_front();
            }
            while track.recent_estimates.len() > smoothing {
                track.recent_estimates.pop_front();
            }
        }
    }

    /// Records every detection of one cycle and returns their range-rates in packet order.
    pub fn update(&mut self, data: &TargetTrackData, now_s: f64) -> Vec<RangeRate> {
        data.targets
            .iter()
            .map(|target| self.observe(target, now_s))
            .collect()
    }

    pub fn observe(&mut self, target: &TargetTrack, now_s: f64) -> RangeRate {
        let config = self.config;
        let track = self.tracks.entry(target.target_id).or_insert_with(|| {
            self.logger
                .detail(&format!("new track {}", target.target_id));
            TrackHistory::new(target.target_id, now_s)
        });

        track.push(
            TrackHistoryEntry {
                timestamp_s: now_s,
                range_m: target.radius_m as f64,
            },
            config.history_len(),
        );

        let newest = track.samples.len() - 1;
        let estimate = track.range_rate_at(newest, config.window(), config.min_dt_s);
        let raw = estimate.unwrap_or(target.radial_speed_mps as f64);

        let smoothed = match config.smoothing_mode {
            SmoothingMode::MovingAverage => {
                track.recent_estimates.push_back(raw);
                while track.recent_estimates.len() > config.smoothing_len() {
                    track.recent_estimates.pop_front();
                }
                StatsHelper::mean(&track.recent_estimates).unwrap_or(raw)
            }
            SmoothingMode::Passthrough => raw,
        };
        track.range_rate_mps = smoothed;

        RangeRate {
            target_id: target.target_id,
            range_rate_mps: smoothed,
            raw_mps: raw,
            from_history: estimate.is_some(),
        }
    }

    pub fn range_rate(&self, target_id: u32) -> Option<f64> {
        self.tracks.get(&target_id).map(|t| t.range_rate_mps)
    }

    pub fn track_state(&self, target_id: u32, now_s: f64) -> Option<TrackState> {
        self.tracks
            .get(&target_id)
            .map(|t| t.state(now_s, self.config.stale_after_s))
    }

    /// Read-only copy of one track's history.
    pub fn snapshot(&self, target_id: u32) -> Option<TrackHistory> {
        self.tracks.get(&target_id).cloned()
    }

    /// Read-only copies of every track, ordered by id.
    pub fn tracks(&self) -> Vec<TrackHistory> {
        let mut tracks: Vec<TrackHistory> = self.tracks.values().cloned().collect();
        tracks.sort_unstable_by_key(|t| t.target_id);
        tracks
    }

    pub fn track_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.tracks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Drops tracks that have gone stale. Never invoked implicitly.
    pub fn evict_stale(&mut self, now_s: f64) -> usize {
        let stale_after = self.config.stale_after_s;
        let before = self.tracks.len();
        self.tracks
            .retain(|_, track| track.state(now_s, stale_after) != TrackState::Stale);
        let evicted = before - self.tracks.len();
        if evicted > 0 {
            self.logger.record(&format!("evicted {} stale tracks", evicted));
        }
        evicted
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}
