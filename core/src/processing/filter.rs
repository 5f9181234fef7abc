use crate::protocol::{TargetTrack, TargetTrackData};
use serde::{Deserialize, Serialize};

/// Min/max gates on reported detections; each gate has its own enable flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingThresholds {
    pub range_filter: bool,
    pub range_min_m: f32,
    pub range_max_m: f32,
    pub speed_filter: bool,
    pub speed_min_mps: f32,
    pub speed_max_mps: f32,
    pub azimuth_filter: bool,
    pub azimuth_min_deg: f32,
    pub azimuth_max_deg: f32,
    pub elevation_filter: bool,
    pub elevation_min_deg: f32,
    pub elevation_max_deg: f32,
}

impl Default for ProcessingThresholds {
    fn default() -> Self {
        Self {
            range_filter: false,
            range_min_m: 0.0,
            range_max_m: 100.0,
            speed_filter: false,
            speed_min_mps: -50.0,
            speed_max_mps: 50.0,
            azimuth_filter: false,
            azimuth_min_deg: -90.0,
            azimuth_max_deg: 90.0,
            elevation_filter: false,
            elevation_min_deg: -90.0,
            elevation_max_deg: 90.0,
        }
    }
}

fn within(enabled: bool, value: f32, min: f32, max: f32) -> bool {
    !enabled || (value >= min && value <= max)
}

impl ProcessingThresholds {
    pub fn any_enabled(&self) -> bool {
        self.range_filter || self.speed_filter || self.azimuth_filter || self.elevation_filter
    }

    pub fn accepts(&self, target: &TargetTrack) -> bool {
        within(self.range_filter, target.radius_m, self.range_min_m, self.range_max_m)
            && within(
                self.speed_filter,
                target.radial_speed_mps,
                self.speed_min_mps,
                self.speed_max_mps,
            )
            && within(
                self.azimuth_filter,
                target.azimuth_deg,
                self.azimuth_min_deg,
                self.azimuth_max_deg,
            )
            && within(
                self.elevation_filter,
                target.elevation_deg,
                self.elevation_min_deg,
                self.elevation_max_deg,
            )
    }

    /// Accepted detections in their original order.
    pub fn apply(&self, data: &TargetTrackData) -> TargetTrackData {
        if !self.any_enabled() {
            return data.clone();
        }
        TargetTrackData::new(
            data.targets
                .iter()
                .filter(|target| self.accepts(target))
                .copied()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_gates_accept_everything() {
        let thresholds = ProcessingThresholds::default();
        let data = TargetTrackData::new(vec![TargetTrack::new(1, 5000.0)]);
        assert_eq!(thresholds.apply(&data), data);
    }

    #[test]
    fn range_gate_keeps_order_of_survivors() {
        let thresholds = ProcessingThresholds {
            range_filter: true,
            range_min_m: 1.0,
            range_max_m: 50.0,
            ..Default::default()
        };
        let data = TargetTrackData::new(vec![
            TargetTrack::new(1, 0.5),
            TargetTrack::new(2, 20.0),
            TargetTrack::new(3, 70.0),
            TargetTrack::new(4, 50.0),
        ]);
        let ids: Vec<u32> = thresholds
            .apply(&data)
            .targets
            .iter()
            .map(|t| t.target_id)
            .collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn speed_and_angle_gates_combine() {
        let thresholds = ProcessingThresholds {
            speed_filter: true,
            speed_min_mps: 0.0,
            speed_max_mps: 10.0,
            azimuth_filter: true,
            azimuth_min_deg: -30.0,
            azimuth_max_deg: 30.0,
            ..Default::default()
        };
        let mut target = TargetTrack::new(1, 10.0);
        target.radial_speed_mps = 5.0;
        target.azimuth_deg = 10.0;
        assert!(thresholds.accepts(&target));
        target.azimuth_deg = 45.0;
        assert!(!thresholds.accepts(&target));
        target.azimuth_deg = 0.0;
        target.radial_speed_mps = -1.0;
        assert!(!thresholds.accepts(&target));
    }
}
