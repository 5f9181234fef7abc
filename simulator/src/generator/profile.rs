use crate::generator::template::beat_tone;
use anyhow::Context;
use fmcwcore::protocol::{
    encode_raw_adc, encode_targets, format_legacy_adc, format_legacy_targets, DataFormat,
    RawAdcFrame, TargetTrack, TargetTrackData,
};
use fmcwcore::RadarParameters;
use num_complex::Complex32;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Shape of the synthetic front-end stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub samples_per_chirp: usize,
    pub num_chirps: usize,
    /// Range of the reflector encoded in the beat tone.
    pub tone_range_m: f64,
    pub noise: f32,
    pub seed: u64,
    pub targets: usize,
    /// Closing speed shared by every synthetic target.
    pub target_speed_mps: f32,
    pub max_range_m: f32,
    pub frame_interval_ms: u64,
    /// Emit the ASCII layout instead of binary packets.
    pub legacy_text: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            samples_per_chirp: 256,
            num_chirps: 1,
            tone_range_m: 12.0,
            noise: 0.05,
            seed: 0,
            targets: 3,
            target_speed_mps: 1.5,
            max_range_m: 60.0,
            frame_interval_ms: 100,
            legacy_text: false,
        }
    }
}

impl GeneratorConfig {
    fn normalized_samples(&self) -> usize {
        self.samples_per_chirp.max(1)
    }

    fn normalized_chirps(&self) -> usize {
        self.num_chirps.max(1)
    }

    pub fn frame_interval_s(&self) -> f64 {
        self.frame_interval_ms.max(1) as f64 / 1000.0
    }
}

/// Seeded source of raw-ADC frames and target reports.
pub struct SyntheticSource {
    config: GeneratorConfig,
    radar: RadarParameters,
    rng: StdRng,
    frame_number: u32,
    tracks: Vec<TargetTrack>,
    last_time_s: Option<f64>,
}

impl SyntheticSource {
    pub fn new(config: GeneratorConfig, radar: RadarParameters) -> Self {
        let tracks = (0..config.targets)
            .map(|i| {
                let mut track = TargetTrack::new(i as u32 + 1, 10.0 + 15.0 * i as f32);
                track.level_db = -20.0 - 3.0 * i as f32;
                track.azimuth_deg = -30.0 + 20.0 * i as f32;
                track.radial_speed_mps = config.target_speed_mps;
                track
            })
            .collect();
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            radar,
            frame_number: 0,
            tracks,
            last_time_s: None,
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn jitter(&mut self) -> f32 {
        if self.config.noise > 0.0 {
            self.rng.gen_range(-self.config.noise..self.config.noise)
        } else {
            0.0
        }
    }

    /// Beat frequency of the configured reflector as a fraction of the sample rate.
    fn tone_cycles_per_sample(&self) -> f32 {
        let range_per_hz = self.radar.range_per_hz();
        if range_per_hz <= 0.0 || self.radar.sample_rate_hz <= 0.0 {
            return 0.0;
        }
        (self.config.tone_range_m / range_per_hz / self.radar.sample_rate_hz) as f32
    }

    pub fn next_frame(&mut self) -> RawAdcFrame {
        let samples = self.config.normalized_samples();
        let chirps = self.config.normalized_chirps();
        let cycles = self.tone_cycles_per_sample();

        let mut values = Vec::with_capacity(samples * chirps * 2);
        for chirp in 0..chirps {
            for s in beat_tone(samples, cycles, 0.3 * chirp as f32) {
                let noisy = s + Complex32::new(self.jitter(), self.jitter());
                values.push(noisy.re);
                values.push(noisy.im);
            }
        }

        self.frame_number = self.frame_number.wrapping_add(1);
        RawAdcFrame {
            frame_number: self.frame_number,
            num_chirps: chirps as u32,
            num_rx_antennas: 1,
            num_samples_per_chirp: samples as u32,
            rx_mask: 0x01,
            adc_resolution: 12,
            interleaved_rx: false,
            data_format: DataFormat::ComplexFloat,
            samples: values,
        }
    }

    /// Advances every target to `now_s` and reports the new positions.
    pub fn next_targets(&mut self, now_s: f64) -> TargetTrackData {
        let dt = self
            .last_time_s
            .map(|last| (now_s - last).max(0.0) as f32)
            .unwrap_or(0.0);
        self.last_time_s = Some(now_s);

        let max_range = self.config.max_range_m;
        for track in &mut self.tracks {
            track.radius_m -= track.radial_speed_mps * dt;
            if track.radius_m < 1.0 {
                track.radius_m = max_range;
            }
        }
        TargetTrackData::new(self.tracks.clone())
    }

    /// Encoded datagrams for one frame interval ending at `now_s`.
    pub fn next_datagrams(&mut self, now_s: f64) -> anyhow::Result<Vec<Vec<u8>>> {
        let frame = self.next_frame();
        let targets = self.next_targets(now_s);

        if self.config.legacy_text {
            return Ok(vec![
                format_legacy_adc(&frame.complex_samples()).into_bytes(),
                format_legacy_targets(&targets).into_bytes(),
            ]);
        }

        let target_packet = encode_targets(&targets).context("encoding synthetic targets")?;
        Ok(vec![encode_raw_adc(&frame), target_packet])
    }
}
