use crate::math::{apply_hann, fft_in_place, padded_len, StatsHelper};
use crate::prelude::RadarParameters;
use crate::protocol::RawAdcFrame;
use crate::telemetry::LogManager;
use num_complex::{Complex32, Complex64};
use serde::{Deserialize, Serialize};

/// Display calibration offset added to every bin, dB.
pub const CALIBRATION_OFFSET_DB: f64 = 60.0;
/// Extra gain for the lowest quarter of the bins, dB. Empirical near-range
/// sensitivity compensation tuned against the reference display.
pub const NEAR_RANGE_BOOST_DB: f64 = 5.0;
/// Linear magnitude floor applied before taking the logarithm.
pub const MAGNITUDE_FLOOR: f64 = 1e-8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrumCalibration {
    pub offset_db: f64,
    pub near_range_boost_db: f64,
    pub magnitude_floor: f64,
}

impl Default for SpectrumCalibration {
    fn default() -> Self {
        Self {
            offset_db: CALIBRATION_OFFSET_DB,
            near_range_boost_db: NEAR_RANGE_BOOST_DB,
            magnitude_floor: MAGNITUDE_FLOOR,
        }
    }
}

/// Which samples of a raw-ADC frame feed the transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpectrumSource {
    /// Every sample of the frame in declared order.
    #[default]
    AllSamples,
    /// One chirp of one receive antenna.
    Chirp { chirp: usize, rx: usize },
}

impl SpectrumSource {
    pub fn select(&self, frame: &RawAdcFrame) -> Option<Vec<Complex32>> {
        match *self {
            SpectrumSource::AllSamples => Some(frame.complex_samples()),
            SpectrumSource::Chirp { chirp, rx } => frame.chirp_samples(chirp, rx),
        }
    }
}

/// Single-sided range spectrum; the three sequences always have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub magnitude_db: Vec<f64>,
    pub frequency_hz: Vec<f64>,
    pub range_m: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.magnitude_db.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude_db.is_empty()
    }

    pub fn peak_bin(&self) -> Option<usize> {
        self.magnitude_db
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx)
    }

    pub fn peak_range_m(&self) -> Option<f64> {
        self.peak_bin().map(|idx| self.range_m[idx])
    }
}

/// Windowed FFT range spectrum of `samples`. `None` when there are no samples.
pub fn compute_spectrum(
    samples: &[Complex32],
    params: &RadarParameters,
    calibration: &SpectrumCalibration,
) -> Option<Spectrum> {
    let valid = samples.len();
    if valid == 0 {
        return None;
    }

    let n = padded_len(valid);
    let mut buffer = vec![Complex64::new(0.0, 0.0); n];
    for (dst, src) in buffer.iter_mut().zip(samples) {
        *dst = Complex64::new(src.re as f64, src.im as f64);
    }

    apply_hann(&mut buffer, valid);
    fft_in_place(&mut buffer).ok()?;

    let half = n / 2;
    let boosted_bins = half / 4;
    let bin_hz = params.sample_rate_hz / n as f64;
    let range_per_hz = params.range_per_hz();

    let mut spectrum = Spectrum {
        magnitude_db: Vec::with_capacity(half),
        frequency_hz: Vec::with_capacity(half),
        range_m: Vec::with_capacity(half),
    };
    for (i, bin) in buffer[..half].iter().enumerate() {
        let linear = (bin.norm() / valid as f64).max(calibration.magnitude_floor);
        let mut db = 20.0 * linear.log10() + calibration.offset_db;
        if i < boosted_bins {
            db += calibration.near_range_boost_db;
        }
        let frequency = i as f64 * bin_hz;
        spectrum.magnitude_db.push(db);
        spectrum.frequency_hz.push(frequency);
        spectrum.range_m.push(frequency * range_per_hz);
    }
    Some(spectrum)
}

/// Holds the newest frame's samples and the spectrum derived from them.
pub struct SpectralAnalyzer {
    params: RadarParameters,
    calibration: SpectrumCalibration,
    source: SpectrumSource,
    samples: Vec<Complex32>,
    spectrum: Option<Spectrum>,
    logger: LogManager,
}

impl SpectralAnalyzer {
    pub fn new(
        params: RadarParameters,
        calibration: SpectrumCalibration,
        source: SpectrumSource,
    ) -> Self {
        Self {
            params,
            calibration,
            source,
            samples: Vec::new(),
            spectrum: None,
            logger: LogManager::new("spectrum"),
        }
    }

    /// Retains the frame's selected samples and recomputes. Returns `None`
    /// when the frame yields no samples, in which case the previous spectrum
    /// is left for the caller to clear.
    pub fn process_frame(&mut self, frame: &RawAdcFrame) -> Option<&Spectrum> {
        match self.source.select(frame) {
            Some(samples) => self.samples = samples,
            None => {
                self.logger.warn(&format!(
                    "frame {} has no data for {:?}",
                    frame.frame_number, self.source
                ));
                self.samples.clear();
            }
        }
        if self.recompute() {
            self.spectrum.as_ref()
        } else {
            None
        }
    }

    /// Recomputes on the new axes; a spectrum that cannot be recomputed is dropped.
    pub fn set_parameters(&mut self, params: RadarParameters) {
        self.params = params;
        if !self.recompute() {
            self.spectrum = None;
        }
    }

    pub fn set_calibration(&mut self, calibration: SpectrumCalibration) {
        self.calibration = calibration;
        if !self.recompute() {
            self.spectrum = None;
        }
    }

    pub fn set_source(&mut self, source: SpectrumSource) {
        self.source = source;
    }

    pub fn parameters(&self) -> &RadarParameters {
        &self.params
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.spectrum.as_ref()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.spectrum = None;
    }

    fn recompute(&mut self) -> bool {
        if self.samples.len() < 2 {
            self.logger.detail(&format!(
                "degenerate window: {} valid samples",
                self.samples.len()
            ));
        }
        if let Some(spectrum) = compute_spectrum(&self.samples, &self.params, &self.calibration) {
            if log::log_enabled!(log::Level::Debug) {
                let magnitudes: Vec<f64> = self.samples.iter().map(|s| s.norm() as f64).collect();
                self.logger.detail(&format!(
                    "{} samples, input RMS {:.4}, {} bins, peak {:?} m",
                    self.samples.len(),
                    StatsHelper::rms(&magnitudes),
                    spectrum.len(),
                    spectrum.peak_range_m()
                ));
            }
            self.spectrum = Some(spectrum);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RadarParameters {
        RadarParameters {
            sample_rate_hz: 1_000_000.0,
            sweep_time_s: 0.001,
            bandwidth_hz: 250_000_000.0,
            center_freq_hz: 24.0e9,
        }
    }

    fn tone(len: usize, bin: usize, n: usize) -> Vec<Complex32> {
        (0..len)
            .map(|k| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * k as f32 / n as f32;
                Complex32::new(phase.cos(), phase.sin())
            })
            .collect()
    }

    #[test]
    fn constant_input_peaks_at_dc() {
        let samples = vec![Complex32::new(1.0, 0.0); 32];
        let spectrum = compute_spectrum(&samples, &params(), &SpectrumCalibration::default()).unwrap();
        assert_eq!(spectrum.len(), 16);
        assert_eq!(spectrum.peak_bin(), Some(0));
    }

    #[test]
    fn output_length_is_half_the_padded_size() {
        for (m, expected) in [(2usize, 1usize), (3, 2), (32, 16), (33, 32), (100, 64)] {
            let samples = vec![Complex32::new(0.5, -0.5); m];
            let spectrum =
                compute_spectrum(&samples, &params(), &SpectrumCalibration::default()).unwrap();
            assert_eq!(spectrum.len(), expected, "M = {}", m);
            assert_eq!(spectrum.frequency_hz.len(), expected);
            assert_eq!(spectrum.range_m.len(), expected);
            assert_eq!(spectrum.frequency_hz[0], 0.0);
            assert!(spectrum.frequency_hz.windows(2).all(|w| w[1] > w[0]));
        }
    }

    #[test]
    fn frequency_and_range_follow_fmcw_relation() {
        let p = params();
        let samples = tone(64, 12, 64);
        let spectrum = compute_spectrum(&samples, &p, &SpectrumCalibration::default()).unwrap();
        assert_eq!(spectrum.peak_bin(), Some(12));
        let f = 12.0 * p.sample_rate_hz / 64.0;
        assert!((spectrum.frequency_hz[12] - f).abs() < 1e-9);
        let r = f * crate::prelude::SPEED_OF_LIGHT * p.sweep_time_s / (2.0 * p.bandwidth_hz);
        assert!((spectrum.range_m[12] - r).abs() < 1e-9);
    }

    #[test]
    fn near_range_bins_receive_boost() {
        let samples = vec![Complex32::new(0.0, 0.0); 64];
        let spectrum = compute_spectrum(&samples, &params(), &SpectrumCalibration::default()).unwrap();
        let floor_db = 20.0 * MAGNITUDE_FLOOR.log10() + CALIBRATION_OFFSET_DB;
        for i in 0..8 {
            assert!((spectrum.magnitude_db[i] - (floor_db + NEAR_RANGE_BOOST_DB)).abs() < 1e-9);
        }
        for i in 8..32 {
            assert!((spectrum.magnitude_db[i] - floor_db).abs() < 1e-9);
        }
    }

    #[test]
    fn degenerate_inputs_are_defined() {
        let cal = SpectrumCalibration::default();
        assert!(compute_spectrum(&[], &params(), &cal).is_none());
        let single = compute_spectrum(&[Complex32::new(1.0, 0.0)], &params(), &cal).unwrap();
        assert!(single.is_empty());
    }

    #[test]
    fn empty_frame_reports_no_new_spectrum() {
        let mut analyzer =
            SpectralAnalyzer::new(params(), SpectrumCalibration::default(), SpectrumSource::AllSamples);
        let frame = RawAdcFrame::from_complex(1, &tone(16, 2, 16));
        assert!(analyzer.process_frame(&frame).is_some());

        let empty = RawAdcFrame::from_complex(2, &[]);
        assert!(analyzer.process_frame(&empty).is_none());

        analyzer.clear();
        assert!(analyzer.spectrum().is_none());
    }

    #[test]
    fn parameter_change_without_samples_drops_spectrum() {
        let mut analyzer =
            SpectralAnalyzer::new(params(), SpectrumCalibration::default(), SpectrumSource::AllSamples);
        analyzer.process_frame(&RawAdcFrame::from_complex(1, &tone(16, 2, 16)));
        analyzer.process_frame(&RawAdcFrame::from_complex(2, &[]));

        analyzer.set_parameters(RadarParameters {
            bandwidth_hz: params().bandwidth_hz * 2.0,
            ..params()
        });
        assert!(analyzer.spectrum().is_none());
    }

    #[test]
    fn parameter_change_recomputes_range_axis() {
        let mut analyzer =
            SpectralAnalyzer::new(params(), SpectrumCalibration::default(), SpectrumSource::AllSamples);
        analyzer.process_frame(&RawAdcFrame::from_complex(1, &tone(32, 4, 32)));
        let before = analyzer.spectrum().unwrap().range_m[4];

        analyzer.set_parameters(RadarParameters {
            bandwidth_hz: params().bandwidth_hz * 2.0,
            ..params()
        });
        let after = analyzer.spectrum().unwrap().range_m[4];
        assert!((after - before / 2.0).abs() < 1e-9);
    }

    #[test]
    fn chirp_source_uses_selected_chirp_only() {
        let mut samples = tone(16, 3, 16);
        samples.extend(vec![Complex32::new(0.0, 0.0); 16]);
        let frame = RawAdcFrame {
            num_chirps: 2,
            num_samples_per_chirp: 16,
            ..RawAdcFrame::from_complex(4, &samples)
        };
        let mut analyzer = SpectralAnalyzer::new(
            params(),
            SpectrumCalibration::default(),
            SpectrumSource::Chirp { chirp: 0, rx: 0 },
        );
        let spectrum = analyzer.process_frame(&frame).unwrap();
        assert_eq!(spectrum.len(), 8);
        assert_eq!(spectrum.peak_bin(), Some(3));
    }

    #[test]
    fn source_is_tagged_by_kind() {
        let json = serde_json::to_value(SpectrumSource::Chirp { chirp: 2, rx: 1 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "chirp", "chirp": 2, "rx": 1}));
        let parsed: SpectrumSource = serde_json::from_str(r#"{"kind":"all_samples"}"#).unwrap();
        assert_eq!(parsed, SpectrumSource::AllSamples);
    }
}
