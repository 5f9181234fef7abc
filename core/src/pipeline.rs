use crate::ingest::{Datagram, DatagramQueue};
use crate::prelude::{ConfigError, RadarParameters};
use crate::processing::{
    EstimatorConfig, ProcessingThresholds, RangeRate, RangeRateEstimator, SpectralAnalyzer,
    Spectrum, SpectrumCalibration, SpectrumSource,
};
use crate::protocol::{DataFormat, Decoder, Message, RawAdcFrame, TargetTrackData};
use crate::telemetry::{CounterSnapshot, LogManager, PacketCounters};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Everything the pipeline consumes from the configuration collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub radar: RadarParameters,
    pub calibration: SpectrumCalibration,
    pub spectrum_source: SpectrumSource,
    pub estimator: EstimatorConfig,
    pub thresholds: ProcessingThresholds,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.radar.validate()?;
        self.estimator.validate()
    }
}

/// Header fields of the newest raw-ADC frame, without its samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub frame_number: u32,
    pub num_chirps: u32,
    pub num_rx_antennas: u8,
    pub num_samples_per_chirp: u32,
    pub rx_mask: u8,
    pub adc_resolution: u8,
    pub interleaved_rx: bool,
    pub data_format: DataFormat,
    pub sample_count: usize,
}

impl From<&RawAdcFrame> for FrameSummary {
    fn from(frame: &RawAdcFrame) -> Self {
        Self {
            frame_number: frame.frame_number,
            num_chirps: frame.num_chirps,
            num_rx_antennas: frame.num_rx_antennas,
            num_samples_per_chirp: frame.num_samples_per_chirp,
            rx_mask: frame.rx_mask,
            adc_resolution: frame.adc_resolution,
            interleaved_rx: frame.interleaved_rx,
            data_format: frame.data_format,
            sample_count: frame.sample_count(),
        }
    }
}

/// State handed to presentation code after each tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub frame: Option<FrameSummary>,
    pub spectrum: Option<Spectrum>,
    pub targets: Option<TargetTrackData>,
    pub range_rates: Vec<RangeRate>,
    pub tracked: usize,
    pub counters: CounterSnapshot,
}

/// Decoder, spectral analyzer and range-rate estimator driven on one thread.
pub struct Pipeline {
    decoder: Decoder,
    analyzer: SpectralAnalyzer,
    estimator: RangeRateEstimator,
    thresholds: ProcessingThresholds,
    frame: Option<FrameSummary>,
    targets: Option<TargetTrackData>,
    range_rates: Vec<RangeRate>,
    logger: LogManager,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, counters: Arc<PacketCounters>) -> Self {
        Self {
            decoder: Decoder::new(counters),
            analyzer: SpectralAnalyzer::new(
                config.radar,
                config.calibration,
                config.spectrum_source,
            ),
            estimator: RangeRateEstimator::new(config.estimator),
            thresholds: config.thresholds,
            frame: None,
            targets: None,
            range_rates: Vec::new(),
            logger: LogManager::new("pipeline"),
        }
    }

    /// Drains every pending datagram, then runs one recompute pass.
    pub fn tick(&mut self, queue: &DatagramQueue) -> PipelineSnapshot {
        let datagrams = queue.drain();
        self.process_batch(datagrams)
    }

    pub fn process_batch<I>(&mut self, datagrams: I) -> PipelineSnapshot
    where
        I: IntoIterator<Item = Datagram>,
    {
        let mut newest_frame: Option<RawAdcFrame> = None;
        let mut target_batches: Vec<(f64, TargetTrackData)> = Vec::new();
        let mut decoded = 0usize;

        for datagram in datagrams {
            match self.decoder.decode(&datagram.payload) {
                Some(Message::RawAdc(frame)) => newest_frame = Some(frame),
                Some(Message::Targets(data)) => {
                    target_batches.push((datagram.received_at_s, data))
                }
                None => continue,
            }
            decoded += 1;
        }

        if let Some(frame) = newest_frame {
            if self.analyzer.process_frame(&frame).is_none() {
                self.analyzer.clear();
            }
            self.frame = Some(FrameSummary::from(&frame));
        }

        for (received_at_s, data) in target_batches {
            let accepted = self.thresholds.apply(&data);
            self.range_rates = self.estimator.update(&accepted, received_at_s);
            self.targets = Some(accepted);
        }

        if decoded > 0 {
            self.logger.detail(&format!(
                "tick decoded {} datagrams, {} tracks held",
                decoded,
                self.estimator.len()
            ));
        }
        self.snapshot()
    }

    pub fn set_radar_parameters(&mut self, params: RadarParameters) -> Result<(), ConfigError> {
        params.validate()?;
        self.analyzer.set_parameters(params);
        Ok(())
    }

    pub fn set_thresholds(&mut self, thresholds: ProcessingThresholds) {
        self.thresholds = thresholds;
    }

    /// External clear action: drops track history and the displayed spectrum.
    pub fn clear(&mut self) {
        self.estimator.clear();
        self.analyzer.clear();
        self.frame = None;
        self.targets = None;
        self.range_rates.clear();
        self.logger.record("cleared track history and spectrum");
    }

    pub fn estimator(&self) -> &RangeRateEstimator {
        &self.estimator
    }

    pub fn estimator_mut(&mut self) -> &mut RangeRateEstimator {
        &mut self.estimator
    }

    pub fn spectrum(&self) -> Option<&Spectrum> {
        self.analyzer.spectrum()
    }

    pub fn counters(&self) -> &Arc<PacketCounters> {
        self.decoder.counters()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            frame: self.frame.clone(),
            spectrum: self.analyzer.spectrum().cloned(),
            targets: self.targets.clone(),
            range_rates: self.range_rates.clone(),
            tracked: self.estimator.len(),
            counters: self.decoder.counters().snapshot(),
        }
    }
}
