pub mod filter;
pub mod range_rate;
pub mod spectrum;

pub use filter::ProcessingThresholds;
pub use range_rate::{
    EstimatorConfig, RangeRate, RangeRateEstimator, SmoothingMode, TrackHistory,
    TrackHistoryEntry, TrackState,
};
pub use spectrum::{
    compute_spectrum, SpectralAnalyzer, Spectrum, SpectrumCalibration, SpectrumSource,
};
