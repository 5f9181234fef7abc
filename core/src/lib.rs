//! Telemetry core for FMCW radar front-ends streaming over UDP.
//!
//! Datagrams are decoded into raw-ADC frames or target reports, raw frames are
//! turned into a calibrated range spectrum, and target reports feed per-track
//! range-rate estimation. Everything here is synchronous and I/O free; the
//! socket side hands datagrams over through [`ingest::DatagramQueue`].

pub mod ingest;
pub mod math;
pub mod pipeline;
pub mod prelude;
pub mod processing;
pub mod protocol;
pub mod telemetry;

pub use pipeline::{Pipeline, PipelineConfig, PipelineSnapshot};
pub use prelude::{DecodeError, RadarParameters};
pub use protocol::{decode, Message};
