use serde::{Deserialize, Serialize};

/// Speed of light in vacuum, m/s.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Radar calibration parameters supplied by the configuration collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarParameters {
    pub sample_rate_hz: f64,
    pub sweep_time_s: f64,
    pub bandwidth_hz: f64,
    pub center_freq_hz: f64,
}

impl Default for RadarParameters {
    fn default() -> Self {
        Self {
            sample_rate_hz: 1_000_000.0,
            sweep_time_s: 0.001,
            bandwidth_hz: 250_000_000.0,
            center_freq_hz: 24_125_000_000.0,
        }
    }
}

impl RadarParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("sample_rate_hz", self.sample_rate_hz),
            ("sweep_time_s", self.sweep_time_s),
            ("bandwidth_hz", self.bandwidth_hz),
            ("center_freq_hz", self.center_freq_hz),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::OutOfRange {
                    field: name,
                    value,
                });
            }
        }
        Ok(())
    }

    /// Meters of range per hertz of beat frequency.
    pub fn range_per_hz(&self) -> f64 {
        if self.bandwidth_hz > 0.0 {
            SPEED_OF_LIGHT * self.sweep_time_s / (2.0 * self.bandwidth_hz)
        } else {
            0.0
        }
    }
}

/// Why a datagram produced no message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    Truncated,
    Malformed,
    Unknown,
    Overflow,
}

/// Rejection reasons for a single datagram. None of these are fatal to ingestion.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("truncated packet: needed {needed} bytes, {available} available")]
    TruncatedPacket { needed: usize, available: usize },
    #[error("unknown message type {0:#010x}")]
    UnknownMessageType(u32),
    #[error("malformed text message: {0}")]
    MalformedTextMessage(String),
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

impl DecodeError {
    pub fn kind(&self) -> DropReason {
        match self {
            DecodeError::TruncatedPacket { .. } => DropReason::Truncated,
            DecodeError::UnknownMessageType(_) => DropReason::Unknown,
            DecodeError::MalformedTextMessage(_) | DecodeError::InvalidHeader(_) => {
                DropReason::Malformed
            }
        }
    }
}

pub type DecodeResult<T> = Result<T, DecodeError>;

/// Invalid configuration supplied by a collaborator.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_parameters_are_valid() {
        assert!(RadarParameters::default().validate().is_ok());
    }

    #[test]
    fn zero_bandwidth_is_rejected() {
        let params = RadarParameters {
            bandwidth_hz: 0.0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::OutOfRange {
                field: "bandwidth_hz",
                value: 0.0
            })
        );
        assert_eq!(params.range_per_hz(), 0.0);
    }

    #[test]
    fn decode_errors_map_to_drop_reasons() {
        assert_eq!(
            DecodeError::TruncatedPacket {
                needed: 4,
                available: 3
            }
            .kind(),
            DropReason::Truncated
        );
        assert_eq!(
            DecodeError::InvalidHeader("format".into()).kind(),
            DropReason::Malformed
        );
        assert_eq!(DecodeError::UnknownMessageType(7).kind(), DropReason::Unknown);
    }
}
