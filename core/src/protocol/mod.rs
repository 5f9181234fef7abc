//! Wire format for front-end telemetry datagrams.
//!
//! A native-endian `u32` discriminator at offset 0 selects the binary layout;
//! anything else is handed to the legacy ASCII parser.

pub mod adc;
pub mod decoder;
pub mod legacy;
pub mod target;
pub mod wire;

use serde::{Deserialize, Serialize};

pub use adc::{decode_raw_adc, encode_raw_adc, DataFormat, RawAdcFrame, RAW_ADC_HEADER_LEN};
pub use decoder::{decode, Decoder};
pub use legacy::{format_legacy_adc, format_legacy_targets};
pub use target::{
    decode_targets, encode_targets, TargetTrack, TargetTrackData, TARGET_HEADER_LEN,
    TARGET_RECORD_LEN,
};

/// Discriminator of a raw-ADC frame.
pub const MSG_RAW_ADC: u32 = 0x01;
/// Discriminator of a target-data packet.
pub const MSG_TARGETS: u32 = 0x02;

/// A successfully decoded datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    RawAdc(RawAdcFrame),
    Targets(TargetTrackData),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("{0} targets do not fit the one-byte count field")]
    TooManyTargets(usize),
}
