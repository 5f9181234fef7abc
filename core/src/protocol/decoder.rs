use crate::prelude::{DecodeError, DecodeResult};
use crate::protocol::wire::ByteReader;
use crate::protocol::{adc, legacy, target, Message, MSG_RAW_ADC, MSG_TARGETS};
use crate::telemetry::{LogManager, PacketCounters};
use std::sync::Arc;

/// Size of the leading discriminator.
pub const DISCRIMINATOR_LEN: usize = 4;

/// Classifies and parses one datagram. Stateless; reads nothing past `data`.
pub fn decode(data: &[u8]) -> DecodeResult<Message> {
    if data.len() < DISCRIMINATOR_LEN {
        return Err(DecodeError::TruncatedPacket {
            needed: DISCRIMINATOR_LEN,
            available: data.len(),
        });
    }

    let discriminator = ByteReader::new(data).read_u32()?;
    match discriminator {
        MSG_RAW_ADC => adc::decode_raw_adc(data).map(Message::RawAdc),
        MSG_TARGETS => target::decode_targets(data).map(Message::Targets),
        other => legacy::decode_legacy(data, other),
    }
}

/// Counting front of [`decode`]: rejected datagrams become `None` and bump
/// the matching drop counter.
pub struct Decoder {
    counters: Arc<PacketCounters>,
    logger: LogManager,
}

impl Decoder {
    pub fn new(counters: Arc<PacketCounters>) -> Self {
        Self {
            counters,
            logger: LogManager::new("decoder"),
        }
    }

    pub fn decode(&self, data: &[u8]) -> Option<Message> {
        self.counters.record_received();
        match decode(data) {
            Ok(message) => {
                match &message {
                    Message::RawAdc(_) => self.counters.record_raw_adc(),
                    Message::Targets(_) => self.counters.record_targets(),
                }
                Some(message)
            }
            Err(err) => {
                self.counters.record_drop(err.kind());
                self.logger
                    .detail(&format!("dropped {} byte datagram: {}", data.len(), err));
                None
            }
        }
    }

    pub fn counters(&self) -> &Arc<PacketCounters> {
        &self.counters
    }
}
