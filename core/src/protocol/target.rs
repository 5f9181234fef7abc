use crate::prelude::{DecodeError, DecodeResult};
use crate::protocol::wire::{ByteReader, ByteWriter};
use crate::protocol::{EncodeError, MSG_TARGETS};
use serde::{Deserialize, Serialize};

/// message_type(u32) + num_targets(u8).
pub const TARGET_HEADER_LEN: usize = 5;
/// target_id(u32) + seven float32 fields.
pub const TARGET_RECORD_LEN: usize = 4 + 7 * 4;

/// One producer-reported detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetTrack {
    pub target_id: u32,
    pub level_db: f32,
    pub radius_m: f32,
    pub azimuth_deg: f32,
    pub elevation_deg: f32,
    /// Positive when approaching.
    pub radial_speed_mps: f32,
    pub azimuth_speed_dps: f32,
    pub elevation_speed_dps: f32,
}

impl TargetTrack {
    pub fn new(target_id: u32, radius_m: f32) -> Self {
        Self {
            target_id,
            level_db: 0.0,
            radius_m,
            azimuth_deg: 0.0,
            elevation_deg: 0.0,
            radial_speed_mps: 0.0,
            azimuth_speed_dps: 0.0,
            elevation_speed_dps: 0.0,
        }
    }

    fn read(reader: &mut ByteReader<'_>) -> DecodeResult<Self> {
        Ok(Self {
            target_id: reader.read_u32()?,
            level_db: reader.read_f32()?,
            radius_m: reader.read_f32()?,
            azimuth_deg: reader.read_f32()?,
            elevation_deg: reader.read_f32()?,
            radial_speed_mps: reader.read_f32()?,
            azimuth_speed_dps: reader.read_f32()?,
            elevation_speed_dps: reader.read_f32()?,
        })
    }

    fn write(&self, writer: &mut ByteWriter) {
        writer.put_u32(self.target_id);
        writer.put_f32(self.level_db);
        writer.put_f32(self.radius_m);
        writer.put_f32(self.azimuth_deg);
        writer.put_f32(self.elevation_deg);
        writer.put_f32(self.radial_speed_mps);
        writer.put_f32(self.azimuth_speed_dps);
        writer.put_f32(self.elevation_speed_dps);
    }
}

/// All detections of one reporting cycle, in packet order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetTrackData {
    pub targets: Vec<TargetTrack>,
}

impl TargetTrackData {
    pub fn new(targets: Vec<TargetTrack>) -> Self {
        Self { targets }
    }

    pub fn num_tracks(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub fn decode_targets(data: &[u8]) -> DecodeResult<TargetTrackData> {
    if data.len() < TARGET_HEADER_LEN {
        return Err(DecodeError::TruncatedPacket {
            needed: TARGET_HEADER_LEN,
            available: data.len(),
        });
    }

    let mut reader = ByteReader::new(data);
    let _message_type = reader.read_u32()?;
    let num_targets = reader.read_u8()? as usize;

    let needed = TARGET_HEADER_LEN + num_targets * TARGET_RECORD_LEN;
    if data.len() < needed {
        return Err(DecodeError::TruncatedPacket {
            needed,
            available: data.len(),
        });
    }

    let targets = (0..num_targets)
        .map(|_| TargetTrack::read(&mut reader))
        .collect::<DecodeResult<Vec<_>>>()?;
    Ok(TargetTrackData { targets })
}

pub fn encode_targets(data: &TargetTrackData) -> Result<Vec<u8>, EncodeError> {
    let count = u8::try_from(data.targets.len())
        .map_err(|_| EncodeError::TooManyTargets(data.targets.len()))?;
    let mut writer =
        ByteWriter::with_capacity(TARGET_HEADER_LEN + data.targets.len() * TARGET_RECORD_LEN);
    writer.put_u32(MSG_TARGETS);
    writer.put_u8(count);
    for target in &data.targets {
        target.write(&mut writer);
    }
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detailed_target(id: u32) -> TargetTrack {
        TargetTrack {
            target_id: id,
            level_db: -42.5,
            radius_m: 17.25,
            azimuth_deg: -12.0,
            elevation_deg: 3.5,
            radial_speed_mps: 1.25,
            azimuth_speed_dps: -0.5,
            elevation_speed_dps: 0.125,
        }
    }

    #[test]
    fn two_targets_keep_packet_order() {
        let data = TargetTrackData::new(vec![TargetTrack::new(5, 12.5), TargetTrack::new(9, 40.0)]);
        let decoded = decode_targets(&encode_targets(&data).unwrap()).unwrap();
        assert_eq!(decoded.num_tracks(), 2);
        assert_eq!(decoded.targets[0].target_id, 5);
        assert_eq!(decoded.targets[0].radius_m, 12.5);
        assert_eq!(decoded.targets[1].target_id, 9);
        assert_eq!(decoded.targets[1].radius_m, 40.0);
    }

    #[test]
    fn every_field_survives_encoding() {
        for count in [0usize, 1, 7] {
            let data = TargetTrackData::new((0..count as u32).map(detailed_target).collect());
            let bytes = encode_targets(&data).unwrap();
            assert_eq!(bytes.len(), TARGET_HEADER_LEN + count * TARGET_RECORD_LEN);
            assert_eq!(decode_targets(&bytes).unwrap(), data);
        }
    }

    #[test]
    fn short_record_section_is_rejected() {
        let data = TargetTrackData::new(vec![detailed_target(1), detailed_target(2)]);
        let mut bytes = encode_targets(&data).unwrap();
        bytes.pop();
        assert_eq!(
            decode_targets(&bytes),
            Err(DecodeError::TruncatedPacket {
                needed: TARGET_HEADER_LEN + 2 * TARGET_RECORD_LEN,
                available: TARGET_HEADER_LEN + 2 * TARGET_RECORD_LEN - 1,
            })
        );
    }

    #[test]
    fn more_than_255_targets_cannot_be_encoded() {
        let data = TargetTrackData::new((0..256).map(|id| TargetTrack::new(id, 1.0)).collect());
        assert_eq!(encode_targets(&data), Err(EncodeError::TooManyTargets(256)));
    }
}
