//! ASCII telemetry emitted by older front-end firmware.
//!
//! Target reports look like `NumTargets:<n>` followed by `n` records of eight
//! numbers in binary record order. Raw samples look like `ADC:` followed by
//! interleaved I/Q pairs. Fields are separated by commas, semicolons or
//! whitespace; anything before the marker is ignored.

use crate::prelude::{DecodeError, DecodeResult};
use crate::protocol::adc::{DataFormat, RawAdcFrame};
use crate::protocol::target::{TargetTrack, TargetTrackData};
use crate::protocol::Message;
use num_complex::Complex32;
use std::str::FromStr;

pub const TARGETS_MARKER: &str = "NumTargets:";
pub const ADC_MARKER: &str = "ADC:";

const FIELDS_PER_TARGET: usize = 8;

/// Parses a datagram whose discriminator matched no binary type.
pub fn decode_legacy(data: &[u8], discriminator: u32) -> DecodeResult<Message> {
    let text = std::str::from_utf8(data)
        .map_err(|_| DecodeError::UnknownMessageType(discriminator))?;

    if let Some(idx) = text.find(TARGETS_MARKER) {
        parse_targets(&text[idx + TARGETS_MARKER.len()..]).map(Message::Targets)
    } else if let Some(idx) = text.find(ADC_MARKER) {
        parse_adc(&text[idx + ADC_MARKER.len()..]).map(Message::RawAdc)
    } else {
        Err(DecodeError::UnknownMessageType(discriminator))
    }
}

fn tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c == ',' || c == ';' || c == '\0' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

fn number<T: FromStr>(token: Option<&str>, field: &str) -> DecodeResult<T> {
    let token =
        token.ok_or_else(|| DecodeError::MalformedTextMessage(format!("missing {}", field)))?;
    token
        .parse()
        .map_err(|_| DecodeError::MalformedTextMessage(format!("{} {:?}", field, token)))
}

fn parse_targets(body: &str) -> DecodeResult<TargetTrackData> {
    let mut fields = tokens(body);
    let count: usize = number(fields.next(), "target count")?;
    let needed = count.checked_mul(FIELDS_PER_TARGET).ok_or_else(|| {
        DecodeError::MalformedTextMessage(format!("target count {} out of range", count))
    })?;
    let remaining: Vec<&str> = fields.collect();
    if remaining.len() < needed {
        return Err(DecodeError::MalformedTextMessage(format!(
            "{} targets need {} fields, found {}",
            count,
            needed,
            remaining.len()
        )));
    }

    let targets: Vec<TargetTrack> = remaining
        .chunks_exact(FIELDS_PER_TARGET)
        .take(count)
        .map(|record| -> DecodeResult<TargetTrack> {
            let mut it = record.iter().copied();
            Ok(TargetTrack {
                target_id: number(it.next(), "target_id")?,
                level_db: number(it.next(), "level")?,
                radius_m: number(it.next(), "radius")?,
                azimuth_deg: number(it.next(), "azimuth")?,
                elevation_deg: number(it.next(), "elevation")?,
                radial_speed_mps: number(it.next(), "radial_speed")?,
                azimuth_speed_dps: number(it.next(), "azimuth_speed")?,
                elevation_speed_dps: number(it.next(), "elevation_speed")?,
            })
        })
        .collect::<DecodeResult<Vec<_>>>()?;
    if targets.len() != count {
        return Err(DecodeError::MalformedTextMessage(format!(
            "declared {} targets, parsed {}",
            count,
            targets.len()
        )));
    }

    Ok(TargetTrackData { targets })
}

fn parse_adc(body: &str) -> DecodeResult<RawAdcFrame> {
    let values = tokens(body)
        .map(|token| number::<f32>(Some(token), "sample"))
        .collect::<DecodeResult<Vec<_>>>()?;
    if values.len() % 2 != 0 {
        return Err(DecodeError::MalformedTextMessage(format!(
            "odd I/Q value count {}",
            values.len()
        )));
    }

    Ok(RawAdcFrame {
        frame_number: 0,
        num_chirps: 1,
        num_rx_antennas: 1,
        num_samples_per_chirp: (values.len() / 2) as u32,
        rx_mask: 0x01,
        adc_resolution: 0,
        interleaved_rx: false,
        data_format: DataFormat::ComplexFloat,
        samples: values,
    })
}

pub fn format_legacy_targets(data: &TargetTrackData) -> String {
    let mut text = format!("{}{}", TARGETS_MARKER, data.num_tracks());
    for t in &data.targets {
        text.push_str(&format!(
            "\n{},{},{},{},{},{},{},{}",
            t.target_id,
            t.level_db,
            t.radius_m,
            t.azimuth_deg,
            t.elevation_deg,
            t.radial_speed_mps,
            t.azimuth_speed_dps,
            t.elevation_speed_dps
        ));
    }
    text
}

pub fn format_legacy_adc(samples: &[Complex32]) -> String {
    let mut text = String::from(ADC_MARKER);
    for s in samples {
        text.push_str(&format!(" {},{}", s.re, s.im));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_text(text: &str) -> DecodeResult<Message> {
        decode_legacy(text.as_bytes(), 0)
    }

    #[test]
    fn parses_target_report_with_prefix() {
        let text = "t=17 NumTargets:2\n5,-30.5,12.5,1,0,2.5,0,0\n9 -20 40 -3 1 -1 0.5 0";
        let Message::Targets(data) = decode_text(text).unwrap() else {
            panic!("expected targets");
        };
        assert_eq!(data.num_tracks(), 2);
        assert_eq!(data.targets[0].target_id, 5);
        assert_eq!(data.targets[0].radial_speed_mps, 2.5);
        assert_eq!(data.targets[1].target_id, 9);
        assert_eq!(data.targets[1].radius_m, 40.0);
    }

    #[test]
    fn formatted_targets_parse_back() {
        let data = TargetTrackData::new(vec![TargetTrack::new(3, 7.125), TargetTrack::new(4, 0.5)]);
        assert_eq!(
            decode_text(&format_legacy_targets(&data)).unwrap(),
            Message::Targets(data)
        );
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let result = decode_text("NumTargets:1 5 -30 abc 0 0 0 0 0");
        assert!(matches!(result, Err(DecodeError::MalformedTextMessage(_))));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let result = decode_text("NumTargets:2 5 -30 12 0 0 0 0 0");
        assert!(matches!(result, Err(DecodeError::MalformedTextMessage(_))));
    }

    #[test]
    fn oversized_target_count_is_malformed() {
        for text in [
            "NumTargets:18446744073709551615 1",
            "NumTargets:2305843009213693952",
        ] {
            assert!(
                matches!(decode_text(text), Err(DecodeError::MalformedTextMessage(_))),
                "{}",
                text
            );
        }
    }

    #[test]
    fn zero_targets_is_an_empty_report() {
        assert_eq!(
            decode_text("NumTargets:0").unwrap(),
            Message::Targets(TargetTrackData::default())
        );
    }

    #[test]
    fn adc_text_becomes_complex_frame() {
        let samples = [Complex32::new(1.0, 0.5), Complex32::new(-0.25, 2.0)];
        let Message::RawAdc(frame) = decode_text(&format_legacy_adc(&samples)).unwrap() else {
            panic!("expected raw adc");
        };
        assert!(frame.is_consistent());
        assert_eq!(frame.complex_samples(), samples.to_vec());
    }

    #[test]
    fn odd_adc_value_count_is_malformed() {
        assert!(matches!(
            decode_text("ADC: 1.0 2.0 3.0"),
            Err(DecodeError::MalformedTextMessage(_))
        ));
    }

    #[test]
    fn text_without_marker_is_unknown() {
        assert_eq!(
            decode_legacy(b"hello radar", 0x6c6c6568),
            Err(DecodeError::UnknownMessageType(0x6c6c6568))
        );
        assert_eq!(
            decode_legacy(&[0xff, 0xfe, 0xfd, 0xfc], 7),
            Err(DecodeError::UnknownMessageType(7))
        );
    }
}
