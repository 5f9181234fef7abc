use crate::prelude::{DecodeError, DecodeResult};
use crate::protocol::wire::{ByteReader, ByteWriter};
use crate::protocol::MSG_RAW_ADC;
use ndarray::Array3;
use num_complex::Complex32;
use serde::{Deserialize, Serialize};

/// message_type, frame_number, num_chirps, num_rx_antennas, num_samples_per_chirp,
/// rx_mask, adc_resolution, interleaved_rx, data_format.
pub const RAW_ADC_HEADER_LEN: usize = 4 + 4 + 4 + 1 + 4 + 1 + 1 + 1 + 4;

/// Sample representation declared by the producer. Samples always travel as
/// float32; the int16 variants record the front-end's native ADC word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataFormat {
    RealFloat,
    ComplexFloat,
    RealInt16,
    ComplexInt16,
}

impl DataFormat {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(DataFormat::RealFloat),
            1 => Some(DataFormat::ComplexFloat),
            2 => Some(DataFormat::RealInt16),
            3 => Some(DataFormat::ComplexInt16),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            DataFormat::RealFloat => 0,
            DataFormat::ComplexFloat => 1,
            DataFormat::RealInt16 => 2,
            DataFormat::ComplexInt16 => 3,
        }
    }

    pub fn is_complex(self) -> bool {
        matches!(self, DataFormat::ComplexFloat | DataFormat::ComplexInt16)
    }

    /// Float values carried per logical sample.
    pub fn values_per_sample(self) -> usize {
        if self.is_complex() {
            2
        } else {
            1
        }
    }
}

/// One raw-ADC frame as declared by the front-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAdcFrame {
    pub frame_number: u32,
    pub num_chirps: u32,
    pub num_rx_antennas: u8,
    pub num_samples_per_chirp: u32,
    pub rx_mask: u8,
    pub adc_resolution: u8,
    pub interleaved_rx: bool,
    pub data_format: DataFormat,
    /// Float values in wire order; I/Q pairs when interleaved or complex.
    pub samples: Vec<f32>,
}

/// Float values per logical sample: two when the header flags interleaved
/// I/Q or the format is complex, otherwise one.
pub fn values_per_sample(interleaved_rx: bool, data_format: DataFormat) -> usize {
    if interleaved_rx {
        2
    } else {
        data_format.values_per_sample()
    }
}

/// Float value count implied by the declared dimensions, `None` on overflow.
pub fn expected_value_count(
    num_chirps: u32,
    num_rx_antennas: u8,
    num_samples_per_chirp: u32,
    interleaved_rx: bool,
    data_format: DataFormat,
) -> Option<usize> {
    (num_chirps as usize)
        .checked_mul(num_samples_per_chirp as usize)?
        .checked_mul(num_rx_antennas as usize)?
        .checked_mul(values_per_sample(interleaved_rx, data_format))
}

impl RawAdcFrame {
    /// Single-chirp, single-antenna complex frame.
    pub fn from_complex(frame_number: u32, samples: &[Complex32]) -> Self {
        Self {
            frame_number,
            num_chirps: 1,
            num_rx_antennas: 1,
            num_samples_per_chirp: samples.len() as u32,
            rx_mask: 0x01,
            adc_resolution: 12,
            interleaved_rx: false,
            data_format: DataFormat::ComplexFloat,
            samples: samples.iter().flat_map(|s| [s.re, s.im]).collect(),
        }
    }

    pub fn values_per_sample(&self) -> usize {
        values_per_sample(self.interleaved_rx, self.data_format)
    }

    /// Logical samples carried, counting each I/Q pair once.
    pub fn sample_count(&self) -> usize {
        self.samples.len() / self.values_per_sample()
    }

    pub fn expected_value_count(&self) -> Option<usize> {
        expected_value_count(
            self.num_chirps,
            self.num_rx_antennas,
            self.num_samples_per_chirp,
            self.interleaved_rx,
            self.data_format,
        )
    }

    pub fn is_consistent(&self) -> bool {
        self.expected_value_count() == Some(self.samples.len())
    }

    /// Samples as I/Q pairs in declared order; unpaired values get Q = 0.
    pub fn complex_samples(&self) -> Vec<Complex32> {
        if self.values_per_sample() == 2 {
            self.samples
                .chunks_exact(2)
                .map(|pair| Complex32::new(pair[0], pair[1]))
                .collect()
        } else {
            self.samples
                .iter()
                .map(|&value| Complex32::new(value, 0.0))
                .collect()
        }
    }

    /// The frame as a `[chirp][rx][sample]` cube, honoring the interleaved
    /// `[chirp][sample][rx]` ordering. `None` when the frame is inconsistent.
    pub fn cube(&self) -> Option<Array3<Complex32>> {
        if !self.is_consistent() {
            return None;
        }
        let chirps = self.num_chirps as usize;
        let rx = self.num_rx_antennas as usize;
        let samples = self.num_samples_per_chirp as usize;
        let values = self.complex_samples();
        if self.interleaved_rx {
            Array3::from_shape_vec((chirps, samples, rx), values)
                .ok()
                .map(|cube| cube.permuted_axes([0, 2, 1]))
        } else {
            Array3::from_shape_vec((chirps, rx, samples), values).ok()
        }
    }

    /// Samples of one chirp on one receive antenna.
    pub fn chirp_samples(&self, chirp: usize, rx: usize) -> Option<Vec<Complex32>> {
        let cube = self.cube()?;
        let (chirps, antennas, _) = cube.dim();
        if chirp >= chirps || rx >= antennas {
            return None;
        }
        Some(cube.slice(ndarray::s![chirp, rx, ..]).to_vec())
    }
}

pub fn decode_raw_adc(data: &[u8]) -> DecodeResult<RawAdcFrame> {
    if data.len() < RAW_ADC_HEADER_LEN {
        return Err(DecodeError::TruncatedPacket {
            needed: RAW_ADC_HEADER_LEN,
            available: data.len(),
        });
    }

    let mut reader = ByteReader::new(data);
    let _message_type = reader.read_u32()?;
    let frame_number = reader.read_u32()?;
    let num_chirps = reader.read_u32()?;
    let num_rx_antennas = reader.read_u8()?;
    let num_samples_per_chirp = reader.read_u32()?;
    let rx_mask = reader.read_u8()?;
    let adc_resolution = reader.read_u8()?;
    let interleaved_rx = reader.read_u8()? != 0;
    let raw_format = reader.read_u32()?;

    let data_format = DataFormat::from_wire(raw_format)
        .ok_or_else(|| DecodeError::InvalidHeader(format!("data_format {}", raw_format)))?;

    let truncated = |needed: usize| DecodeError::TruncatedPacket {
        needed,
        available: data.len(),
    };
    let value_count = expected_value_count(
        num_chirps,
        num_rx_antennas,
        num_samples_per_chirp,
        interleaved_rx,
        data_format,
    )
    .ok_or_else(|| truncated(usize::MAX))?;
    let payload_len = value_count
        .checked_mul(4)
        .ok_or_else(|| truncated(usize::MAX))?;
    if reader.remaining() < payload_len {
        return Err(truncated(RAW_ADC_HEADER_LEN.saturating_add(payload_len)));
    }

    let samples = reader.read_f32_array(value_count)?;

    Ok(RawAdcFrame {
        frame_number,
        num_chirps,
        num_rx_antennas,
        num_samples_per_chirp,
        rx_mask,
        adc_resolution,
        interleaved_rx,
        data_format,
        samples,
    })
}

pub fn encode_raw_adc(frame: &RawAdcFrame) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(RAW_ADC_HEADER_LEN + frame.samples.len() * 4);
    writer.put_u32(MSG_RAW_ADC);
    writer.put_u32(frame.frame_number);
    writer.put_u32(frame.num_chirps);
    writer.put_u8(frame.num_rx_antennas);
    writer.put_u32(frame.num_samples_per_chirp);
    writer.put_u8(frame.rx_mask);
    writer.put_u8(frame.adc_resolution);
    writer.put_u8(u8::from(frame.interleaved_rx));
    writer.put_u32(frame.data_format.to_wire());
    for &value in &frame.samples {
        writer.put_f32(value);
    }
    writer.into_inner()
}
