use num_complex::Complex32;
use std::f32::consts::PI;

/// Complex exponential at `cycles_per_sample`, starting at `phase` radians.
pub fn beat_tone(length: usize, cycles_per_sample: f32, phase: f32) -> Vec<Complex32> {
    (0..length)
        .map(|i| Complex32::from_polar(1.0, 2.0 * PI * cycles_per_sample * i as f32 + phase))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tone_has_unit_magnitude_and_advances_phase() {
        let tone = beat_tone(8, 0.25, 0.0);
        assert!(tone.iter().all(|s| (s.norm() - 1.0).abs() < 1e-6));
        assert!((tone[1] - Complex32::new(0.0, 1.0)).norm() < 1e-6);
        assert!((tone[2] - Complex32::new(-1.0, 0.0)).norm() < 1e-6);
    }
}
