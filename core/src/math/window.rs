use num_complex::Complex64;
use std::f64::consts::PI;

/// Hann coefficient for index `n` of a window spanning `len` samples.
pub fn hann_coefficient(n: usize, len: usize) -> f64 {
    if len < 2 {
        return 1.0;
    }
    0.5 * (1.0 - (2.0 * PI * n as f64 / (len - 1) as f64).cos())
}

/// Tapers the first `valid` samples in place. Returns `false` without touching
/// the buffer when fewer than two samples are valid.
pub fn apply_hann(buffer: &mut [Complex64], valid: usize) -> bool {
    let valid = valid.min(buffer.len());
    if valid < 2 {
        return false;
    }
    for (n, sample) in buffer[..valid].iter_mut().enumerate() {
        *sample *= hann_coefficient(n, valid);
    }
    true
}
