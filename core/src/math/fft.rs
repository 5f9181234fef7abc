use num_complex::Complex64;
use std::f64::consts::PI;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("FFT length {0} is not a power of two")]
pub struct NotPowerOfTwo(pub usize);

/// Smallest power of two that holds `len` samples (1 for an empty input).
pub fn padded_len(len: usize) -> usize {
    len.max(1).next_power_of_two()
}

/// In-place iterative radix-2 decimation-in-time forward FFT.
///
/// The buffer is bit-reverse permuted, then combined over `log2(n)` butterfly
/// stages. Within a stage the twiddle factor is advanced by complex
/// multiplication instead of evaluating sin/cos per element.
pub fn fft_in_place(buffer: &mut [Complex64]) -> Result<(), NotPowerOfTwo> {
    let n = buffer.len();
    if n <= 1 {
        return Ok(());
    }
    if !n.is_power_of_two() {
        return Err(NotPowerOfTwo(n));
    }

    bit_reverse_permute(buffer);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let angle = -2.0 * PI / len as f64;
        let step = Complex64::new(angle.cos(), angle.sin());
        for start in (0..n).step_by(len) {
            let mut twiddle = Complex64::new(1.0, 0.0);
            for k in 0..half {
                let even = buffer[start + k];
                let odd = buffer[start + k + half] * twiddle;
                buffer[start + k] = even + odd;
                buffer[start + k + half] = even - odd;
                twiddle *= step;
            }
        }
        len <<= 1;
    }
    Ok(())
}

fn bit_reverse_permute(buffer: &mut [Complex64]) {
    let n = buffer.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j |= bit;
        if i < j {
            buffer.swap(i, j);
        }
    }
}
