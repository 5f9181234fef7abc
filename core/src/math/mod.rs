pub mod fft;
pub mod stats;
pub mod window;

pub use fft::{fft_in_place, padded_len, NotPowerOfTwo};
pub use stats::StatsHelper;
pub use window::apply_hann;
