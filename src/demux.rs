//! Decoding raw ring bytes into complex samples.
//!
//! Three wire formats are supported, each carrying one complex sample per
//! channel per sample period. The polarity defaults are bit-faithful to
//! the transmitting hardware: for `cbyte` and `cfloat` the first wire
//! component is the imaginary part unless I/Q swap is set, for `c4bits`
//! the low nibble is the real part unless swapped.

use num_complex::Complex;

use crate::config::{SourceConfig, WireFormat};
use crate::fifo::FifoState;

/// One complex output sample.
pub type Sample = Complex<f32>;

/// Offset-and-scale expansion of a packed 4-bit component to the odd
/// values 1..=15 / -15..=-1. Quantized by the transmitter; any deviation
/// here changes receiver behavior downstream.
fn nibble_amplitude(n: u8) -> i8 {
    debug_assert!(n < 16);
    if n >= 8 {
        2 * (n as i8 - 16) + 1
    } else {
        2 * n as i8 + 1
    }
}

/// Converts ring bytes into per-channel complex samples according to the
/// configured wire format.
#[derive(Debug, Clone)]
pub struct Demultiplexer {
    format: WireFormat,
    channels: usize,
    iq_swap: bool,
}

impl Demultiplexer {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            format: config.wire_format,
            channels: config.channels,
            iq_swap: config.iq_swap,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.channels * self.format.bytes_per_channel()
    }

    /// Decode up to `requested` samples per channel from the ring into
    /// `outputs`, consuming the decoded bytes. Returns the number of
    /// samples produced, which may be zero when the ring holds less than
    /// one full sample (underrun is not an error).
    ///
    /// Each slice in `outputs` must hold at least `requested` samples.
    /// When fewer outputs than configured channels are supplied, the
    /// bytes of the unconnected channels are skipped so the read cursor
    /// stays sample-aligned.
    pub fn demux(
        &self,
        fifo: &mut FifoState,
        requested: usize,
        outputs: &mut [&mut [Sample]],
    ) -> usize {
        debug_assert!(outputs.len() <= self.channels);
        let bytes_per_sample = self.bytes_per_sample();
        let n_samples = requested.min(fifo.available() / bytes_per_sample);
        let mut offset = 0usize;
        for s in 0..n_samples {
            for ch in 0..self.channels {
                let sample = match self.format {
                    WireFormat::Cbyte => {
                        let first = fifo.peek(offset) as i8;
                        let second = fifo.peek(offset + 1) as i8;
                        offset += 2;
                        if self.iq_swap {
                            Complex::new(first as f32, second as f32)
                        } else {
                            Complex::new(second as f32, first as f32)
                        }
                    }
                    WireFormat::C4bits => {
                        let byte = fifo.peek(offset);
                        offset += 1;
                        let lo = nibble_amplitude(byte & 0x0f) as f32;
                        let hi = nibble_amplitude(byte >> 4) as f32;
                        if self.iq_swap {
                            Complex::new(hi, lo)
                        } else {
                            Complex::new(lo, hi)
                        }
                    }
                    WireFormat::Cfloat => {
                        let mut word = [0u8; 4];
                        for (i, b) in word.iter_mut().enumerate() {
                            *b = fifo.peek(offset + i);
                        }
                        let first = f32::from_ne_bytes(word);
                        for (i, b) in word.iter_mut().enumerate() {
                            *b = fifo.peek(offset + 4 + i);
                        }
                        let second = f32::from_ne_bytes(word);
                        offset += 8;
                        if self.iq_swap {
                            Complex::new(first, second)
                        } else {
                            Complex::new(second, first)
                        }
                    }
                };
                if let Some(out) = outputs.get_mut(ch) {
                    out[s] = sample;
                }
            }
        }
        fifo.consume(n_samples * bytes_per_sample);
        n_samples
    }
}
