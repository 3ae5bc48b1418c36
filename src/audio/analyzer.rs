//! Spectral analysis of a single PCM block
//!
//! Decodes signed 16-bit little-endian samples, computes loudness figures
//! and the magnitude spectrum of the real FFT, and reduces the spectrum to
//! the 16 lowest bins scaled to `0..=255`.

use rustfft::{num_complex::Complex, Fft, FftPlanner, Length};
use std::sync::Arc;

use crate::constants::{NUM_BANDS, SAMPLE_FULL_SCALE};
use crate::error::AnalysisError;

/// Result of analyzing one block
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// Lowest 16 spectrum bins, scaled so the strongest bin is 255
    pub bands: [u8; NUM_BANDS],
    /// Mean absolute sample value
    pub raw_level: f64,
    /// Largest absolute sample scaled to `0..=255`
    pub peak_level: u8,
    /// Sum of the unscaled magnitude spectrum
    pub magnitude_sum: f64,
    /// Frequency of the strongest bin in Hz
    pub peak_frequency: f64,
}

impl Analysis {
    /// Result for an all-zero block
    pub fn silence() -> Self {
        Self {
            bands: [0; NUM_BANDS],
            raw_level: 0.0,
            peak_level: 0,
            magnitude_sum: 0.0,
            peak_frequency: 0.0,
        }
    }

    /// Index of the loudest band (first one on ties)
    pub fn dominant_band(&self) -> usize {
        argmax(self.bands.iter().map(|&b| b as f64))
    }
}

/// FFT-based block analyzer.
///
/// Holds the planner so repeated blocks of the same length reuse one plan.
pub struct SpectrumAnalyzer {
    sample_rate: u32,
    planner: FftPlanner<f64>,
    fft: Option<Arc<dyn Fft<f64>>>,
    /// Reused FFT buffer
    scratch: Vec<Complex<f64>>,
    blocks_analyzed: u64,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            planner: FftPlanner::new(),
            fft: None,
            scratch: Vec::new(),
            blocks_analyzed: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn blocks_analyzed(&self) -> u64 {
        self.blocks_analyzed
    }

    /// Analyze one block of raw PCM bytes
    pub fn analyze(&mut self, block: &[u8]) -> Result<Analysis, AnalysisError> {
        let samples = decode_samples(block)?;
        let n = samples.len();

        let abs_sum: f64 = samples.iter().map(|&s| (s as i32).abs() as f64).sum();
        let raw_level = abs_sum / n as f64;

        let max_abs = samples.iter().map(|&s| (s as i32).abs()).max().unwrap_or(0);
        let peak_level = (max_abs as f64 / SAMPLE_FULL_SCALE * 255.0).round().min(255.0) as u8;

        let magnitudes = self.magnitude_spectrum(&samples);

        let max_magnitude = magnitudes.iter().cloned().fold(0.0_f64, f64::max);
        let mut bands = [0u8; NUM_BANDS];
        if max_magnitude > 0.0 {
            for (band, &magnitude) in bands.iter_mut().zip(magnitudes.iter()) {
                // Float to u8 casts truncate toward zero
                *band = (magnitude / max_magnitude * 255.0) as u8;
            }
        }

        let peak_bin = argmax(magnitudes.iter().cloned());
        let peak_frequency = peak_bin as f64 * self.sample_rate as f64 / n as f64;
        let magnitude_sum = magnitudes.iter().sum();

        self.blocks_analyzed += 1;

        Ok(Analysis {
            bands,
            raw_level,
            peak_level,
            magnitude_sum,
            peak_frequency,
        })
    }

    /// Magnitudes of the non-negative frequency half, `n / 2 + 1` bins
    fn magnitude_spectrum(&mut self, samples: &[i16]) -> Vec<f64> {
        let n = samples.len();

        let fft = match &self.fft {
            Some(fft) if fft.len() == n => fft.clone(),
            _ => {
                let fft = self.planner.plan_fft_forward(n);
                self.fft = Some(fft.clone());
                fft
            }
        };

        self.scratch.clear();
        self.scratch
            .extend(samples.iter().map(|&s| Complex::new(s as f64, 0.0)));
        fft.process(&mut self.scratch);

        self.scratch[..n / 2 + 1].iter().map(|c| c.norm()).collect()
    }
}

/// Decode little-endian `i16` samples
pub fn decode_samples(block: &[u8]) -> Result<Vec<i16>, AnalysisError> {
    if block.is_empty() {
        return Err(AnalysisError::EmptyBlock);
    }
    if block.len() % 2 != 0 {
        return Err(AnalysisError::OddLength(block.len()));
    }

    Ok(block
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Index of the first maximum
fn argmax(values: impl Iterator<Item = f64>) -> usize {
    let mut best_index = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (index, value) in values.enumerate() {
        if value > best_value {
            best_index = index;
            best_value = value;
        }
    }
    best_index
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn encode(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    fn sine_block(freq: f64, sample_rate: u32, n: usize, amplitude: f64) -> Vec<u8> {
        let samples: Vec<i16> = (0..n)
            .map(|i| (amplitude * (2.0 * PI * freq * i as f64 / sample_rate as f64).sin()).round() as i16)
            .collect();
        encode(&samples)
    }

    #[test]
    fn test_silence() {
        let mut analyzer = SpectrumAnalyzer::new(44100);
        let analysis = analyzer.analyze(&vec![0u8; 1024]).unwrap();

        assert_eq!(analysis, Analysis::silence());
        assert_eq!(analysis.peak_frequency, 0.0);
    }

    #[test]
    fn test_rejects_malformed_blocks() {
        let mut analyzer = SpectrumAnalyzer::new(44100);
        assert_eq!(analyzer.analyze(&[]), Err(AnalysisError::EmptyBlock));
        assert_eq!(analyzer.analyze(&[1, 2, 3]), Err(AnalysisError::OddLength(3)));
        assert_eq!(analyzer.blocks_analyzed(), 0);
    }

    #[test]
    fn test_levels() {
        let mut analyzer = SpectrumAnalyzer::new(8000);
        let analysis = analyzer.analyze(&encode(&[100, -300, 0, 200])).unwrap();

        assert_eq!(analysis.raw_level, 150.0);
        // 300 / 32767 * 255 = 2.33
        assert_eq!(analysis.peak_level, 2);
    }

    #[test]
    fn test_full_scale_peak_clamps() {
        let mut analyzer = SpectrumAnalyzer::new(8000);
        let analysis = analyzer.analyze(&encode(&[i16::MIN, i16::MAX])).unwrap();
        assert_eq!(analysis.peak_level, 255);
    }

    #[test]
    fn test_dc_block() {
        let mut analyzer = SpectrumAnalyzer::new(8000);
        let analysis = analyzer.analyze(&encode(&[1000; 64])).unwrap();

        assert_eq!(analysis.bands[0], 255);
        assert!(analysis.bands[1..].iter().all(|&b| b == 0));
        assert_eq!(analysis.peak_frequency, 0.0);
        assert!((analysis.magnitude_sum - 64_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_bin_aligned_sine() {
        // 16 kHz / 128 samples = 125 Hz per bin, so 1 kHz lands on bin 8
        let mut analyzer = SpectrumAnalyzer::new(16000);
        let analysis = analyzer.analyze(&sine_block(1000.0, 16000, 128, 16000.0)).unwrap();

        assert!((analysis.peak_frequency - 1000.0).abs() < 1e-9);
        assert_eq!(analysis.dominant_band(), 8);
        assert_eq!(analysis.bands[8], 255);
        assert_eq!(analysis.peak_level, 125);
    }

    #[test]
    fn test_unaligned_sine_within_one_bin() {
        let sample_rate = 44100;
        let n = 1024;
        let mut analyzer = SpectrumAnalyzer::new(sample_rate);
        let analysis = analyzer.analyze(&sine_block(1000.0, sample_rate, n, 12000.0)).unwrap();

        let bin_width = sample_rate as f64 / n as f64;
        assert!((analysis.peak_frequency - 1000.0).abs() <= bin_width);
    }

    #[test]
    fn test_short_block_pads_bands() {
        // 4 samples give 3 bins, the rest stay zero
        let mut analyzer = SpectrumAnalyzer::new(8000);
        let analysis = analyzer.analyze(&encode(&[1000, -1000, 1000, -1000])).unwrap();

        assert_eq!(analysis.bands[2], 255);
        assert_eq!(analysis.peak_frequency, 4000.0);
        assert!(analysis.bands[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_plan_reused_across_sizes() {
        let mut analyzer = SpectrumAnalyzer::new(8000);
        analyzer.analyze(&vec![0u8; 256]).unwrap();
        analyzer.analyze(&vec![0u8; 512]).unwrap();
        analyzer.analyze(&vec![0u8; 512]).unwrap();
        assert_eq!(analyzer.blocks_analyzed(), 3);
    }
}
