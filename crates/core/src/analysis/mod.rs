use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::AudioConfig, Result, VisualizerError};

/// Spectrum mean that maps to an audio level of 1.0.
///
/// Dividing by a fixed ceiling rather than the buffer's own peak keeps levels
/// comparable from one frame to the next.
pub const AUDIO_REFERENCE_LEVEL: f32 = 128.0;

/// Reduces a byte spectrum to a single energy value. The result is not
/// clamped; callers cap it at 1.0.
pub fn audio_level(spectrum: &[u8]) -> f32 {
    if spectrum.is_empty() {
        return 0.0;
    }
    let sum: u32 = spectrum.iter().map(|&bin| bin as u32).sum();
    sum as f32 / spectrum.len() as f32 / AUDIO_REFERENCE_LEVEL
}

/// Turns PCM blocks into a fixed-length byte spectrum with smoothing and
/// decibel scaling, the format the renderer consumes.
pub struct SpectrumAnalyser {
    fft_size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
    has_data: bool,
    fft: FftResources,
}

impl SpectrumAnalyser {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        let fft_size = config.fft_size;
        if fft_size < 32 || !fft_size.is_power_of_two() {
            return Err(VisualizerError::InvalidInput(
                "fft size must be a power of two of at least 32",
            ));
        }
        if config.min_decibels >= config.max_decibels {
            return Err(VisualizerError::InvalidInput(
                "min decibels must be below max decibels",
            ));
        }

        let bins = fft_size / 2;
        Ok(Self {
            fft_size,
            smoothing: config.smoothing.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window: (0..fft_size).map(|i| blackman_value(i, fft_size)).collect(),
            smoothed: vec![0.0; bins],
            bytes: vec![0; bins],
            has_data: false,
            fft: FftResources::new(fft_size),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins in the byte spectrum.
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Analyses the most recent `fft_size` samples of `samples`. Shorter
    /// blocks are zero padded at the front.
    pub fn process_block(&mut self, samples: &[f32]) -> Result<&[u8]> {
        if samples.is_empty() {
            return Err(VisualizerError::InvalidInput(
                "analysis requires at least one sample",
            ));
        }

        let tail = &samples[samples.len().saturating_sub(self.fft_size)..];
        let offset = self.fft_size - tail.len();
        self.fft.input.fill(0.0);
        for (index, value) in tail.iter().enumerate() {
            let slot = offset + index;
            self.fft.input[slot] = value * self.window[slot];
        }

        self.fft.plan.process_with_scratch(
            &mut self.fft.input,
            &mut self.fft.spectrum,
            &mut self.fft.scratch,
        )?;

        let scale = 1.0 / self.fft_size as f32;
        let range = self.max_decibels - self.min_decibels;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.fft.spectrum[bin].norm() * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            let decibels = if *smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            let scaled = 255.0 / range * (decibels - self.min_decibels);
            self.bytes[bin] = scaled.clamp(0.0, 255.0) as u8;
        }

        self.has_data = true;
        Ok(self.bytes.as_slice())
    }

    /// The latest byte spectrum, or `None` before the first block.
    pub fn byte_spectrum(&self) -> Option<&[u8]> {
        self.has_data.then_some(self.bytes.as_slice())
    }

    /// Forgets smoothing history and the last spectrum.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
        self.bytes.fill(0);
        self.has_data = false;
    }
}

struct FftResources {
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl FftResources {
    fn new(size: usize) -> Self {
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        Self {
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        }
    }
}

impl fmt::Debug for SpectrumAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpectrumAnalyser")
            .field("fft_size", &self.fft_size)
            .field("smoothing", &self.smoothing)
            .field("min_decibels", &self.min_decibels)
            .field("max_decibels", &self.max_decibels)
            .field("has_data", &self.has_data)
            .finish()
    }
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let x = index as f32 / len as f32;
    a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(frequency: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn level_is_mean_over_reference() {
        assert_eq!(audio_level(&[]), 0.0);
        assert_eq!(audio_level(&[128; 64]), 1.0);
        assert_eq!(audio_level(&[64, 0]), 0.25);
        assert!(audio_level(&[255; 8]) > 1.0);
    }

    #[test]
    fn silence_maps_to_zero_bytes() {
        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default()).unwrap();
        assert!(analyser.byte_spectrum().is_none());
        let bytes = analyser.process_block(&[0.0; 256]).unwrap();
        assert_eq!(bytes.len(), 128);
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_near_its_bin() {
        let config = AudioConfig {
            smoothing: 0.0,
            ..AudioConfig::default()
        };
        let mut analyser = SpectrumAnalyser::new(&config).unwrap();
        let sample_rate = config.sample_rate as f32;
        // Bin 16 of a 256 point FFT.
        let frequency = 16.0 * sample_rate / 256.0;
        let bytes = analyser.process_block(&tone(frequency, sample_rate, 256)).unwrap();

        let peak = bytes
            .iter()
            .enumerate()
            .max_by_key(|&(_, &b)| b)
            .map(|(i, _)| i)
            .unwrap();
        assert!((15..=17).contains(&peak));
        assert!(bytes[16] > 200);
        assert!(audio_level(bytes) > 0.0);
    }

    #[test]
    fn smoothing_carries_energy_into_silence() {
        let config = AudioConfig::default();
        let mut analyser = SpectrumAnalyser::new(&config).unwrap();
        let sample_rate = config.sample_rate as f32;
        analyser.process_block(&tone(3000.0, sample_rate, 256)).unwrap();
        let after_silence = analyser.process_block(&[0.0; 256]).unwrap();
        assert!(after_silence.iter().any(|&b| b > 0));

        analyser.reset();
        assert!(analyser.byte_spectrum().is_none());
    }

    #[test]
    fn rejects_bad_configuration() {
        let odd = AudioConfig {
            fft_size: 100,
            ..AudioConfig::default()
        };
        assert!(SpectrumAnalyser::new(&odd).is_err());

        let inverted = AudioConfig {
            min_decibels: -10.0,
            max_decibels: -20.0,
            ..AudioConfig::default()
        };
        assert!(SpectrumAnalyser::new(&inverted).is_err());

        let mut analyser = SpectrumAnalyser::new(&AudioConfig::default()).unwrap();
        assert!(analyser.process_block(&[]).is_err());
    }
}
