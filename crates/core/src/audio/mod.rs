use std::sync::{Arc, Mutex, MutexGuard};

use crate::{config::AudioConfig, Result, SpectrumAnalyser, VisualizerError};

/// Pull-only access to the current frequency spectrum, one byte per bin.
///
/// `None` means no microphone is attached or nothing has been captured yet;
/// the renderer then treats audio energy as zero.
pub trait AudioSource {
    fn latest_spectrum(&mut self) -> Option<Vec<u8>>;
}

/// Thread-safe microphone façade. A capture thread pushes PCM blocks while the
/// render loop reads the most recent spectrum.
#[derive(Debug, Clone)]
pub struct Microphone {
    sample_rate: u32,
    analyser: Arc<Mutex<SpectrumAnalyser>>,
}

impl Microphone {
    pub fn new(config: &AudioConfig) -> Result<Self> {
        Ok(Self {
            sample_rate: config.sample_rate,
            analyser: Arc::new(Mutex::new(SpectrumAnalyser::new(config)?)),
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Feeds a block of PCM samples into the analyser.
    pub fn push_samples(&self, samples: &[f32]) -> Result<()> {
        if samples.is_empty() {
            return Ok(());
        }
        let mut analyser = self.lock()?;
        analyser.process_block(samples)?;
        Ok(())
    }

    /// Copy of the latest byte spectrum.
    pub fn spectrum(&self) -> Result<Option<Vec<u8>>> {
        let analyser = self.lock()?;
        Ok(analyser.byte_spectrum().map(<[u8]>::to_vec))
    }

    /// Drops the captured history, as if the microphone was just attached.
    pub fn reset(&self) -> Result<()> {
        self.lock()?.reset();
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, SpectrumAnalyser>> {
        self.analyser
            .lock()
            .map_err(|_| VisualizerError::msg("spectrum analyser has been poisoned"))
    }
}

impl AudioSource for Microphone {
    fn latest_spectrum(&mut self) -> Option<Vec<u8>> {
        match self.spectrum() {
            Ok(spectrum) => spectrum,
            Err(err) => {
                tracing::warn!(%err, "microphone unavailable, treating audio as silent");
                None
            }
        }
    }
}

/// A source that never has audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl AudioSource for Silence {
    fn latest_spectrum(&mut self) -> Option<Vec<u8>> {
        None
    }
}
