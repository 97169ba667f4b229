//! Stand-in capture devices so the pipeline can run without hardware.

use std::f32::consts::TAU;

use generative_visualiser_core::{Microphone, Result, Rgb, VideoFrame, VideoSource};

/// A drifting bright blob over a dim gradient.
#[derive(Debug)]
pub struct SyntheticCamera {
    width: usize,
    height: usize,
    tick: u64,
}

impl SyntheticCamera {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tick: 0,
        }
    }

    fn render(&self) -> VideoFrame {
        let t = self.tick as f32 / 60.0;
        let (w, h) = (self.width as f32, self.height as f32);
        let cx = w * (0.5 + 0.3 * (t * 0.7).sin());
        let cy = h * (0.5 + 0.25 * (t * 1.1).cos());
        let radius = w.min(h) * 0.18;

        let mut frame = VideoFrame::solid(self.width, self.height, Rgb::default());
        for y in 0..self.height {
            for x in 0..self.width {
                let base = (x as f32 / w * 40.0) as u8;
                let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
                let glow = (1.0 - d / radius).clamp(0.0, 1.0);
                let lift = |peak: f32| (base as f32 + glow * peak).min(255.0) as u8;
                frame.set_pixel(x, y, Rgb::new(lift(230.0), lift(190.0), lift(250.0)));
            }
        }
        frame
    }
}

impl VideoSource for SyntheticCamera {
    fn latest_frame(&mut self) -> Option<VideoFrame> {
        self.tick += 1;
        Some(self.render())
    }
}

/// Feeds a pulsing tone into a [`Microphone`], one block per rendered frame.
#[derive(Debug)]
pub struct SyntheticTone {
    microphone: Microphone,
    block: Vec<f32>,
    phase: f32,
    tick: u64,
}

impl SyntheticTone {
    pub fn new(microphone: Microphone, block_size: usize) -> Self {
        Self {
            microphone,
            block: vec![0.0; block_size],
            phase: 0.0,
            tick: 0,
        }
    }

    /// Generates and pushes the next block of samples.
    pub fn pump(&mut self) -> Result<()> {
        let sample_rate = self.microphone.sample_rate() as f32;
        // Two beats per second at 60 fps.
        let envelope = ((self.tick as f32 / 30.0 * TAU).sin() * 0.5 + 0.5).powi(2);
        let frequency = 220.0 + 110.0 * ((self.tick as f32 / 240.0) * TAU).sin();
        let step = frequency / sample_rate * TAU;

        for sample in &mut self.block {
            *sample = self.phase.sin() * envelope;
            self.phase = (self.phase + step) % TAU;
        }
        self.tick += 1;
        self.microphone.push_samples(&self.block)
    }

    pub fn microphone_mut(&mut self) -> &mut Microphone {
        &mut self.microphone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use generative_visualiser_core::{AudioConfig, AudioSource};

    #[test]
    fn camera_has_a_bright_region() {
        let mut camera = SyntheticCamera::new(64, 48);
        let frame = camera.latest_frame().unwrap();
        let brightest = (0..48)
            .flat_map(|y| (0..64).map(move |x| (x, y)))
            .map(|(x, y)| frame.pixel(x, y).brightness())
            .fold(0.0f32, f32::max);
        assert!(brightest > 150.0);
    }

    #[test]
    fn tone_produces_a_spectrum() {
        let config = AudioConfig::default();
        let mut tone = SyntheticTone::new(Microphone::new(&config).unwrap(), config.fft_size);
        for _ in 0..8 {
            tone.pump().unwrap();
        }
        let spectrum = tone.microphone_mut().latest_spectrum().unwrap();
        assert!(spectrum.iter().any(|&bin| bin > 0));
    }
}
