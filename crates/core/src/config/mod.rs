use serde::{Deserialize, Serialize};

use crate::{color::Rgb, layer::Layer, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output: OutputConfig,
    pub audio: AudioConfig,
    /// Seed for particle spawning.
    pub seed: u64,
}

/// Size and pacing of the output raster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub width: usize,
    pub height: usize,
    pub fps: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 60,
        }
    }
}

/// Configuration specific to the audio subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// FFT length. The spectrum has half as many bins.
    pub fft_size: usize,
    /// Weight of the previous spectrum when smoothing, `[0, 1]`.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            fft_size: 256,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

/// Settings that apply to the whole output rather than a single layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositionParams {
    /// Draw the raw camera frame faintly underneath all layers.
    pub show_video: bool,
    /// Multiplied over the final frame. White leaves it untouched.
    pub color_tint: Rgb,
}

impl Default for CompositionParams {
    fn default() -> Self {
        Self {
            show_video: false,
            color_tint: Rgb::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetData {
    pub layers: Vec<Layer>,
    pub composition_params: CompositionParams,
}

/// A named bundle of layers and composition settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub data: PresetData,
}

/// Ordered collection of presets, stored as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresetLibrary {
    presets: Vec<Preset>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presets(&self) -> &[Preset] {
        &self.presets
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|preset| preset.name == name)
    }

    /// Stores a preset, replacing one with the same name in place.
    pub fn save(
        &mut self,
        name: impl Into<String>,
        layers: &[Layer],
        composition: &CompositionParams,
    ) -> &Preset {
        let preset = Preset {
            name: name.into(),
            data: PresetData {
                layers: layers.to_vec(),
                composition_params: composition.clone(),
            },
        };
        let index = match self.presets.iter().position(|p| p.name == preset.name) {
            Some(index) => {
                self.presets[index] = preset;
                index
            }
            None => {
                self.presets.push(preset);
                self.presets.len() - 1
            }
        };
        &self.presets[index]
    }

    pub fn delete(&mut self, name: &str) -> Option<Preset> {
        let index = self.presets.iter().position(|p| p.name == name)?;
        Some(self.presets.remove(index))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
