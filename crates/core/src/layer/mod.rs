//! Layer records and the ordered stack the renderer composites.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::raster::BlendMode;

/// How freshly spawned particles pick their colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorMode {
    /// The colour of the camera pixel the particle spawned from.
    #[default]
    Source,
    Rainbow,
    Monochrome,
    AudioHue,
    AudioPulse,
}

/// Tunable parameters of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerParams {
    /// Target particle count. Negative values behave like zero.
    pub particle_count: i32,
    pub particle_speed: f32,
    /// Spawn threshold against raw cell brightness, `[0, 255]`.
    pub brightness_threshold: f32,
    /// Sampling stride in camera pixels, clamped to at least 2.
    pub resolution: u32,
    /// Opacity of last frame's content when redrawn, `[0, 1]`.
    pub feedback_amount: f32,
    pub feedback_scale: f32,
    /// Radians per frame.
    pub feedback_rotate: f32,
    pub feedback_translate_x: f32,
    pub feedback_translate_y: f32,
    pub kaleidoscope_slices: f32,
    pub color_mode: ColorMode,
    /// Degrees.
    pub hue_shift: f32,
    pub audio_intensity: f32,
}

impl Default for LayerParams {
    fn default() -> Self {
        Self {
            particle_count: 5000,
            particle_speed: 0.5,
            brightness_threshold: 50.0,
            resolution: 10,
            feedback_amount: 0.96,
            feedback_scale: 1.0,
            feedback_rotate: 0.0,
            feedback_translate_x: 0.0,
            feedback_translate_y: 0.0,
            kaleidoscope_slices: 1.0,
            color_mode: ColorMode::Source,
            hue_shift: 0.0,
            audio_intensity: 0.4,
        }
    }
}

/// Stable identifier of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub is_visible: bool,
    pub blend_mode: BlendMode,
    pub params: LayerParams,
}

impl Layer {
    /// A visible, additive layer with default parameters.
    pub fn new(id: LayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_visible: true,
            blend_mode: BlendMode::Add,
            params: LayerParams::default(),
        }
    }
}

/// Ordered list of layers. Index 0 is composited first, so later layers land
/// on top.
#[derive(Debug, Clone, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    next_id: u64,
}

impl LayerStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing layers, e.g. ones loaded from a preset.
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        Self {
            next_id: layers.len() as u64,
            layers,
        }
    }

    /// Returns the layers in draw order, bottom first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the layer with `id`, if it is still in the stack.
    pub fn get(&self, id: &LayerId) -> Option<&Layer> {
        self.layers.iter().find(|layer| &layer.id == id)
    }

    fn index_of(&self, id: &LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| &layer.id == id)
    }

    /// Appends a default layer named after its position and returns its id.
    pub fn add_layer(&mut self) -> LayerId {
        let id = loop {
            self.next_id += 1;
            let candidate = LayerId::new(format!("layer_{}", self.next_id));
            if self.get(&candidate).is_none() {
                break candidate;
            }
        };
        let name = format!("Layer {}", self.layers.len() + 1);
        self.layers.push(Layer::new(id.clone(), name));
        id
    }

    /// Removes a layer. The last remaining layer is never removed.
    pub fn remove_layer(&mut self, id: &LayerId) -> Option<Layer> {
        if self.layers.len() <= 1 {
            return None;
        }
        let index = self.index_of(id)?;
        Some(self.layers.remove(index))
    }

    /// Moves a layer to `new_index`, clamped to the end of the stack.
    pub fn move_layer(&mut self, id: &LayerId, new_index: usize) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        let layer = self.layers.remove(index);
        let new_index = new_index.min(self.layers.len());
        self.layers.insert(new_index, layer);
        true
    }

    /// Shows or hides a layer. Returns `false` for an unknown id.
    pub fn set_visible(&mut self, id: &LayerId, visible: bool) -> bool {
        self.layer_mut(id)
            .map(|layer| layer.is_visible = visible)
            .is_some()
    }

    /// Changes how a layer merges into the output. Returns `false` for an unknown id.
    pub fn set_blend_mode(&mut self, id: &LayerId, mode: BlendMode) -> bool {
        self.layer_mut(id)
            .map(|layer| layer.blend_mode = mode)
            .is_some()
    }

    /// Returns the tunable parameters of the layer with `id`.
    pub fn params_mut(&mut self, id: &LayerId) -> Option<&mut LayerParams> {
        self.layer_mut(id).map(|layer| &mut layer.params)
    }

    pub fn layer_mut(&mut self, id: &LayerId) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| &layer.id == id)
    }
}
