//! Per-frame orchestration of every layer into the output raster.

use std::collections::HashMap;

use crate::{
    analysis::audio_level,
    audio::AudioSource,
    capture::FrameSink,
    compositor::{composite_layer, CompositeSettings},
    config::{AppConfig, CompositionParams},
    feedback::{FeedbackSurface, FeedbackTransform},
    layer::{Layer, LayerId},
    particles::{ParticleField, SpawnContext},
    raster::Raster,
    sampler::{clamp_stride, CellGrid},
    video::{VideoFrame, VideoSource},
};

/// Degrees each visible layer's hue advances per frame.
pub const HUE_STEP: f32 = 0.5;
/// Opacity of the camera underlay when `show_video` is set.
pub const VIDEO_UNDERLAY_ALPHA: f32 = 0.2;

/// Runtime state owned by one layer for as long as it exists.
#[derive(Debug, Clone)]
pub struct LayerState {
    field: ParticleField,
    surface: FeedbackSurface,
    hue: f32,
}

impl LayerState {
    fn new(width: usize, height: usize, seed: u64) -> Self {
        Self {
            field: ParticleField::new(seed),
            surface: FeedbackSurface::new(width, height),
            hue: 0.0,
        }
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn surface(&self) -> &FeedbackSurface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut FeedbackSurface {
        &mut self.surface
    }

    /// Rotating hue in degrees, always in `[0, 360)`.
    pub fn hue(&self) -> f32 {
        self.hue
    }
}

/// Drives the whole pipeline once per output frame.
pub struct SceneRenderer {
    width: usize,
    height: usize,
    pending_size: Option<(usize, usize)>,
    output: Raster,
    seed: u64,
    layers_seen: u64,
    states: HashMap<LayerId, LayerState>,
    frame: Option<VideoFrame>,
    grid: CellGrid,
    grid_stale: bool,
    audio_level: f32,
    frame_index: u64,
    sinks: Vec<Box<dyn FrameSink>>,
}

impl SceneRenderer {
    pub fn new(width: usize, height: usize, seed: u64) -> Self {
        Self {
            width,
            height,
            pending_size: None,
            output: Raster::new(width, height),
            seed,
            layers_seen: 0,
            states: HashMap::new(),
            frame: None,
            grid: CellGrid::empty(),
            grid_stale: false,
            audio_level: 0.0,
            frame_index: 0,
            sinks: Vec::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.output.width, config.output.height, config.seed)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// The last presented frame.
    pub fn output(&self) -> &Raster {
        &self.output
    }

    /// Number of frames rendered so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Normalised audio energy of the last frame, `[0, 1]`.
    pub fn audio_level(&self) -> f32 {
        self.audio_level
    }

    pub fn layer_state(&self, id: &LayerId) -> Option<&LayerState> {
        self.states.get(id)
    }

    pub fn layer_state_mut(&mut self, id: &LayerId) -> Option<&mut LayerState> {
        self.states.get_mut(id)
    }

    /// Total live particles across all layers.
    pub fn particle_count(&self) -> usize {
        self.states.values().map(|state| state.field.len()).sum()
    }

    pub fn attach_sink(&mut self, sink: Box<dyn FrameSink>) {
        self.sinks.push(sink);
    }

    /// Requests a new output size. Takes effect at the next frame boundary and
    /// resets every layer's surface and particles.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.pending_size = Some((width, height));
    }

    /// Drops all particles and feedback content, keeping layer identities.
    pub fn reset(&mut self) {
        for state in self.states.values_mut() {
            state.field.clear();
            state.surface = FeedbackSurface::new(self.width, self.height);
        }
    }

    /// Creates state for new layers and drops state of removed ones.
    pub fn sync_layers(&mut self, layers: &[Layer]) {
        self.states
            .retain(|id, _| layers.iter().any(|layer| &layer.id == id));

        for layer in layers {
            if self.states.contains_key(&layer.id) {
                continue;
            }
            self.layers_seen += 1;
            let seed = self
                .seed
                .wrapping_add(self.layers_seen.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            tracing::debug!(layer = %layer.id, name = %layer.name, "creating layer state");
            self.states
                .insert(layer.id.clone(), LayerState::new(self.width, self.height, seed));
        }
    }

    /// Pulls the latest samples from the sources and renders one frame.
    pub fn render_frame(
        &mut self,
        layers: &[Layer],
        composition: &CompositionParams,
        video: &mut dyn VideoSource,
        audio: &mut dyn AudioSource,
    ) -> &Raster {
        let frame = video.latest_frame();
        let spectrum = audio.latest_spectrum();
        self.render(layers, composition, frame, spectrum.as_deref())
    }

    /// Renders one frame from already captured samples. A missing frame reuses
    /// the previous one; a missing spectrum counts as silence.
    pub fn render(
        &mut self,
        layers: &[Layer],
        composition: &CompositionParams,
        frame: Option<VideoFrame>,
        spectrum: Option<&[u8]>,
    ) -> &Raster {
        self.apply_pending_resize();
        self.sync_layers(layers);

        self.audio_level = match spectrum {
            Some(spectrum) => audio_level(spectrum).min(1.0),
            None => {
                tracing::trace!("no audio spectrum, treating as silence");
                0.0
            }
        };

        match frame {
            Some(frame) => {
                self.frame = Some(frame);
                self.grid_stale = true;
            }
            None => tracing::trace!("no new video frame, reusing previous analysis"),
        }
        self.refresh_grid(layers);

        self.output.clear();
        if composition.show_video {
            if let Some(frame) = &self.frame {
                self.output.draw_video(frame, VIDEO_UNDERLAY_ALPHA);
            }
        }

        let (width, height) = (self.width as f32, self.height as f32);
        for layer in layers.iter().filter(|layer| layer.is_visible) {
            let Some(state) = self.states.get_mut(&layer.id) else {
                continue;
            };
            let params = &layer.params;
            let audio_effect = self.audio_level * params.audio_intensity;

            state
                .surface
                .apply_feedback(&FeedbackTransform::for_layer(params, audio_effect));

            let view = self.grid.view(clamp_stride(params.resolution));
            let ctx = SpawnContext {
                hue: state.hue,
                audio_effect,
                surface_width: self.width,
                surface_height: self.height,
            };
            state.field.reconcile(params, &view, ctx);
            state.field.step(params.particle_speed, width, height);
            state.field.draw(state.surface.raster_mut());

            composite_layer(
                state.surface.raster(),
                &mut self.output,
                &CompositeSettings::for_layer(layer, audio_effect),
            );

            state.hue = (state.hue + HUE_STEP) % 360.0;
        }

        self.output.multiply_tint(composition.color_tint);

        for sink in &mut self.sinks {
            sink.present(&self.output, self.frame_index);
        }
        self.frame_index += 1;
        &self.output
    }

    fn apply_pending_resize(&mut self) {
        let Some((width, height)) = self.pending_size.take() else {
            return;
        };
        tracing::info!(width, height, "resizing output, resetting layer state");
        self.width = width;
        self.height = height;
        self.output = Raster::new(width, height);
        self.reset();
    }

    /// Resamples the stored frame when it changed or the finest stride any
    /// visible layer needs is different from the current grid's.
    fn refresh_grid(&mut self, layers: &[Layer]) {
        let Some(stride) = layers
            .iter()
            .filter(|layer| layer.is_visible)
            .map(|layer| clamp_stride(layer.params.resolution))
            .min()
        else {
            return;
        };
        let Some(frame) = &self.frame else {
            return;
        };
        if self.grid_stale || self.grid.stride() != stride || self.grid.is_empty() {
            self.grid = CellGrid::sample(frame, stride);
            self.grid_stale = false;
        }
    }
}

impl std::fmt::Debug for SceneRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layers", &self.states.len())
            .field("frame_index", &self.frame_index)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
