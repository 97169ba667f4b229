//! Core library for the generative visualiser.
//!
//! Each frame the camera image is sampled into a brightness grid and the
//! microphone spectrum is reduced to one energy value. Every visible layer then
//! spawns and moves particles from bright cells, feeds them into its own
//! recursive feedback surface, and is composited onto the output with its blend
//! mode, hue rotation and optional kaleidoscope. A global tint finishes the
//! frame.

pub mod analysis;
pub mod audio;
pub mod capture;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod feedback;
pub mod layer;
pub mod particles;
pub mod raster;
pub mod render;
pub mod sampler;
pub mod timeline;
pub mod video;

pub use analysis::{audio_level, SpectrumAnalyser, AUDIO_REFERENCE_LEVEL};
pub use audio::{AudioSource, Microphone, Silence};
pub use capture::{CaptureHandle, CaptureTap, CapturedFrame, FrameSink};
pub use color::{HueRotation, Rgb, Rgba};
pub use compositor::{composite_layer, CompositeSettings, Kaleidoscope};
pub use config::{
    AppConfig, AudioConfig, CompositionParams, OutputConfig, Preset, PresetData, PresetLibrary,
};
pub use error::{Result, VisualizerError};
pub use feedback::{FeedbackSurface, FeedbackTransform};
pub use layer::{ColorMode, Layer, LayerId, LayerParams, LayerStack};
pub use particles::{Particle, ParticleField, SpawnContext};
pub use raster::{BlendMode, Raster};
pub use render::{LayerState, SceneRenderer};
pub use sampler::{Cell, CellGrid, CellView, SampledCell};
pub use timeline::FrameClock;
pub use video::{VideoFrame, VideoSource};
