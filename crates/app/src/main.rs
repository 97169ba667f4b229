mod sources;

use std::{
    path::{Path, PathBuf},
    time::Instant,
};

use clap::{Parser, Subcommand};
use generative_visualiser_core::{
    AppConfig, CaptureTap, CompositionParams, FrameClock, LayerStack, Microphone, PresetLibrary,
    SceneRenderer, VisualizerError,
};
use tracing_subscriber::EnvFilter;

use crate::sources::{SyntheticCamera, SyntheticTone};

fn main() -> generative_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Live {
            preset,
            preset_name,
            frames,
            width,
            height,
            fps,
            seed,
        } => {
            let mut config = AppConfig::default();
            config.output.width = width;
            config.output.height = height;
            config.output.fps = fps;
            config.seed = seed;
            run_live(&config, preset.as_deref(), preset_name.as_deref(), frames)
        }
        Commands::Preset {
            output,
            name,
            layers,
        } => write_default_preset(&output, &name, layers),
    }
}

fn run_live(
    config: &AppConfig,
    preset_path: Option<&Path>,
    preset_name: Option<&str>,
    frames: Option<u64>,
) -> generative_visualiser_core::Result<()> {
    let (stack, composition) = load_scene(preset_path, preset_name)?;
    tracing::info!(
        layers = stack.len(),
        width = config.output.width,
        height = config.output.height,
        fps = config.output.fps,
        "starting live mode"
    );

    let mut renderer = SceneRenderer::from_config(config);
    let tap = CaptureTap::new();
    let capture = tap.handle();
    renderer.attach_sink(Box::new(tap));

    // Camera frames are sampled at a reduced size, the way a webcam feed
    // would arrive at a lower resolution than the output.
    let mut camera = SyntheticCamera::new(
        (config.output.width / 2).max(1),
        (config.output.height / 2).max(1),
    );
    let mut tone = SyntheticTone::new(Microphone::new(&config.audio)?, config.audio.fft_size);
    let mut clock = FrameClock::new(config.output.fps);

    let mut window_start = Instant::now();
    let mut window_frames = 0u32;
    loop {
        let index = clock.wait_next();
        if frames.is_some_and(|limit| index >= limit) {
            break;
        }

        tone.pump()?;
        renderer.render_frame(stack.layers(), &composition, &mut camera, tone.microphone_mut());
        window_frames += 1;

        if window_start.elapsed().as_secs_f32() >= 1.0 {
            let published = capture.latest()?.map(|frame| frame.index);
            tracing::info!(
                fps = window_frames as f32 / window_start.elapsed().as_secs_f32(),
                particles = renderer.particle_count(),
                audio = renderer.audio_level(),
                published = ?published,
                "frame stats"
            );
            window_start = Instant::now();
            window_frames = 0;
        }
    }

    tracing::info!(frames = renderer.frame_index(), "live mode finished");
    Ok(())
}

/// The layers and composition to render: a preset from disk, or one default
/// layer when no preset file is given.
fn load_scene(
    path: Option<&Path>,
    name: Option<&str>,
) -> generative_visualiser_core::Result<(LayerStack, CompositionParams)> {
    let Some(path) = path else {
        let mut stack = LayerStack::new();
        stack.add_layer();
        return Ok((stack, CompositionParams::default()));
    };

    let library = PresetLibrary::from_json(&std::fs::read_to_string(path)?)?;
    let preset = match name {
        Some(name) => library.get(name),
        None => library.presets().first(),
    }
    .ok_or_else(|| VisualizerError::msg(format!("no matching preset in {}", path.display())))?;

    if preset.data.layers.is_empty() {
        return Err(VisualizerError::msg(format!(
            "preset `{}` has no layers",
            preset.name
        )));
    }
    tracing::info!(preset = %preset.name, "loaded preset");
    Ok((
        LayerStack::from_layers(preset.data.layers.clone()),
        preset.data.composition_params.clone(),
    ))
}

fn write_default_preset(
    output: &Path,
    name: &str,
    layers: usize,
) -> generative_visualiser_core::Result<()> {
    let mut stack = LayerStack::new();
    for _ in 0..layers.max(1) {
        stack.add_layer();
    }
    let mut library = PresetLibrary::new();
    library.save(name, stack.layers(), &CompositionParams::default());
    std::fs::write(output, library.to_json()?)?;
    tracing::info!(?output, name, layers = stack.len(), "wrote preset library");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio and video reactive generative visuals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render live from the synthetic camera and microphone.
    Live {
        /// Preset library file to load layers from.
        #[arg(short, long)]
        preset: Option<PathBuf>,
        /// Name of the preset to use. Defaults to the first one in the file.
        #[arg(long, requires = "preset")]
        preset_name: Option<String>,
        /// Stop after this many frames.
        #[arg(short, long)]
        frames: Option<u64>,
        #[arg(long, default_value_t = 1280)]
        width: usize,
        #[arg(long, default_value_t = 720)]
        height: usize,
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Seed for particle spawning.
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Write a preset library containing one default preset.
    Preset {
        /// Path of the JSON file to write.
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long, default_value = "Default")]
        name: String,
        /// Number of default layers in the preset.
        #[arg(short, long, default_value_t = 1)]
        layers: usize,
    },
}
