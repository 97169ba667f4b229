//! Particle lifecycle for a single layer.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    color::Rgb,
    layer::{ColorMode, LayerParams},
    raster::Raster,
    sampler::CellView,
};

/// Per-axis bound of a particle's unit velocity.
const MAX_UNIT_SPEED: f32 = 1.5;
/// Smallest radius a particle can be spawned with.
pub const MIN_RADIUS: f32 = 0.5;

/// A single animated point.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub color: Rgb,
}

impl Particle {
    pub fn new(x: f32, y: f32, vx: f32, vy: f32, radius: f32, color: Rgb) -> Self {
        Self {
            x,
            y,
            vx,
            vy,
            radius: radius.max(MIN_RADIUS),
            color,
        }
    }

    /// Moves by the unit velocity scaled by `speed`.
    pub fn advance(&mut self, speed: f32) {
        self.x += self.vx * speed;
        self.y += self.vy * speed;
    }

    pub fn is_within(&self, width: f32, height: f32) -> bool {
        (0.0..=width).contains(&self.x) && (0.0..=height).contains(&self.y)
    }
}

/// Inputs that change every frame and feed particle spawning.
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext {
    /// The layer's rotating hue, in degrees.
    pub hue: f32,
    pub audio_effect: f32,
    pub surface_width: usize,
    pub surface_height: usize,
}

/// Colour for a new particle under `mode`.
pub fn spawn_color(mode: ColorMode, source: Rgb, hue: f32, audio_effect: f32) -> Rgb {
    match mode {
        ColorMode::Source => source,
        ColorMode::Rainbow => Rgb::from_hsl(hue, 1.0, 0.7),
        ColorMode::Monochrome => Rgb::ACCENT,
        ColorMode::AudioHue => Rgb::from_hsl((hue + audio_effect * 360.0) % 360.0, 1.0, 0.7),
        ColorMode::AudioPulse => Rgb::from_hsl(185.0, 1.0, 0.5 + audio_effect * 0.5),
    }
}

/// Radius before jitter: bigger for cells further above the threshold.
pub fn base_radius(brightness: f32, threshold: f32) -> f32 {
    let range = 255.0 - threshold;
    let range = if range == 0.0 { 1.0 } else { range };
    let normalized = ((brightness - threshold) / range).max(0.0);
    normalized * 4.0 + 1.0
}

/// The live particle set of one layer, oldest first.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    rng: ChaCha8Rng,
}

impl ParticleField {
    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Spawns from bright cells or drops the oldest particles until the field
    /// holds `params.particle_count` particles. Spawning silently does nothing
    /// when no cell is brighter than the threshold.
    pub fn reconcile(&mut self, params: &LayerParams, cells: &CellView<'_>, ctx: SpawnContext) {
        let target = params.particle_count.max(0) as usize;
        let current = self.particles.len();

        if current > target {
            self.particles.drain(..current - target);
            return;
        }
        if current == target || cells.frame_width() == 0 || cells.frame_height() == 0 {
            return;
        }

        let threshold = params.brightness_threshold;
        let bright = cells.bright_cells(threshold);
        if bright.is_empty() {
            return;
        }

        let scale_x = ctx.surface_width as f32 / cells.frame_width() as f32;
        let scale_y = ctx.surface_height as f32 / cells.frame_height() as f32;
        let half_cell = cells.stride() as f32 / 2.0;
        let max_x = cells.frame_width() as f32;
        let max_y = cells.frame_height() as f32;

        self.particles.reserve(target - current);
        for _ in current..target {
            let sampled = bright[self.rng.gen_range(0..bright.len())];
            let x = (sampled.frame_x as f32 + half_cell).min(max_x) * scale_x;
            let y = (sampled.frame_y as f32 + half_cell).min(max_y) * scale_y;

            let vx = self.rng.gen_range(-MAX_UNIT_SPEED..MAX_UNIT_SPEED);
            let vy = self.rng.gen_range(-MAX_UNIT_SPEED..MAX_UNIT_SPEED);
            let jitter = self.rng.gen_range(-1.0..1.0);
            let radius =
                base_radius(sampled.cell.brightness, threshold) + jitter + ctx.audio_effect * 5.0;
            let color = spawn_color(params.color_mode, sampled.cell.color, ctx.hue, ctx.audio_effect);

            self.particles.push(Particle::new(x, y, vx, vy, radius, color));
        }
    }

    /// Advances every particle and drops the ones that left the surface.
    pub fn step(&mut self, speed: f32, width: f32, height: f32) {
        self.particles.retain_mut(|particle| {
            particle.advance(speed);
            particle.is_within(width, height)
        });
    }

    /// Draws every particle mirrored left to right.
    pub fn draw(&self, surface: &mut Raster) {
        let width = surface.width() as f32;
        for particle in &self.particles {
            surface.fill_disc(width - particle.x, particle.y, particle.radius, particle.color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sampler::CellGrid, video::VideoFrame};

    fn ctx() -> SpawnContext {
        SpawnContext {
            hue: 0.0,
            audio_effect: 0.0,
            surface_width: 40,
            surface_height: 40,
        }
    }

    fn params(count: i32) -> LayerParams {
        LayerParams {
            particle_count: count,
            ..LayerParams::default()
        }
    }

    #[test]
    fn dark_frames_spawn_nothing() {
        let grid = CellGrid::sample(&VideoFrame::solid(40, 40, Rgb::default()), 2);
        let mut field = ParticleField::new(1);
        field.reconcile(&params(1000), &grid.view(2), ctx());
        assert!(field.is_empty());
    }

    #[test]
    fn bright_frames_fill_to_target() {
        let grid = CellGrid::sample(&VideoFrame::solid(40, 40, Rgb::WHITE), 4);
        let mut field = ParticleField::new(1);
        field.reconcile(&params(250), &grid.view(4), ctx());
        assert_eq!(field.len(), 250);
        for particle in field.particles() {
            assert!(particle.radius >= MIN_RADIUS);
            assert!(particle.vx.abs() <= MAX_UNIT_SPEED && particle.vy.abs() <= MAX_UNIT_SPEED);
            assert!(particle.is_within(40.0, 40.0));
            assert_eq!(particle.color, Rgb::WHITE);
        }
    }

    #[test]
    fn lowering_the_target_drops_oldest_first() {
        let grid = CellGrid::sample(&VideoFrame::solid(8, 8, Rgb::WHITE), 2);
        let mut field = ParticleField::new(3);
        for i in 0..5 {
            field.push(Particle::new(i as f32, 0.0, 0.0, 0.0, 1.0, Rgb::WHITE));
        }
        field.reconcile(&params(2), &grid.view(2), ctx());
        let xs: Vec<f32> = field.particles().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![3.0, 4.0]);

        field.reconcile(&params(-10), &grid.view(2), ctx());
        assert!(field.is_empty());
    }

    #[test]
    fn step_removes_every_escaping_particle() {
        let mut field = ParticleField::new(0);
        // Adjacent escapees used to be skipped by remove-while-iterating.
        field.push(Particle::new(9.5, 5.0, 1.0, 0.0, 1.0, Rgb::WHITE));
        field.push(Particle::new(9.5, 5.0, 1.0, 0.0, 1.0, Rgb::WHITE));
        field.push(Particle::new(5.0, 5.0, 1.0, 0.0, 1.0, Rgb::WHITE));
        field.push(Particle::new(0.2, 5.0, -1.0, 0.0, 1.0, Rgb::WHITE));
        field.step(1.0, 10.0, 10.0);
        assert_eq!(field.len(), 1);
        assert_eq!(field.particles()[0].x, 6.0);
    }

    #[test]
    fn same_seed_spawns_the_same_field() {
        let grid = CellGrid::sample(&VideoFrame::solid(30, 30, Rgb::new(200, 180, 160)), 3);
        let mut a = ParticleField::new(42);
        let mut b = ParticleField::new(42);
        a.reconcile(&params(64), &grid.view(3), ctx());
        b.reconcile(&params(64), &grid.view(3), ctx());
        assert_eq!(a.particles(), b.particles());
    }

    #[test]
    fn draw_mirrors_horizontally() {
        let mut field = ParticleField::new(0);
        field.push(Particle::new(2.0, 5.0, 0.0, 0.0, 1.0, Rgb::WHITE));
        let mut surface = Raster::new(20, 10);
        field.draw(&mut surface);
        assert!(surface.pixel(17, 4).a > 0.0);
        assert!(surface.pixel(1, 4).is_transparent());
    }

    #[test]
    fn colour_modes() {
        let source = Rgb::new(1, 2, 3);
        assert_eq!(spawn_color(ColorMode::Source, source, 10.0, 0.0), source);
        assert_eq!(spawn_color(ColorMode::Monochrome, source, 10.0, 0.5), Rgb::ACCENT);
        assert_eq!(
            spawn_color(ColorMode::Rainbow, source, 120.0, 0.0),
            Rgb::from_hsl(120.0, 1.0, 0.7)
        );
        assert_eq!(
            spawn_color(ColorMode::AudioHue, source, 300.0, 0.25),
            Rgb::from_hsl(30.0, 1.0, 0.7)
        );
        assert_eq!(spawn_color(ColorMode::AudioPulse, source, 0.0, 1.0), Rgb::WHITE);
    }

    #[test]
    fn radius_grows_with_brightness_above_threshold() {
        assert_eq!(base_radius(50.0, 50.0), 1.0);
        assert_eq!(base_radius(255.0, 50.0), 5.0);
        assert_eq!(base_radius(255.0, 255.0), 1.0);
    }
}
