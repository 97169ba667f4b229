//! Merging a layer's feedback surface into the shared output.

use std::f64::consts::TAU;

use kurbo::{Affine, Point};

use crate::{
    color::{HueRotation, Rgba},
    layer::Layer,
    raster::{BlendMode, Raster},
};

/// Clip radius of a kaleidoscope wedge, as a multiple of the output width.
const WEDGE_RADIUS: f64 = 1.5;

/// How one layer is merged into the output this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeSettings {
    pub blend_mode: BlendMode,
    /// Hue rotation in degrees.
    pub hue_degrees: f32,
    /// Values at or below one disable the kaleidoscope.
    pub kaleidoscope_slices: f32,
}

impl CompositeSettings {
    pub fn for_layer(layer: &Layer, audio_effect: f32) -> Self {
        Self {
            blend_mode: layer.blend_mode,
            hue_degrees: layer.params.hue_shift + audio_effect * 180.0,
            kaleidoscope_slices: layer.params.kaleidoscope_slices,
        }
    }
}

/// Angular partition of the output into mirrored wedges.
#[derive(Debug, Clone)]
pub struct Kaleidoscope {
    slices: usize,
    wedge_angle: f64,
    center: Point,
    radius: f64,
    /// Output-to-wedge-local transform for every wedge.
    inverses: Vec<Affine>,
}

impl Kaleidoscope {
    /// Returns `None` unless at least two whole slices are requested.
    pub fn new(slices: f32, width: usize, height: usize) -> Option<Self> {
        if !slices.is_finite() || slices < 2.0 {
            return None;
        }
        let slices = slices.floor() as usize;

        let wedge_angle = TAU / slices as f64;
        let center = Point::new(width as f64 / 2.0, height as f64 / 2.0);
        let inverses = (0..slices)
            .map(|i| {
                let mut forward =
                    Affine::translate(center.to_vec2()) * Affine::rotate(i as f64 * wedge_angle);
                if i % 2 == 1 {
                    forward = forward * Affine::scale_non_uniform(1.0, -1.0);
                }
                forward.inverse()
            })
            .collect();

        Some(Self {
            slices,
            wedge_angle,
            center,
            radius: width as f64 * WEDGE_RADIUS,
            inverses,
        })
    }

    pub fn slices(&self) -> usize {
        self.slices
    }

    /// Index of the wedge covering output point `p`.
    pub fn wedge_of(&self, p: Point) -> usize {
        let v = p - self.center;
        let index = (v.y.atan2(v.x) / self.wedge_angle).round() as i64;
        index.rem_euclid(self.slices as i64) as usize
    }

    /// The surface point drawn at output point `p`, if `p` is inside a wedge.
    pub fn source_point(&self, p: Point) -> Option<Point> {
        if (p - self.center).hypot() > self.radius {
            return None;
        }
        let local = self.inverses[self.wedge_of(p)] * p;
        Some(local + self.center.to_vec2())
    }
}

/// Merges `surface` into `output` with the layer's hue rotation, kaleidoscope
/// and blend mode.
pub fn composite_layer(surface: &Raster, output: &mut Raster, settings: &CompositeSettings) {
    let hue = HueRotation::new(settings.hue_degrees);
    let filter = |color: Rgba| match &hue {
        Some(rotation) => rotation.apply(color),
        None => color,
    };

    match Kaleidoscope::new(settings.kaleidoscope_slices, output.width(), output.height()) {
        None => {
            let width = surface.width().min(output.width());
            let height = surface.height().min(output.height());
            for y in 0..height {
                for x in 0..width {
                    let color = surface.pixel(x, y);
                    if !color.is_transparent() {
                        output.blend_pixel(x, y, filter(color), settings.blend_mode);
                    }
                }
            }
        }
        Some(kaleidoscope) => {
            for y in 0..output.height() {
                for x in 0..output.width() {
                    let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    let Some(source) = kaleidoscope.source_point(center) else {
                        continue;
                    };
                    let color = surface.sample_bilinear(source.x - 0.5, source.y - 0.5);
                    if !color.is_transparent() {
                        output.blend_pixel(x, y, filter(color), settings.blend_mode);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Rgb, Rgba};

    fn settings(slices: f32) -> CompositeSettings {
        CompositeSettings {
            blend_mode: BlendMode::Normal,
            hue_degrees: 0.0,
            kaleidoscope_slices: slices,
        }
    }

    fn patterned(width: usize, height: usize) -> Raster {
        let mut raster = Raster::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let r = x as f32 / width as f32;
                let g = y as f32 / height as f32;
                raster.set_pixel(x, y, Rgba::new(r, g, 0.5, 1.0));
            }
        }
        raster
    }

    #[test]
    fn single_slice_is_identity() {
        let surface = patterned(17, 11);
        for slices in [1.0, 0.0, -3.0, 1.9] {
            let mut output = Raster::new(17, 11);
            composite_layer(&surface, &mut output, &settings(slices));
            assert_eq!(output, surface);
        }
    }

    #[test]
    fn wedges_partition_the_turn() {
        let kaleidoscope = Kaleidoscope::new(6.0, 100, 100).unwrap();
        assert_eq!(kaleidoscope.slices(), 6);
        assert_eq!(kaleidoscope.wedge_of(Point::new(90.0, 50.0)), 0);
        assert_eq!(kaleidoscope.wedge_of(Point::new(10.0, 50.0)), 3);
        assert_eq!(kaleidoscope.wedge_of(Point::new(70.0, 84.64)), 1);
    }

    #[test]
    fn slices_are_floored() {
        assert_eq!(Kaleidoscope::new(4.7, 10, 10).unwrap().slices(), 4);
        assert!(Kaleidoscope::new(1.0, 10, 10).is_none());
    }

    #[test]
    fn wedge_zero_shows_the_surface_unchanged() {
        let kaleidoscope = Kaleidoscope::new(4.0, 40, 40).unwrap();
        let p = Point::new(35.0, 21.0);
        let source = kaleidoscope.source_point(p).unwrap();
        assert!((source - p).hypot() < 1e-9);
    }

    #[test]
    fn odd_wedges_are_mirrored_vertically() {
        let kaleidoscope = Kaleidoscope::new(2.0, 40, 40).unwrap();
        let p = Point::new(5.0, 15.0);
        assert_eq!(kaleidoscope.wedge_of(p), 1);
        let source = kaleidoscope.source_point(p).unwrap();
        // Reflected across the vertical axis, not rotated half a turn.
        assert!((source - Point::new(35.0, 15.0)).hypot() < 1e-9, "{source:?}");
    }

    #[test]
    fn kaleidoscope_has_rotational_symmetry() {
        let size = 32;
        // Depends on x only, so the mirror on odd wedges is invisible.
        let mut surface = Raster::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let v = if x > 20 { 1.0 } else { x as f32 / 40.0 };
                surface.set_pixel(x, y, Rgba::new(v, 0.0, 0.0, 1.0));
            }
        }

        for slices in [2usize, 4] {
            let mut output = Raster::new(size, size);
            composite_layer(&surface, &mut output, &settings(slices as f32));

            let turns = 4 / slices;
            for y in 0..size {
                for x in 0..size {
                    // Rotate (x, y) by `turns` quarter turns about the centre.
                    let (mut rx, mut ry) = (x, y);
                    for _ in 0..turns {
                        (rx, ry) = (size - 1 - ry, rx);
                    }
                    let a = output.pixel(x, y);
                    let b = output.pixel(rx, ry);
                    assert!((a.r - b.r).abs() < 1e-3, "{slices} slices at ({x}, {y})");
                    assert!((a.a - b.a).abs() < 1e-3);
                }
            }
        }
    }

    #[test]
    fn hue_rotation_changes_colour_only() {
        let mut surface = Raster::new(2, 2);
        surface.set_pixel(0, 0, Rgba::opaque(Rgb::new(255, 0, 0)));
        let mut output = Raster::new(2, 2);
        let rotated = CompositeSettings {
            hue_degrees: 120.0,
            ..settings(1.0)
        };
        composite_layer(&surface, &mut output, &rotated);
        let pixel = output.pixel(0, 0);
        assert_eq!(pixel.a, 1.0);
        assert!(pixel.g > pixel.r);
        assert!(output.pixel(1, 1).is_transparent());
    }

    #[test]
    fn blend_mode_is_used_for_the_merge() {
        let mut surface = Raster::new(1, 1);
        surface.set_pixel(0, 0, Rgba::new(0.5, 0.5, 0.5, 1.0));
        let mut output = Raster::new(1, 1);
        output.set_pixel(0, 0, Rgba::new(0.25, 0.0, 0.0, 1.0));
        let add = CompositeSettings {
            blend_mode: BlendMode::Add,
            ..settings(1.0)
        };
        composite_layer(&surface, &mut output, &add);
        assert_eq!(output.pixel(0, 0), Rgba::new(0.75, 0.5, 0.5, 1.0));
    }
}
