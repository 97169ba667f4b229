//! Recursive feedback surfaces.
//!
//! Each frame the surface redraws last frame's content through an affine
//! transform at reduced opacity, then receives the new particles on top. The
//! redraw reads from one buffer and writes the other, so the transform only
//! ever sees the previous frame.

use kurbo::{Affine, Point};

use crate::{layer::LayerParams, raster::Raster};

/// Smallest magnitude the feedback scale is clamped to.
const MIN_SCALE: f64 = 1e-3;

/// Transform applied to the previous frame's content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackTransform {
    pub scale: f32,
    /// Radians.
    pub rotate: f32,
    pub translate_x: f32,
    pub translate_y: f32,
    /// Opacity of the redrawn content, clamped to `[0, 1]`.
    pub amount: f32,
}

impl FeedbackTransform {
    /// The transform for `params`, with the scale nudged by the audio effect.
    pub fn for_layer(params: &LayerParams, audio_effect: f32) -> Self {
        Self {
            scale: params.feedback_scale + audio_effect * 0.05,
            rotate: params.feedback_rotate,
            translate_x: params.feedback_translate_x,
            translate_y: params.feedback_translate_y,
            amount: params.feedback_amount,
        }
    }

    /// Maps previous-frame coordinates to current-frame coordinates on a
    /// surface of the given size.
    pub fn affine(&self, width: usize, height: usize) -> Affine {
        let center = (width as f64 / 2.0, height as f64 / 2.0);
        let mut scale = self.scale as f64;
        if scale.abs() < MIN_SCALE {
            scale = MIN_SCALE.copysign(scale);
        }
        Affine::translate(center)
            * Affine::rotate(self.rotate as f64)
            * Affine::scale(scale)
            * Affine::translate((self.translate_x as f64, self.translate_y as f64))
            * Affine::translate((-center.0, -center.1))
    }
}

/// Double-buffered accumulation surface owned by one layer.
#[derive(Debug, Clone)]
pub struct FeedbackSurface {
    front: Raster,
    back: Raster,
}

impl FeedbackSurface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            front: Raster::new(width, height),
            back: Raster::new(width, height),
        }
    }

    pub fn width(&self) -> usize {
        self.front.width()
    }

    pub fn height(&self) -> usize {
        self.front.height()
    }

    /// The current content.
    pub fn raster(&self) -> &Raster {
        &self.front
    }

    /// Mutable access to the current content, for drawing particles or
    /// seeding the surface.
    pub fn raster_mut(&mut self) -> &mut Raster {
        &mut self.front
    }

    /// Replaces the current content with last frame's content redrawn through
    /// `transform`.
    pub fn apply_feedback(&mut self, transform: &FeedbackTransform) {
        self.back.clear();
        let amount = transform.amount.clamp(0.0, 1.0);

        if amount > 0.0 {
            let inverse = transform.affine(self.width(), self.height()).inverse();
            for y in 0..self.back.height() {
                for x in 0..self.back.width() {
                    let center = Point::new(x as f64 + 0.5, y as f64 + 0.5);
                    let source = inverse * center;
                    let color = self.front.sample_bilinear(source.x - 0.5, source.y - 0.5);
                    if !color.is_transparent() {
                        self.back.set_pixel(x, y, color.scale(amount));
                    }
                }
            }
        }

        std::mem::swap(&mut self.front, &mut self.back);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Rgb, Rgba};

    fn identity(amount: f32) -> FeedbackTransform {
        FeedbackTransform {
            scale: 1.0,
            rotate: 0.0,
            translate_x: 0.0,
            translate_y: 0.0,
            amount,
        }
    }

    fn seeded() -> FeedbackSurface {
        let mut surface = FeedbackSurface::new(16, 12);
        surface.raster_mut().fill_disc(5.0, 6.0, 3.0, Rgb::new(255, 128, 0));
        surface
    }

    #[test]
    fn zero_amount_leaves_no_trail() {
        let mut surface = seeded();
        surface.apply_feedback(&identity(0.0));
        assert!(surface.raster().is_blank());
    }

    #[test]
    fn full_amount_with_identity_never_decays() {
        let mut surface = seeded();
        let original = surface.raster().clone();
        for _ in 0..50 {
            surface.apply_feedback(&identity(1.0));
        }
        assert_eq!(surface.raster(), &original);
    }

    #[test]
    fn partial_amount_decays_geometrically() {
        let mut surface = FeedbackSurface::new(4, 4);
        surface.raster_mut().set_pixel(2, 1, Rgba::new(1.0, 1.0, 1.0, 1.0));
        for _ in 0..3 {
            surface.apply_feedback(&identity(0.5));
        }
        let pixel = surface.raster().pixel(2, 1);
        assert!((pixel.a - 0.125).abs() < 1e-6);
        assert!((pixel.r - 0.125).abs() < 1e-6);
    }

    #[test]
    fn translation_moves_content() {
        let mut surface = FeedbackSurface::new(8, 8);
        surface.raster_mut().set_pixel(2, 2, Rgba::new(1.0, 0.0, 0.0, 1.0));
        let shift = FeedbackTransform {
            translate_x: 3.0,
            translate_y: 1.0,
            ..identity(1.0)
        };
        surface.apply_feedback(&shift);
        assert_eq!(surface.raster().pixel(5, 3), Rgba::new(1.0, 0.0, 0.0, 1.0));
        assert!(surface.raster().pixel(2, 2).is_transparent());
    }

    #[test]
    fn audio_nudges_scale() {
        let params = LayerParams {
            feedback_scale: 1.0,
            ..LayerParams::default()
        };
        let transform = FeedbackTransform::for_layer(&params, 2.0);
        assert!((transform.scale - 1.1).abs() < 1e-6);
    }

    #[test]
    fn zoom_spreads_content_outwards() {
        let mut surface = FeedbackSurface::new(20, 20);
        surface.raster_mut().set_pixel(14, 10, Rgba::new(1.0, 1.0, 1.0, 1.0));
        let zoom = FeedbackTransform {
            scale: 2.0,
            ..identity(1.0)
        };
        surface.apply_feedback(&zoom);
        // Pixel centre (14.5, 10.5) lands on (19.0, 10.5) when scaled about the centre.
        assert!(surface.raster().pixel(18, 10).a > 0.0);
        assert!(surface.raster().pixel(14, 10).is_transparent());
    }
}
