//! Colour primitives shared by the sampler, the particle field and the
//! compositor.

use serde::{Deserialize, Serialize};

/// Straight 8-bit RGB colour as produced by the video source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    /// Accent colour used by the monochrome colour mode (`#06b6d4`).
    pub const ACCENT: Rgb = Rgb::new(0x06, 0xb6, 0xd4);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Mean of the three channels, in `[0, 255]`.
    pub fn brightness(self) -> f32 {
        (self.r as f32 + self.g as f32 + self.b as f32) / 3.0
    }

    /// Converts a CSS style `hsl()` colour. `hue` is in degrees, saturation and
    /// lightness are fractions and are clamped to `[0, 1]`.
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 360.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;

        let channel = |t: f32| -> u8 {
            let t = t.rem_euclid(1.0);
            let v = if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            };
            (v * 255.0).round().clamp(0.0, 255.0) as u8
        };

        Self {
            r: channel(h + 1.0 / 3.0),
            g: channel(h),
            b: channel(h - 1.0 / 3.0),
        }
    }
}

/// Premultiplied floating point RGBA, every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque colour from 8-bit channels.
    pub fn opaque(color: Rgb) -> Self {
        Self {
            r: color.r as f32 / 255.0,
            g: color.g as f32 / 255.0,
            b: color.b as f32 / 255.0,
            a: 1.0,
        }
    }

    /// Multiplies every component, including alpha.
    pub fn scale(self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
            a: self.a * factor,
        }
    }

    pub fn is_transparent(self) -> bool {
        self.a <= 0.0 && self.r <= 0.0 && self.g <= 0.0 && self.b <= 0.0
    }

    /// Straight (non premultiplied) 8-bit RGBA.
    pub fn to_rgba8(self) -> [u8; 4] {
        if self.a <= 0.0 {
            return [0, 0, 0, 0];
        }
        let unpremultiply = |c: f32| ((c / self.a).clamp(0.0, 1.0) * 255.0).round() as u8;
        [
            unpremultiply(self.r),
            unpremultiply(self.g),
            unpremultiply(self.b),
            (self.a.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }
}

/// Colour matrix of the CSS `hue-rotate()` filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HueRotation {
    matrix: [[f32; 3]; 3],
}

impl HueRotation {
    /// Returns `None` when the rotation is a whole number of turns, so callers
    /// can skip the filter and keep pixels bit-exact.
    pub fn new(degrees: f32) -> Option<Self> {
        let degrees = degrees.rem_euclid(360.0);
        if degrees == 0.0 || !degrees.is_finite() {
            return None;
        }

        let (sin, cos) = degrees.to_radians().sin_cos();
        Some(Self {
            matrix: [
                [
                    0.213 + cos * 0.787 - sin * 0.213,
                    0.715 - cos * 0.715 - sin * 0.715,
                    0.072 - cos * 0.072 + sin * 0.928,
                ],
                [
                    0.213 - cos * 0.213 + sin * 0.143,
                    0.715 + cos * 0.285 + sin * 0.140,
                    0.072 - cos * 0.072 - sin * 0.283,
                ],
                [
                    0.213 - cos * 0.213 - sin * 0.787,
                    0.715 - cos * 0.715 + sin * 0.715,
                    0.072 + cos * 0.928 + sin * 0.072,
                ],
            ],
        })
    }

    /// Applies the matrix to a premultiplied colour. The matrix is linear, so
    /// this matches filtering the straight colour and premultiplying again.
    pub fn apply(&self, color: Rgba) -> Rgba {
        let m = &self.matrix;
        let row = |i: usize| {
            (m[i][0] * color.r + m[i][1] * color.g + m[i][2] * color.b).clamp(0.0, color.a)
        };
        Rgba {
            r: row(0),
            g: row(1),
            b: row(2),
            a: color.a,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsl_matches_css_reference_colours() {
        assert_eq!(Rgb::from_hsl(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hsl(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(Rgb::from_hsl(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
        assert_eq!(Rgb::from_hsl(185.0, 1.0, 1.5), Rgb::WHITE);
        assert_eq!(Rgb::from_hsl(0.0, 1.0, 0.7), Rgb::new(255, 102, 102));
    }

    #[test]
    fn brightness_is_channel_mean() {
        assert_eq!(Rgb::new(30, 60, 90).brightness(), 60.0);
    }

    #[test]
    fn whole_turns_skip_hue_rotation() {
        assert!(HueRotation::new(0.0).is_none());
        assert!(HueRotation::new(360.0).is_none());
        assert!(HueRotation::new(-720.0).is_none());
        assert!(HueRotation::new(90.0).is_some());
    }

    #[test]
    fn hue_rotation_keeps_alpha_and_bounds() {
        let rotation = HueRotation::new(180.0).unwrap();
        let color = Rgba::new(0.5, 0.1, 0.0, 0.5);
        let rotated = rotation.apply(color);
        assert_eq!(rotated.a, 0.5);
        for c in [rotated.r, rotated.g, rotated.b] {
            assert!((0.0..=0.5).contains(&c));
        }
        assert!(rotated.b > rotated.r);
    }

    #[test]
    fn premultiplied_round_trips_to_straight_rgba() {
        let color = Rgba::opaque(Rgb::new(200, 100, 50)).scale(0.5);
        assert_eq!(color.to_rgba8(), [200, 100, 50, 128]);
        assert_eq!(Rgba::TRANSPARENT.to_rgba8(), [0, 0, 0, 0]);
    }
}
