//! Software raster surfaces and the compositing operators used by every
//! stage of the pipeline.

use serde::{Deserialize, Serialize};

use crate::{
    color::{Rgb, Rgba},
    video::VideoFrame,
};

/// Per-pixel compositing formula used when one surface is merged onto another.
///
/// Serialised with the canvas operation names so presets stay compatible with
/// the browser build of the visualiser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    #[serde(rename = "source-over", alias = "normal")]
    Normal,
    #[serde(rename = "lighter", alias = "add")]
    Add,
    #[serde(rename = "screen")]
    Screen,
    #[serde(rename = "multiply")]
    Multiply,
}

impl BlendMode {
    /// Returns the canvas composite-operation name for this mode.
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Add => "Add",
            Self::Screen => "Screen",
            Self::Multiply => "Multiply",
        }
    }

    /// Composites premultiplied `src` over premultiplied `dst`.
    pub fn apply(self, src: Rgba, dst: Rgba) -> Rgba {
        match self {
            Self::Normal => {
                let keep = 1.0 - src.a;
                Rgba {
                    r: src.r + dst.r * keep,
                    g: src.g + dst.g * keep,
                    b: src.b + dst.b * keep,
                    a: src.a + dst.a * keep,
                }
            }
            Self::Add => Rgba {
                r: (src.r + dst.r).min(1.0),
                g: (src.g + dst.g).min(1.0),
                b: (src.b + dst.b).min(1.0),
                a: (src.a + dst.a).min(1.0),
            },
            Self::Screen => {
                let screen = |s: f32, d: f32| s + d - s * d;
                Rgba {
                    r: screen(src.r, dst.r),
                    g: screen(src.g, dst.g),
                    b: screen(src.b, dst.b),
                    a: screen(src.a, dst.a),
                }
            }
            Self::Multiply => {
                let multiply = |s: f32, d: f32| s * (1.0 - dst.a) + d * (1.0 - src.a) + s * d;
                Rgba {
                    r: multiply(src.r, dst.r),
                    g: multiply(src.g, dst.g),
                    b: multiply(src.b, dst.b),
                    a: src.a + dst.a - src.a * dst.a,
                }
            }
        }
    }
}

/// A width x height grid of premultiplied pixels, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl Raster {
    /// Creates a fully transparent raster.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba::TRANSPARENT; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns every pixel in row-major order.
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Returns the pixel at (`x`, `y`). Panics outside the raster.
    pub fn pixel(&self, x: usize, y: usize) -> Rgba {
        self.pixels[y * self.width + x]
    }

    /// Overwrites the pixel at (`x`, `y`). Panics outside the raster.
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgba) {
        let index = y * self.width + x;
        self.pixels[index] = color;
    }

    /// Resets every pixel to transparent.
    pub fn clear(&mut self) {
        self.pixels.fill(Rgba::TRANSPARENT);
    }

    /// Returns `true` when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|p| p.is_transparent())
    }

    /// Reads a pixel, treating everything outside the raster as transparent.
    pub fn pixel_or_transparent(&self, x: i64, y: i64) -> Rgba {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            Rgba::TRANSPARENT
        } else {
            self.pixels[y as usize * self.width + x as usize]
        }
    }

    /// Bilinear sample where integer coordinates land exactly on pixels.
    pub fn sample_bilinear(&self, x: f64, y: f64) -> Rgba {
        if !x.is_finite() || !y.is_finite() {
            return Rgba::TRANSPARENT;
        }
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = (x - x0) as f32;
        let fy = (y - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let top_left = self.pixel_or_transparent(x0, y0);
        if fx == 0.0 && fy == 0.0 {
            return top_left;
        }
        let top_right = self.pixel_or_transparent(x0 + 1, y0);
        let bottom_left = self.pixel_or_transparent(x0, y0 + 1);
        let bottom_right = self.pixel_or_transparent(x0 + 1, y0 + 1);

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let mix = |tl: f32, tr: f32, bl: f32, br: f32| {
            lerp(lerp(tl, tr, fx), lerp(bl, br, fx), fy)
        };
        Rgba {
            r: mix(top_left.r, top_right.r, bottom_left.r, bottom_right.r),
            g: mix(top_left.g, top_right.g, bottom_left.g, bottom_right.g),
            b: mix(top_left.b, top_right.b, bottom_left.b, bottom_right.b),
            a: mix(top_left.a, top_right.a, bottom_left.a, bottom_right.a),
        }
    }

    /// Merges a single source pixel into this raster.
    pub fn blend_pixel(&mut self, x: usize, y: usize, src: Rgba, mode: BlendMode) {
        let index = y * self.width + x;
        self.pixels[index] = mode.apply(src, self.pixels[index]);
    }

    /// Fills an anti-aliased disc with an opaque colour using source-over.
    pub fn fill_disc(&mut self, cx: f32, cy: f32, radius: f32, color: Rgb) {
        if self.width == 0 || self.height == 0 || radius <= 0.0 {
            return;
        }
        let paint = Rgba::opaque(color);
        let reach = radius + 0.5;
        let min_x = (cx - reach).floor().max(0.0) as usize;
        let min_y = (cy - reach).floor().max(0.0) as usize;
        let max_x = (cx + reach).ceil().min(self.width as f32 - 1.0);
        let max_y = (cy + reach).ceil().min(self.height as f32 - 1.0);
        if max_x < 0.0 || max_y < 0.0 {
            return;
        }

        for y in min_y..=max_y as usize {
            for x in min_x..=max_x as usize {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let coverage = (reach - (dx * dx + dy * dy).sqrt()).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend_pixel(x, y, paint.scale(coverage), BlendMode::Normal);
                }
            }
        }
    }

    /// Draws a video frame stretched over the whole raster at `alpha`.
    pub fn draw_video(&mut self, frame: &VideoFrame, alpha: f32) {
        if frame.width() == 0 || frame.height() == 0 || alpha <= 0.0 {
            return;
        }
        for y in 0..self.height {
            let sy = y * frame.height() / self.height;
            for x in 0..self.width {
                let sx = x * frame.width() / self.width;
                let src = Rgba::opaque(frame.pixel(sx, sy)).scale(alpha);
                self.blend_pixel(x, y, src, BlendMode::Normal);
            }
        }
    }

    /// Multiplies every colour channel by `tint / 255`, leaving alpha alone.
    pub fn multiply_tint(&mut self, tint: Rgb) {
        if tint == Rgb::WHITE {
            return;
        }
        let (r, g, b) = (
            tint.r as f32 / 255.0,
            tint.g as f32 / 255.0,
            tint.b as f32 / 255.0,
        );
        for pixel in &mut self.pixels {
            pixel.r *= r;
            pixel.g *= g;
            pixel.b *= b;
        }
    }

    /// Straight 8-bit RGBA bytes, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| p.to_rgba8()).collect()
    }
}
