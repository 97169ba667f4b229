use crate::{color::Rgb, Result, VisualizerError};

/// A decoded camera frame: straight RGBA8 pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFrame {
    width: usize,
    height: usize,
    rgba: Vec<u8>,
}

impl VideoFrame {
    /// Wraps an RGBA8 buffer, checking that it matches the stated dimensions.
    pub fn from_rgba8(width: usize, height: usize, rgba: Vec<u8>) -> Result<Self> {
        if rgba.len() != width * height * 4 {
            return Err(VisualizerError::InvalidInput(
                "video frame buffer does not match its dimensions",
            ));
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// A frame filled with one colour.
    pub fn solid(width: usize, height: usize, color: Rgb) -> Self {
        let rgba = [color.r, color.g, color.b, 255].repeat(width * height);
        Self {
            width,
            height,
            rgba,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> Rgb {
        let index = (y * self.width + x) * 4;
        Rgb::new(self.rgba[index], self.rgba[index + 1], self.rgba[index + 2])
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: Rgb) {
        let index = (y * self.width + x) * 4;
        self.rgba[index..index + 4].copy_from_slice(&[color.r, color.g, color.b, 255]);
    }

    pub fn as_rgba8(&self) -> &[u8] {
        &self.rgba
    }
}

/// Pull-only access to the most recent camera frame.
///
/// Returning `None` means no new frame is ready this tick. The renderer keeps
/// using the last frame it saw.
pub trait VideoSource {
    fn latest_frame(&mut self) -> Option<VideoFrame>;
}

impl<F> VideoSource for F
where
    F: FnMut() -> Option<VideoFrame>,
{
    fn latest_frame(&mut self) -> Option<VideoFrame> {
        self()
    }
}
