use std::sync::{Arc, Mutex, MutexGuard};

use crate::{raster::Raster, Result, VisualizerError};

/// Receives every fully composited frame.
pub trait FrameSink {
    fn present(&mut self, frame: &Raster, frame_index: u64);
}

/// A published frame.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub index: u64,
    pub raster: Arc<Raster>,
}

/// Publishes finished frames for downstream consumers such as a virtual
/// camera. Consumers read through a [`CaptureHandle`] and only ever see whole
/// frames.
#[derive(Debug)]
pub struct CaptureTap {
    latest: Arc<Mutex<Option<CapturedFrame>>>,
    enabled: bool,
}

impl CaptureTap {
    pub fn new() -> Self {
        Self {
            latest: Arc::new(Mutex::new(None)),
            enabled: true,
        }
    }

    /// A new consumer of this tap's frames.
    pub fn handle(&self) -> CaptureHandle {
        CaptureHandle {
            latest: self.latest.clone(),
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for CaptureTap {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for CaptureTap {
    fn present(&mut self, frame: &Raster, frame_index: u64) {
        if !self.enabled {
            return;
        }
        let captured = CapturedFrame {
            index: frame_index,
            raster: Arc::new(frame.clone()),
        };
        match self.latest.lock() {
            Ok(mut slot) => *slot = Some(captured),
            Err(_) => tracing::warn!(frame_index, "capture slot has been poisoned, dropping frame"),
        }
    }
}

/// Consumer side of a [`CaptureTap`].
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    latest: Arc<Mutex<Option<CapturedFrame>>>,
}

impl CaptureHandle {
    /// The most recently published frame, if any.
    pub fn latest(&self) -> Result<Option<CapturedFrame>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<CapturedFrame>>> {
        self.latest
            .lock()
            .map_err(|_| VisualizerError::msg("capture slot has been poisoned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;

    #[test]
    fn handle_sees_latest_frame() {
        let mut tap = CaptureTap::new();
        let handle = tap.handle();
        assert!(handle.latest().unwrap().is_none());

        let mut frame = Raster::new(2, 2);
        tap.present(&frame, 1);
        frame.set_pixel(0, 0, Rgba::new(1.0, 1.0, 1.0, 1.0));
        tap.present(&frame, 2);

        let captured = handle.latest().unwrap().unwrap();
        assert_eq!(captured.index, 2);
        assert_eq!(*captured.raster, frame);
    }

    #[test]
    fn disabled_tap_publishes_nothing() {
        let mut tap = CaptureTap::new();
        tap.set_enabled(false);
        tap.present(&Raster::new(1, 1), 7);
        assert!(tap.handle().latest().unwrap().is_none());
        assert!(!tap.is_enabled());
    }
}
