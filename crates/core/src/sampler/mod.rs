//! Downsampling of camera frames into brightness/colour cells.
//!
//! The renderer samples once per frame at the finest stride any visible layer
//! asks for. Layers with a coarser stride read a [`CellView`] that picks every
//! n-th cell out of that shared grid instead of sampling the frame again.

use crate::{color::Rgb, video::VideoFrame};

/// Smallest stride accepted by the sampler.
pub const MIN_STRIDE: usize = 2;

/// One sampled pixel of the camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    /// Mean of the source pixel's channels, in `[0, 255]`.
    pub brightness: f32,
    pub color: Rgb,
}

/// Clamps a requested stride to the supported minimum.
pub fn clamp_stride(stride: u32) -> usize {
    (stride as usize).max(MIN_STRIDE)
}

/// Row-major grid of cells sampled from one frame at a fixed stride.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGrid {
    stride: usize,
    rows: usize,
    cols: usize,
    frame_width: usize,
    frame_height: usize,
    cells: Vec<Cell>,
}

impl CellGrid {
    /// Samples the pixel at every `stride`-th row and column of `frame`.
    pub fn sample(frame: &VideoFrame, stride: usize) -> Self {
        let stride = stride.max(MIN_STRIDE);
        let rows = frame.height().div_ceil(stride);
        let cols = frame.width().div_ceil(stride);

        let mut cells = Vec::with_capacity(rows * cols);
        for y in (0..frame.height()).step_by(stride) {
            for x in (0..frame.width()).step_by(stride) {
                let color = frame.pixel(x, y);
                cells.push(Cell {
                    brightness: color.brightness(),
                    color,
                });
            }
        }

        Self {
            stride,
            rows,
            cols,
            frame_width: frame.width(),
            frame_height: frame.height(),
            cells,
        }
    }

    /// A grid with no cells, used before the first frame arrives.
    pub fn empty() -> Self {
        Self {
            stride: MIN_STRIDE,
            rows: 0,
            cols: 0,
            frame_width: 0,
            frame_height: 0,
            cells: Vec::new(),
        }
    }

    /// Returns the pixel spacing the grid was sampled at.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of sampled rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of sampled columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn frame_width(&self) -> usize {
        self.frame_width
    }

    pub fn frame_height(&self) -> usize {
        self.frame_height
    }

    /// Returns the total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the cell at (`row`, `col`), or `None` outside the grid.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.cells.get(row * self.cols + col)
    }

    /// A view of this grid at a coarser `stride`. Strides finer than the
    /// grid's own are raised to it.
    pub fn view(&self, stride: usize) -> CellView<'_> {
        let stride = stride.max(self.stride);
        CellView {
            grid: self,
            stride,
            rows: self.frame_height.div_ceil(stride),
            cols: self.frame_width.div_ceil(stride),
        }
    }
}

/// A cell picked out of a [`CellView`], with the frame pixel it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledCell {
    pub cell: Cell,
    pub frame_x: usize,
    pub frame_y: usize,
}

/// A layer's view over the shared grid at its own stride.
#[derive(Debug, Clone, Copy)]
pub struct CellView<'a> {
    grid: &'a CellGrid,
    stride: usize,
    rows: usize,
    cols: usize,
}

impl<'a> CellView<'a> {
    /// Returns this view's stride, never finer than the grid's.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the number of rows visible at this stride.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the number of columns visible at this stride.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn frame_width(&self) -> usize {
        self.grid.frame_width
    }

    pub fn frame_height(&self) -> usize {
        self.grid.frame_height
    }

    /// The view cell at (`row`, `col`). It maps to the grid cell whose
    /// sampled pixel is the nearest one at or before `row * stride`.
    pub fn get(&self, row: usize, col: usize) -> Option<SampledCell> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let base = self.grid.stride;
        let grid_row = row * self.stride / base;
        let grid_col = col * self.stride / base;
        self.grid.cell(grid_row, grid_col).map(|cell| SampledCell {
            cell: *cell,
            frame_x: grid_col * base,
            frame_y: grid_row * base,
        })
    }

    /// Every cell in the view brighter than `threshold`, in row-major order.
    pub fn bright_cells(&self, threshold: f32) -> Vec<SampledCell> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| (row, col)))
            .filter_map(|(row, col)| self.get(row, col))
            .filter(|sampled| sampled.cell.brightness > threshold)
            .collect()
    }
}
