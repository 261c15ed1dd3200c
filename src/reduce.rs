use image::{GrayImage, Rgb, RgbImage};

use crate::grid::CellGrid;

/// Outcome of reducing one cell's pixel block. `Invalid` marks a sampling
/// failure (the all-zero / non-finite average case) the renderer surfaces
/// with a sentinel fill instead of silently rendering as black.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellSample<T> {
    Normal(T),
    Empty,
    Invalid,
}

/// Per-cell color reduction: the paint fill plus the luminance driving
/// glyph selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSample {
    pub fill: Rgb<u8>,
    pub mean: f64,
}

/// Pixel bounds of one cell, clipped to the raster edges at the last row
/// and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

impl CellBounds {
    pub fn of(grid: &CellGrid, row: u32, col: u32, width: u32, height: u32) -> Self {
        let x0 = (col as f32 * grid.cell_width) as u32;
        let x1 = (((col + 1) as f32 * grid.cell_width) as u32).min(width);
        let y0 = (row as f32 * grid.cell_height) as u32;
        let y1 = (((row + 1) as f32 * grid.cell_height) as u32).min(height);
        Self { x0, x1, y0, y1 }
    }

    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }

    fn pixel_count(&self) -> u64 {
        u64::from(self.x1 - self.x0) * u64::from(self.y1 - self.y0)
    }
}

/// Arithmetic mean intensity of the cell's luminance block.
pub fn reduce_luma(source: &GrayImage, bounds: &CellBounds) -> CellSample<f64> {
    if bounds.is_empty() {
        return CellSample::Empty;
    }

    let mut sum: u64 = 0;
    for y in bounds.y0..bounds.y1 {
        for x in bounds.x0..bounds.x1 {
            sum += u64::from(source.get_pixel(x, y)[0]);
        }
    }

    CellSample::Normal(sum as f64 / bounds.pixel_count() as f64)
}

/// Per-channel sum over the block divided by the *nominal* cell area (not
/// the clipped block size), clamped to 0..=255, so edge cells come out
/// proportionally dimmer. Glyph selection uses the true arithmetic mean
/// of all channel values. A block summing to zero on every channel is
/// classified `Invalid` rather than treated as legitimate pure black.
pub fn reduce_color(
    source: &RgbImage,
    bounds: &CellBounds,
    nominal_area: f64,
) -> CellSample<ColorSample> {
    if bounds.is_empty() {
        return CellSample::Empty;
    }

    let mut channel_sums = [0u64; 3];
    for y in bounds.y0..bounds.y1 {
        for x in bounds.x0..bounds.x1 {
            let pixel = source.get_pixel(x, y);
            for channel in 0..3 {
                channel_sums[channel] += u64::from(pixel[channel]);
            }
        }
    }

    if channel_sums.iter().all(|&sum| sum == 0) || !nominal_area.is_finite() || nominal_area <= 0.0
    {
        return CellSample::Invalid;
    }

    let mut fill = [0u8; 3];
    for channel in 0..3 {
        let average = channel_sums[channel] as f64 / nominal_area;
        fill[channel] = average.clamp(0.0, 255.0) as u8;
    }

    let total: u64 = channel_sums.iter().sum();
    let mean = total as f64 / (bounds.pixel_count() * 3) as f64;

    CellSample::Normal(ColorSample {
        fill: Rgb(fill),
        mean,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn grid_2x2() -> CellGrid {
        CellGrid {
            cell_width: 2.0,
            cell_height: 2.0,
            cols: 2,
            rows: 2,
        }
    }

    #[test]
    fn bounds_clip_to_raster_edges() {
        let grid = CellGrid {
            cell_width: 3.0,
            cell_height: 3.0,
            cols: 2,
            rows: 2,
        };
        let bounds = CellBounds::of(&grid, 1, 1, 5, 5);
        assert_eq!(bounds.x1, 5);
        assert_eq!(bounds.y1, 5);
        assert!(!bounds.is_empty());
    }

    #[test]
    fn out_of_raster_cell_is_empty() {
        let grid = grid_2x2();
        let bounds = CellBounds::of(&grid, 1, 1, 2, 2);
        assert!(bounds.is_empty());
        let source = GrayImage::new(2, 2);
        assert_eq!(reduce_luma(&source, &bounds), CellSample::Empty);
    }

    #[test]
    fn luma_mean_is_exact_for_uniform_block() {
        let source = GrayImage::from_pixel(4, 4, Luma([200]));
        let bounds = CellBounds::of(&grid_2x2(), 0, 0, 4, 4);
        assert_eq!(reduce_luma(&source, &bounds), CellSample::Normal(200.0));
    }

    #[test]
    fn luma_mean_averages_mixed_block() {
        let mut source = GrayImage::new(2, 1);
        source.put_pixel(0, 0, Luma([0]));
        source.put_pixel(1, 0, Luma([255]));
        let bounds = CellBounds {
            x0: 0,
            x1: 2,
            y0: 0,
            y1: 1,
        };
        assert_eq!(reduce_luma(&source, &bounds), CellSample::Normal(127.5));
    }

    #[test]
    fn all_zero_color_block_is_invalid() {
        let source = RgbImage::new(4, 4);
        let bounds = CellBounds::of(&grid_2x2(), 0, 0, 4, 4);
        assert_eq!(reduce_color(&source, &bounds, 4.0), CellSample::Invalid);
    }

    #[test]
    fn color_average_divides_by_nominal_area() {
        let source = RgbImage::from_pixel(4, 4, Rgb([100, 50, 200]));
        let bounds = CellBounds::of(&grid_2x2(), 0, 0, 4, 4);
        match reduce_color(&source, &bounds, 4.0) {
            CellSample::Normal(sample) => {
                assert_eq!(sample.fill, Rgb([100, 50, 200]));
                let expected_mean = (100.0 + 50.0 + 200.0) / 3.0;
                assert!((sample.mean - expected_mean).abs() < 1e-9);
            }
            other => panic!("expected Normal, got {other:?}"),
        }
    }

    #[test]
    fn clipped_edge_cell_dims_against_nominal_area() {
        // A 1x2 block against a nominal 2x2 cell halves the fill.
        let source = RgbImage::from_pixel(1, 2, Rgb([200, 200, 200]));
        let bounds = CellBounds {
            x0: 0,
            x1: 1,
            y0: 0,
            y1: 2,
        };
        match reduce_color(&source, &bounds, 4.0) {
            CellSample::Normal(sample) => assert_eq!(sample.fill, Rgb([100, 100, 100])),
            other => panic!("expected Normal, got {other:?}"),
        }
    }
}
