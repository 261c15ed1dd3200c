use image::{imageops, GrayImage, Luma, Rgb, RgbImage};

use crate::charset::GlyphRamp;
use crate::error::RenderError;
use crate::glyphs::GlyphPaint;
use crate::grid::CellGrid;
use crate::reduce::{reduce_color, reduce_luma, CellBounds, CellSample};
use crate::schema::Background;

/// Highly visible fill for cells whose average could not be sampled.
pub const SENTINEL_FILL: Rgb<u8> = Rgb([255, 0, 0]);

/// Canvas height multiplier. The still-image path uses one line height
/// per row; both video paths use two. The two call sites intentionally
/// disagree: the multiplier determines the output aspect ratio and is
/// kept distinct per caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineHeight {
    Single,
    Double,
}

impl LineHeight {
    fn multiplier(self) -> u32 {
        match self {
            Self::Single => 1,
            Self::Double => 2,
        }
    }
}

/// Resolves one grid row of a luminance source to its ramp glyphs.
pub fn row_glyphs(
    source: &GrayImage,
    grid: &CellGrid,
    ramp: &GlyphRamp,
    background: Background,
    row: u32,
) -> String {
    let mut line = String::with_capacity(grid.cols as usize);
    for col in 0..grid.cols {
        let bounds = CellBounds::of(grid, row, col, source.width(), source.height());
        let index = match reduce_luma(source, &bounds) {
            CellSample::Normal(mean) => ramp.index_for_mean(mean),
            CellSample::Empty | CellSample::Invalid => ramp.minimal_ink_index(background),
        };
        line.push(ramp.glyph(index));
    }
    line
}

/// Grayscale mosaic: one glyph per cell, drawn row-at-a-time with the
/// background-opposite fill. Rows are always placed at single line-height
/// offsets; `line_height` only sizes the canvas.
pub fn render_mono(
    source: &GrayImage,
    grid: &CellGrid,
    ramp: &GlyphRamp,
    painter: &mut dyn GlyphPaint,
    background: Background,
    line_height: LineHeight,
) -> Result<GrayImage, RenderError> {
    let (cell_w, cell_h) = painter.cell_size();
    let width = cell_w * grid.cols;
    let height = cell_h * grid.rows * line_height.multiplier();
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidGeometry(format!(
            "computed canvas is {width}x{height}"
        )));
    }

    let mut canvas = GrayImage::from_pixel(width, height, Luma([background.code()]));
    for row in 0..grid.rows {
        let line = row_glyphs(source, grid, ramp, background, row);
        painter.draw_row_gray(&mut canvas, 0, row * cell_h, &line, background.ink());
    }
    Ok(canvas)
}

/// Color mosaic: glyph chosen by the cell's mean luminance, painted with
/// the cell's average color. Empty or invalid cells get the sentinel fill
/// so sampling defects stay visible. Fixed-size canvas, never cropped.
pub fn render_color(
    source: &RgbImage,
    grid: &CellGrid,
    ramp: &GlyphRamp,
    painter: &mut dyn GlyphPaint,
    background: Background,
) -> Result<RgbImage, RenderError> {
    let (cell_w, cell_h) = painter.cell_size();
    let width = cell_w * grid.cols;
    let height = cell_h * grid.rows * LineHeight::Double.multiplier();
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidGeometry(format!(
            "computed canvas is {width}x{height}"
        )));
    }

    let nominal_area = f64::from(grid.cell_width) * f64::from(grid.cell_height);
    let mut canvas = RgbImage::from_pixel(width, height, background.rgb());
    for row in 0..grid.rows {
        for col in 0..grid.cols {
            let bounds = CellBounds::of(grid, row, col, source.width(), source.height());
            let (index, fill) = match reduce_color(source, &bounds, nominal_area) {
                CellSample::Normal(sample) => (ramp.index_for_mean(sample.mean), sample.fill),
                // An all-zero average is a sampling failure, not true
                // black; the mean it implies still selects index 0.
                CellSample::Empty | CellSample::Invalid => (ramp.index_for_mean(0.0), SENTINEL_FILL),
            };
            painter.draw_glyph_rgb(&mut canvas, col * cell_w, row * cell_h, ramp.glyph(index), fill);
        }
    }
    Ok(canvas)
}

/// Crops the canvas to the bounding box of non-background content. White
/// backgrounds are logically inverted first, since content is defined as
/// non-zero pixels. A canvas with no content (all one value) is returned
/// uncropped.
pub fn crop_to_content(canvas: &GrayImage, background: Background) -> GrayImage {
    let content = |value: u8| -> bool {
        match background {
            Background::Black => value != 0,
            Background::White => 255 - value != 0,
        }
    };

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    let mut found = false;

    for (x, y, pixel) in canvas.enumerate_pixels() {
        if content(pixel[0]) {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
            found = true;
        }
    }

    if !found {
        return canvas.clone();
    }

    imageops::crop_imm(canvas, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::GlyphRamp;
    use crate::schema::Charset;
    use image::Luma;

    fn uniform_source(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn two_band_source_resolves_to_extreme_ramp_indices() {
        // 8x2 source: top row 0, bottom row 255, two columns.
        let mut source = GrayImage::new(8, 2);
        for x in 0..8 {
            source.put_pixel(x, 0, Luma([0]));
            source.put_pixel(x, 1, Luma([255]));
        }
        let grid = CellGrid {
            cell_width: 4.0,
            cell_height: 1.0,
            cols: 2,
            rows: 2,
        };
        let ramp = GlyphRamp::for_charset(Charset::Simple);

        let top = row_glyphs(&source, &grid, &ramp, Background::Black, 0);
        let bottom = row_glyphs(&source, &grid, &ramp, Background::Black, 1);

        assert_eq!(top, ramp.glyph(0).to_string().repeat(2));
        assert_eq!(bottom, ramp.glyph(ramp.len() - 1).to_string().repeat(2));
    }

    #[test]
    fn uniform_source_uses_exactly_one_ramp_character() {
        let source = uniform_source(40, 20, 180);
        let grid = CellGrid::plan(40, 20, 10, 2.0).expect("grid should plan");
        let ramp = GlyphRamp::for_charset(Charset::Simple);

        let expected = ramp.glyph(ramp.index_for_mean(180.0));
        for row in 0..grid.rows {
            let line = row_glyphs(&source, &grid, &ramp, Background::Black, row);
            assert!(line.chars().all(|ch| ch == expected), "row {row}: {line}");
        }
    }

    #[test]
    fn crop_keeps_content_on_black_background() {
        let mut canvas = GrayImage::new(10, 10);
        canvas.put_pixel(3, 4, Luma([255]));
        canvas.put_pixel(6, 7, Luma([200]));

        let cropped = crop_to_content(&canvas, Background::Black);
        assert_eq!(cropped.dimensions(), (4, 4));
        assert_eq!(cropped.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn crop_inverts_before_detection_on_white_background() {
        let mut canvas = GrayImage::from_pixel(10, 10, Luma([255]));
        canvas.put_pixel(2, 2, Luma([0]));

        let cropped = crop_to_content(&canvas, Background::White);
        assert_eq!(cropped.dimensions(), (1, 1));
        assert_eq!(cropped.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn uniform_canvas_skips_the_crop() {
        let canvas = GrayImage::from_pixel(8, 8, Luma([255]));
        let cropped = crop_to_content(&canvas, Background::White);
        assert_eq!(cropped.dimensions(), (8, 8));

        let black = GrayImage::new(8, 8);
        assert_eq!(crop_to_content(&black, Background::Black).dimensions(), (8, 8));
    }
}
