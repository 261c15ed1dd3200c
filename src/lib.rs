//! Character-mosaic rendering: turns a raster image or a video's frame
//! sequence into a raster of monospaced glyphs approximating the
//! source's luminance (and, in the color variant, chrominance)
//! structure. Persistence, HTTP exposure and storage are collaborator
//! concerns; this crate only renders.

pub mod charset;
pub mod decoding;
pub mod encoding;
pub mod error;
pub mod glyphs;
pub mod grid;
pub mod reduce;
pub mod render;
pub mod schema;
pub mod video;

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat};

use crate::error::RenderError;
use crate::grid::CellGrid;
use crate::render::LineHeight;
use crate::schema::{RenderOptions, VideoOptions};

/// Renders encoded image bytes into a cropped grayscale character mosaic,
/// returned as PNG bytes.
pub fn render_image(bytes: &[u8], options: &RenderOptions) -> Result<Vec<u8>, RenderError> {
    options.validate()?;

    let luma = image::load_from_memory(bytes)?.to_luma8();
    let mut glyph_set = glyphs::load(options)?;
    let grid = CellGrid::plan(
        luma.width(),
        luma.height(),
        options.num_cols,
        glyph_set.height_scale,
    )?;

    let canvas = render::render_mono(
        &luma,
        &grid,
        &glyph_set.ramp,
        &mut glyph_set.painter,
        options.background,
        LineHeight::Single,
    )?;
    let cropped = render::crop_to_content(&canvas, options.background);

    let mut encoded = Vec::new();
    DynamicImage::ImageLuma8(cropped)
        .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
        .map_err(|error| RenderError::WriterInitFailure(format!("png encode failed: {error}")))?;
    Ok(encoded)
}

/// Renders a source video into a character-mosaic video at `output`.
/// Both paths are owned by the caller; the job only creates (and always
/// removes) its own intermediate artifact.
pub fn render_video(input: &Path, output: &Path, options: &VideoOptions) -> Result<(), RenderError> {
    video::run(input, output, options)
}
