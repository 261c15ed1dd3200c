use std::path::Path;

use image::{imageops, imageops::FilterType, DynamicImage, RgbImage};

use crate::decoding::{probe, VideoSource};
use crate::encoding::{intermediate_path, transcode, FramePipe, TempArtifact};
use crate::error::RenderError;
use crate::glyphs;
use crate::glyphs::GlyphPaint;
use crate::grid::CellGrid;
use crate::render::{render_color, render_mono, LineHeight};
use crate::schema::{RenderVariant, VideoOptions};

/// Pixels kept between the overlay and the canvas edge in color mode;
/// mono pastes flush to the corner.
const COLOR_OVERLAY_MARGIN: u32 = 5;

/// Runs one video job start to finish: probe, render every frame in
/// order into the intermediate container, then transcode to the delivery
/// format. The intermediate artifact is removed on every exit path.
pub fn run(input: &Path, output: &Path, options: &VideoOptions) -> Result<(), RenderError> {
    options.validate()?;

    let info = probe(input)?;
    let fps = resolve_fps(options.fps, info.fps);

    let mut glyph_set = glyphs::load(&options.render)?;
    // Geometry is fixed for the whole job from the first frame's
    // dimensions; the decoder scales any drifting frame back to them.
    let grid = CellGrid::plan(
        info.width,
        info.height,
        options.render.num_cols,
        glyph_set.height_scale,
    )?;
    let (cell_w, cell_h) = glyph_set.painter.cell_size();
    let out_width = cell_w * grid.cols;
    let out_height = cell_h * grid.rows * 2;
    if out_width == 0 || out_height == 0 {
        return Err(RenderError::InvalidGeometry(format!(
            "computed output canvas is {out_width}x{out_height}"
        )));
    }

    let source = VideoSource::open(input, info.width, info.height)?;
    let intermediate = TempArtifact::new(intermediate_path(output));
    let writer = FramePipe::spawn(intermediate.path(), out_width, out_height, fps, &options.codec)?;

    eprintln!(
        "[glyphcast] {} -> {} ({}x{} cells, {out_width}x{out_height} canvas, {fps} fps)",
        input.display(),
        output.display(),
        grid.cols,
        grid.rows
    );

    let mut frame_index: u64 = 0;
    while let Some(raw) = source.read_frame() {
        let frame = RgbImage::from_raw(info.width, info.height, raw).ok_or_else(|| {
            RenderError::SourceUnreadable {
                path: input.to_path_buf(),
                reason: "decoder produced a short frame".to_owned(),
            }
        })?;

        let mut canvas = match options.variant {
            RenderVariant::Mono => {
                let luma = imageops::grayscale(&frame);
                let gray = render_mono(
                    &luma,
                    &grid,
                    &glyph_set.ramp,
                    &mut glyph_set.painter,
                    options.render.background,
                    LineHeight::Double,
                )?;
                DynamicImage::ImageLuma8(gray).to_rgb8()
            }
            RenderVariant::Color => render_color(
                &frame,
                &grid,
                &glyph_set.ramp,
                &mut glyph_set.painter,
                options.render.background,
            )?,
        };

        if options.overlay_ratio > 0.0 {
            let margin = match options.variant {
                RenderVariant::Mono => 0,
                RenderVariant::Color => COLOR_OVERLAY_MARGIN,
            };
            composite_overlay(&mut canvas, &frame, options.overlay_ratio, margin);
        }

        writer.write_frame(canvas.into_raw())?;

        frame_index += 1;
        if frame_index % 30 == 0 {
            eprintln!("rendered frame {frame_index}");
        }
    }

    source.finish()?;
    if frame_index == 0 {
        // Settle the writer before the intermediate guard cleans up
        // whatever ffmpeg managed to create.
        let _ = writer.finish();
        return Err(RenderError::EmptySource(input.to_path_buf()));
    }
    writer.finish()?;

    transcode(intermediate.path(), output)?;
    eprintln!("[glyphcast] wrote {} ({frame_index} frames)", output.display());
    Ok(())
}

/// Declared output rate, or the source's native rate when unset. Only
/// the container's declared rate changes; the frame count never does.
fn resolve_fps(requested: u32, native: f64) -> f64 {
    if requested != 0 {
        f64::from(requested)
    } else {
        native
    }
}

/// Pastes a shrunken copy of the original frame into the canvas's
/// bottom-right corner.
fn composite_overlay(canvas: &mut RgbImage, frame: &RgbImage, ratio: f32, margin: u32) {
    let (canvas_w, canvas_h) = canvas.dimensions();
    let max_w = canvas_w.saturating_sub(2 * margin);
    let max_h = canvas_h.saturating_sub(2 * margin);
    if max_w == 0 || max_h == 0 {
        return;
    }

    let overlay_w = ((canvas_w as f32 * ratio) as u32).clamp(1, max_w);
    let overlay_h = ((canvas_h as f32 * ratio) as u32).clamp(1, max_h);
    let overlay = imageops::resize(frame, overlay_w, overlay_h, FilterType::Triangle);

    let x = i64::from(canvas_w - overlay_w - margin);
    let y = i64::from(canvas_h - overlay_h - margin);
    imageops::replace(canvas, &overlay, x, y);
}
