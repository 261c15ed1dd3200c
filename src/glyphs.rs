use std::collections::HashMap;
use std::fs;

use fontdue::{Font, FontSettings, Metrics};
use image::{GrayImage, Rgb, RgbImage};

use crate::charset::GlyphRamp;
use crate::error::RenderError;
use crate::schema::{FontProfile, RenderOptions};

/// Draw seam between the grid-walking renderers and the rasterizer, so
/// tests can substitute a deterministic painter.
pub trait GlyphPaint {
    /// Uniform glyph cell: (advance width, line height) in pixels.
    fn cell_size(&self) -> (u32, u32);

    /// Paints a run of same-advance glyphs onto a luminance canvas at a
    /// pixel offset with a single fill value.
    fn draw_row_gray(&mut self, canvas: &mut GrayImage, x: u32, y: u32, text: &str, fill: u8);

    /// Paints one glyph onto a color canvas at a pixel offset.
    fn draw_glyph_rgb(&mut self, canvas: &mut RgbImage, x: u32, y: u32, glyph: char, fill: Rgb<u8>);
}

/// Everything one job needs to turn cell samples into painted glyphs:
/// the ramp, the rasterizer and the planner's aspect factor. Loaded once
/// per job; read-only apart from the painter's internal bitmap cache.
pub struct GlyphSet {
    pub ramp: GlyphRamp,
    pub painter: FontPainter,
    pub height_scale: f32,
}

pub fn load(options: &RenderOptions) -> Result<GlyphSet, RenderError> {
    let ramp = GlyphRamp::for_charset(options.charset);
    let painter = FontPainter::new(&options.font, options.px_size())?;
    Ok(GlyphSet {
        ramp,
        painter,
        height_scale: options.font.height_scale,
    })
}

struct CachedGlyph {
    metrics: Metrics,
    coverage: Vec<u8>,
}

/// Monospaced glyph rasterizer over a fontdue font, with a per-job glyph
/// bitmap cache. The cell is measured once from the profile's sample
/// character; proportional fonts are still drawn at that uniform advance,
/// which may look off but is not an error.
pub struct FontPainter {
    font: Font,
    px_size: f32,
    cell_width: u32,
    cell_height: u32,
    ascent: i32,
    cache: HashMap<char, CachedGlyph>,
}

impl FontPainter {
    pub fn new(profile: &FontProfile, px_size: f32) -> Result<Self, RenderError> {
        let bytes = fs::read(&profile.path).map_err(|error| RenderError::ResourceNotFound {
            path: profile.path.clone(),
            reason: error.to_string(),
        })?;
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|error| {
            RenderError::ResourceNotFound {
                path: profile.path.clone(),
                reason: format!("font did not parse: {error}"),
            }
        })?;

        let sample = font.metrics(profile.sample_char, px_size);
        let mut cell_width = sample.advance_width.ceil() as u32;
        let mut cell_height = sample.height as u32;
        // Fonts occasionally report an empty box for the sample character;
        // fall back to the declared size as the original pipeline did.
        if cell_width == 0 {
            cell_width = (px_size / 2.0).ceil().max(1.0) as u32;
        }
        if cell_height == 0 {
            cell_height = px_size.ceil().max(1.0) as u32;
        }

        let ascent = font
            .horizontal_line_metrics(px_size)
            .map(|metrics| metrics.ascent.round() as i32)
            .unwrap_or(cell_height as i32);

        Ok(Self {
            font,
            px_size,
            cell_width,
            cell_height,
            ascent,
            cache: HashMap::new(),
        })
    }

    fn rasterized(&mut self, glyph: char) -> &CachedGlyph {
        let font = &self.font;
        let px_size = self.px_size;
        self.cache.entry(glyph).or_insert_with(|| {
            let (metrics, coverage) = font.rasterize(glyph, px_size);
            CachedGlyph { metrics, coverage }
        })
    }

    fn blend<const CHANNELS: usize>(
        cached: &CachedGlyph,
        buffer: &mut [u8],
        canvas_width: u32,
        canvas_height: u32,
        origin_x: i64,
        origin_y: i64,
        ascent: i64,
        fill: [u8; CHANNELS],
    ) {
        let metrics = &cached.metrics;
        let top = origin_y + ascent - i64::from(metrics.ymin) - metrics.height as i64;
        let left = origin_x + i64::from(metrics.xmin);

        for row in 0..metrics.height {
            let py = top + row as i64;
            if py < 0 || py >= i64::from(canvas_height) {
                continue;
            }
            for col in 0..metrics.width {
                let px = left + col as i64;
                if px < 0 || px >= i64::from(canvas_width) {
                    continue;
                }
                let alpha = u16::from(cached.coverage[row * metrics.width + col]);
                if alpha == 0 {
                    continue;
                }
                let inv_alpha = 255 - alpha;
                let idx = (py as usize * canvas_width as usize + px as usize) * CHANNELS;
                for channel in 0..CHANNELS {
                    let dst = u16::from(buffer[idx + channel]);
                    let src = u16::from(fill[channel]);
                    buffer[idx + channel] = ((src * alpha + dst * inv_alpha + 127) / 255) as u8;
                }
            }
        }
    }
}

impl GlyphPaint for FontPainter {
    fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    fn draw_row_gray(&mut self, canvas: &mut GrayImage, x: u32, y: u32, text: &str, fill: u8) {
        let (canvas_width, canvas_height) = canvas.dimensions();
        let advance = i64::from(self.cell_width);
        let ascent = i64::from(self.ascent);
        for (index, glyph) in text.chars().enumerate() {
            let cached = self.rasterized(glyph);
            Self::blend::<1>(
                cached,
                &mut **canvas,
                canvas_width,
                canvas_height,
                i64::from(x) + index as i64 * advance,
                i64::from(y),
                ascent,
                [fill],
            );
        }
    }

    fn draw_glyph_rgb(
        &mut self,
        canvas: &mut RgbImage,
        x: u32,
        y: u32,
        glyph: char,
        fill: Rgb<u8>,
    ) {
        let (canvas_width, canvas_height) = canvas.dimensions();
        let ascent = i64::from(self.ascent);
        let cached = self.rasterized(glyph);
        Self::blend::<3>(
            cached,
            &mut **canvas,
            canvas_width,
            canvas_height,
            i64::from(x),
            i64::from(y),
            ascent,
            fill.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_file_is_resource_not_found() {
        let profile = FontProfile {
            path: "does/not/exist.ttf".into(),
            ..FontProfile::default()
        };
        let result = FontPainter::new(&profile, 10.0);
        assert!(matches!(
            result,
            Err(RenderError::ResourceNotFound { .. })
        ));
    }

    #[test]
    fn unparseable_font_bytes_are_resource_not_found() {
        let dir = tempfile::tempdir().expect("tempdir should create");
        let path = dir.path().join("bogus.ttf");
        std::fs::write(&path, b"definitely not a font").expect("fixture should write");

        let profile = FontProfile {
            path,
            ..FontProfile::default()
        };
        assert!(matches!(
            FontPainter::new(&profile, 10.0),
            Err(RenderError::ResourceNotFound { .. })
        ));
    }

    #[test]
    fn load_propagates_missing_font() {
        let options = RenderOptions {
            font: FontProfile {
                path: "does/not/exist.ttf".into(),
                ..FontProfile::default()
            },
            ..RenderOptions::default()
        };
        assert!(matches!(
            load(&options),
            Err(RenderError::ResourceNotFound { .. })
        ));
    }
}
