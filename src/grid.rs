use crate::error::RenderError;

const FALLBACK_CELL_WIDTH: f32 = 6.0;
const FALLBACK_CELL_HEIGHT: f32 = 12.0;

/// Sampling grid derived from the source dimensions and the requested
/// column count. Pure geometry; never stored beyond the job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGrid {
    pub cell_width: f32,
    pub cell_height: f32,
    pub cols: u32,
    pub rows: u32,
}

impl CellGrid {
    /// Plans the grid. When the requested column count does not fit the
    /// source, falls back to a fixed 6x12 pixel cell; geometry that is
    /// still degenerate after the fallback is a hard error.
    pub fn plan(
        width: u32,
        height: u32,
        num_cols: u32,
        height_scale: f32,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "source raster is {width}x{height}"
            )));
        }
        if num_cols == 0 {
            return Err(RenderError::InvalidGeometry(
                "column count must be greater than zero".to_owned(),
            ));
        }

        let mut cols = num_cols;
        let mut cell_width = width as f32 / cols as f32;
        let mut cell_height = height_scale * cell_width;
        let mut rows = (height as f32 / cell_height) as u32;

        if cols > width || rows > height || rows == 0 {
            cell_width = FALLBACK_CELL_WIDTH;
            cell_height = FALLBACK_CELL_HEIGHT;
            cols = (width as f32 / cell_width) as u32;
            rows = (height as f32 / cell_height) as u32;
        }

        if cols == 0 || rows == 0 {
            return Err(RenderError::InvalidGeometry(format!(
                "no usable cell grid for a {width}x{height} source at {num_cols} columns"
            )));
        }

        Ok(Self {
            cell_width,
            cell_height,
            cols,
            rows,
        })
    }
}
