use super::{FILTER_TABLE_SIZE, MAX_FILTER_SIZE};
use crate::core::base::Float;
use crate::core::filter::FilterFunction;

/// Precomputed reconstruction-filter LUT sampled over one quadrant of the
/// filter support. Negative lobes (Mitchell, Lanczos) are preserved.
pub struct FilterTable {
    table: Vec<Float>,
    filter_width: Float,
    table_scale: Float,
}

impl FilterTable {
    /// `filter_size` is the configured width in pixels; the effective width
    /// is half of it, scaled by the filter's own support factor and clamped
    /// so it covers at least one pixel and at most `MAX_FILTER_SIZE / 2`.
    pub fn new(filter: &dyn FilterFunction, filter_size: Float) -> Self {
        let mut filter_width = 0.5 * filter_size * filter.width_scale();
        filter_width = filter_width.clamp(0.501, 0.5 * MAX_FILTER_SIZE as Float);

        let n = FILTER_TABLE_SIZE;
        let scale = 1.0 / n as Float;
        let mut table = vec![0.0; n * n];
        for y in 0..n {
            for x in 0..n {
                table[y * n + x] =
                    filter.eval((x as Float + 0.5) * scale, (y as Float + 0.5) * scale);
            }
        }

        let table_scale = 0.9999 * n as Float / filter_width;
        FilterTable {
            table,
            filter_width,
            table_scale,
        }
    }

    pub fn filter_width(&self) -> Float {
        return self.filter_width;
    }

    /// Pixels the sample-safe tile borders shrink by.
    pub fn int_filter_width(&self) -> i32 {
        return self.filter_width.ceil() as i32;
    }

    pub fn table_scale(&self) -> Float {
        return self.table_scale;
    }

    /// Table index for a pixel-space distance to the sample position.
    #[inline]
    pub fn index_for(&self, d: f64) -> usize {
        let i = f64::floor(d.abs() * self.table_scale as f64) as usize;
        return i.min(FILTER_TABLE_SIZE - 1);
    }

    #[inline]
    pub fn value_at(&self, xi: usize, yi: usize) -> Float {
        return self.table[yi * FILTER_TABLE_SIZE + xi];
    }
}
