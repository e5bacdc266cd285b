use crate::core::color::Rgba;
use crate::core::passes::PassSet;

/// Consumer of exported film pixels. One or two sinks hang off a film; the
/// film pushes fully export-processed colors (normalized, clamped and
/// color-space encoded) and never reads back.
pub trait SinkWriter: Send {
    /// Writes one pixel for every external pass. Returning `false` aborts
    /// the render.
    fn put_pixel(
        &mut self,
        view: usize,
        x: i32,
        y: i32,
        pass_set: &PassSet,
        colors: &[Rgba],
    ) -> bool;

    /// Writes one pixel of a single external pass (derived passes are
    /// generated per pass after the regular export).
    fn put_pass_pixel(&mut self, view: usize, x: i32, y: i32, ext_index: usize, color: &Rgba)
        -> bool;

    /// Optional visual marker for the tile a worker just claimed.
    fn highlight_area(&mut self, _view: usize, _x0: i32, _y0: i32, _x1: i32, _y1: i32) {}

    /// Region completed; interactive sinks refresh here.
    fn flush_area(&mut self, _view: usize, _x0: i32, _y0: i32, _x1: i32, _y1: i32, _pass_set: &PassSet) {
    }

    /// Commits everything written so far (e.g. encodes image files).
    fn flush(&mut self, view: usize, pass_set: &PassSet);

    /// True when flushing this sink produces image files.
    fn is_image_output(&self) -> bool;

    /// True for throwaway preview renders (material previews and the like);
    /// previews skip film persistence.
    fn is_preview(&self) -> bool {
        return false;
    }

    fn denoise_params(&self) -> String {
        return String::new();
    }

    /// True when the sink wants the resample mask painted between passes.
    fn show_resample_mask(&self) -> bool {
        return false;
    }
}

/// In-memory sink retaining the last written color per pass and pixel. Used
/// by the test suite and as a reference implementation for embedders.
pub struct CaptureSink {
    width: usize,
    height: usize,
    num_passes: usize,
    pixels: Vec<Rgba>,
    pub flush_count: usize,
    pub flushed_areas: Vec<(i32, i32, i32, i32)>,
    pub highlighted: Vec<(i32, i32, i32, i32)>,
    /// When set, `put_pixel` refuses every write.
    pub refuse_pixels: bool,
    pub image_output: bool,
    /// When set, the film paints the resample mask between passes.
    pub show_mask: bool,
}

impl CaptureSink {
    pub fn new(width: usize, height: usize, num_passes: usize) -> Self {
        CaptureSink {
            width,
            height,
            num_passes,
            pixels: vec![Rgba::zero(); width * height * num_passes],
            flush_count: 0,
            flushed_areas: Vec::new(),
            highlighted: Vec::new(),
            refuse_pixels: false,
            image_output: true,
            show_mask: false,
        }
    }

    pub fn get(&self, ext_index: usize, x: usize, y: usize) -> Rgba {
        return self.pixels[(y * self.width + x) * self.num_passes + ext_index];
    }
}

impl SinkWriter for CaptureSink {
    fn put_pixel(
        &mut self,
        _view: usize,
        x: i32,
        y: i32,
        _pass_set: &PassSet,
        colors: &[Rgba],
    ) -> bool {
        if self.refuse_pixels {
            return false;
        }
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return true;
        }
        let base = (y as usize * self.width + x as usize) * self.num_passes;
        for (i, c) in colors.iter().enumerate().take(self.num_passes) {
            self.pixels[base + i] = *c;
        }
        return true;
    }

    fn put_pass_pixel(
        &mut self,
        _view: usize,
        x: i32,
        y: i32,
        ext_index: usize,
        color: &Rgba,
    ) -> bool {
        if self.refuse_pixels {
            return false;
        }
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return true;
        }
        if ext_index >= self.num_passes {
            return true;
        }
        self.pixels[(y as usize * self.width + x as usize) * self.num_passes + ext_index] = *color;
        return true;
    }

    fn highlight_area(&mut self, _view: usize, x0: i32, y0: i32, x1: i32, y1: i32) {
        self.highlighted.push((x0, y0, x1, y1));
    }

    fn flush_area(&mut self, _view: usize, x0: i32, y0: i32, x1: i32, y1: i32, _pass_set: &PassSet) {
        self.flushed_areas.push((x0, y0, x1, y1));
    }

    fn flush(&mut self, _view: usize, _pass_set: &PassSet) {
        self.flush_count += 1;
    }

    fn is_image_output(&self) -> bool {
        return self.image_output;
    }

    fn show_resample_mask(&self) -> bool {
        return self.show_mask;
    }
}
