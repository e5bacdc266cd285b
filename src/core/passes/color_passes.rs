use super::pass_type::*;
use crate::core::color::Rgba;

/// One sample's color for every pass type, filled by the sample source and
/// consumed by `Film::add_sample`.
#[derive(Debug, Default, Copy, Clone)]
pub struct ColorPasses {
    colors: [Rgba; NUM_INT_PASS_TYPES],
}

impl ColorPasses {
    pub fn new() -> Self {
        ColorPasses::default()
    }

    #[inline]
    pub fn set(&mut self, t: IntPassType, c: Rgba) {
        self.colors[t.index()] = c;
    }

    #[inline]
    pub fn get(&self, t: IntPassType) -> Rgba {
        return self.colors[t.index()];
    }
}
