use crate::core::base::Float;
use crate::core::filter::FilterFunction;

// exp(-6), so the curve reaches zero exactly at the filter edge.
const GAUSS_EXP: Float = 0.00247875;

pub struct GaussFilter;

impl FilterFunction for GaussFilter {
    fn eval(&self, dx: Float, dy: Float) -> Float {
        let r2 = dx * dx + dy * dy;
        return Float::max(0.0, Float::exp(-6.0 * r2) - GAUSS_EXP);
    }

    fn width_scale(&self) -> Float {
        return 2.0;
    }
}
