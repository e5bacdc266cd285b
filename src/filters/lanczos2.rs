use crate::core::base::Float;
use crate::core::filter::FilterFunction;

use std::f32::consts::{FRAC_PI_2, PI};

/// Lanczos sinc window of size 2.
pub struct Lanczos2Filter;

impl FilterFunction for Lanczos2Filter {
    fn eval(&self, dx: Float, dy: Float) -> Float {
        let x = Float::sqrt(dx * dx + dy * dy);
        if x == 0.0 {
            return 1.0;
        }
        if -2.0 < x && x < 2.0 {
            let a = PI * x;
            let b = FRAC_PI_2 * x;
            return (Float::sin(a) * Float::sin(b)) / (a * b);
        }
        return 0.0;
    }
}
