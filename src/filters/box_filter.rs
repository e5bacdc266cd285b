use crate::core::base::Float;
use crate::core::filter::FilterFunction;

pub struct BoxFilter;

impl FilterFunction for BoxFilter {
    fn eval(&self, _dx: Float, _dy: Float) -> Float {
        return 1.0;
    }
}
