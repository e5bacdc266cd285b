use super::box_filter::BoxFilter;
use super::gauss::GaussFilter;
use super::lanczos2::Lanczos2Filter;
use super::mitchell::MitchellFilter;
use crate::core::filter::{FilterFunction, FilterType};

pub fn create_filter(filter_type: FilterType) -> Box<dyn FilterFunction> {
    match filter_type {
        FilterType::Box => Box::new(BoxFilter),
        FilterType::Gauss => Box::new(GaussFilter),
        FilterType::Mitchell => Box::new(MitchellFilter),
        FilterType::Lanczos2 => Box::new(Lanczos2Filter),
    }
}
