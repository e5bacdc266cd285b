use crate::core::base::Float;
use crate::core::error::FilmError;

/// Radially symmetric reconstruction filter, evaluated on the positive
/// quadrant with `dx`, `dy` in `[0, 1]` (1.0 = the filter width).
pub trait FilterFunction: Send + Sync {
    fn eval(&self, dx: Float, dy: Float) -> Float;

    /// Factor applied to the nominal filter width so the table covers the
    /// filter's true support.
    fn width_scale(&self) -> Float {
        return 1.0;
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum FilterType {
    #[default]
    Box,
    Gauss,
    Mitchell,
    Lanczos2,
}

impl FilterType {
    pub fn from_name(name: &str) -> Result<FilterType, FilmError> {
        match name {
            "box" => Ok(FilterType::Box),
            "gauss" => Ok(FilterType::Gauss),
            "mitchell" => Ok(FilterType::Mitchell),
            "lanczos2" => Ok(FilterType::Lanczos2),
            _ => {
                let msg = format!("Filter \"{}\" unknown.", name);
                return Err(FilmError::error(&msg));
            }
        }
    }
}
