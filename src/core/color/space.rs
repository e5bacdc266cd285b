use super::rgba::Rgba;
use crate::core::base::Float;
use crate::core::error::FilmError;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum ColorSpace {
    /// No transfer curve, gamma ignored.
    #[default]
    LinearRgb,
    /// Standard sRGB transfer curve, gamma ignored.
    Srgb,
    /// Plain `v^(1/gamma)` encoding.
    RawManualGamma,
}

impl ColorSpace {
    pub fn from_name(name: &str) -> Result<ColorSpace, FilmError> {
        match name {
            "linear_rgb" => Ok(ColorSpace::LinearRgb),
            "srgb" => Ok(ColorSpace::Srgb),
            "raw_manual_gamma" => Ok(ColorSpace::RawManualGamma),
            _ => {
                let msg = format!("Color space \"{}\" unknown.", name);
                return Err(FilmError::error(&msg));
            }
        }
    }
}

fn srgb_encode(v: Float) -> Float {
    if v <= 0.0031308 {
        return 12.92 * v;
    } else {
        return 1.055 * v.powf(1.0 / 2.4) - 0.055;
    }
}

impl Rgba {
    /// Encodes linear RGB into the sink color space. Alpha stays linear.
    pub fn color_space_from_linear_rgb(&mut self, color_space: ColorSpace, gamma: Float) {
        match color_space {
            ColorSpace::LinearRgb => {}
            ColorSpace::Srgb => {
                self.r = srgb_encode(self.r);
                self.g = srgb_encode(self.g);
                self.b = srgb_encode(self.b);
            }
            ColorSpace::RawManualGamma => {
                if gamma > 0.0 && gamma != 1.0 {
                    let e = 1.0 / gamma;
                    self.r = self.r.powf(e);
                    self.g = self.g.powf(e);
                    self.b = self.b.powf(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_is_identity() {
        let mut c = Rgba::new(0.25, 0.5, 2.0, 0.5);
        c.color_space_from_linear_rgb(ColorSpace::LinearRgb, 2.2);
        assert_eq!(c, Rgba::new(0.25, 0.5, 2.0, 0.5));
    }

    #[test]
    fn manual_gamma_encodes_rgb_only() {
        let mut c = Rgba::new(0.25, 1.0, 0.0, 0.5);
        c.color_space_from_linear_rgb(ColorSpace::RawManualGamma, 2.0);
        assert!((c.r - 0.5).abs() < 1e-6);
        assert_eq!(c.g, 1.0);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.a, 0.5);
    }

    #[test]
    fn srgb_linear_segment() {
        let mut c = Rgba::new(0.001, 0.0, 0.0, 1.0);
        c.color_space_from_linear_rgb(ColorSpace::Srgb, 1.0);
        assert!((c.r - 0.01292).abs() < 1e-6);
    }
}
