use super::pixel_image::PixelImage;
use super::resample_mask::ResampleMask;
use crate::core::base::Float;
use crate::core::error::FilmError;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum DarkDetection {
    /// Threshold scaled linearly with pixel brightness.
    #[default]
    Linear,
    /// Piecewise-linear threshold curve over pixel brightness.
    Curve,
}

impl DarkDetection {
    pub fn from_name(name: &str) -> Result<DarkDetection, FilmError> {
        match name {
            "linear" => Ok(DarkDetection::Linear),
            "curve" => Ok(DarkDetection::Curve),
            _ => {
                let msg = format!("Dark detection mode \"{}\" unknown.", name);
                return Err(FilmError::error(&msg));
            }
        }
    }
}

/// Noise-detection parameters driving the between-pass AA analysis.
#[derive(Debug, Copy, Clone)]
pub struct AaNoiseParams {
    pub threshold: Float,
    pub dark_detection: DarkDetection,
    pub dark_threshold_factor: Float,
    pub variance_edge_size: i32,
    pub variance_pixels: i32,
    pub clamp_samples: Float,
    pub detect_color_noise: bool,
    pub background_resampling: bool,
}

impl Default for AaNoiseParams {
    fn default() -> Self {
        AaNoiseParams {
            threshold: 0.05,
            dark_detection: DarkDetection::Linear,
            dark_threshold_factor: 0.0,
            variance_edge_size: 10,
            variance_pixels: 0,
            clamp_samples: 0.0,
            detect_color_noise: false,
            background_resampling: true,
        }
    }
}

const DARK_CURVE: [(Float, Float); 13] = [
    (0.10, 0.0001),
    (0.20, 0.0010),
    (0.30, 0.0020),
    (0.40, 0.0035),
    (0.50, 0.0055),
    (0.60, 0.0075),
    (0.70, 0.0100),
    (0.80, 0.0150),
    (0.90, 0.0250),
    (1.00, 0.0400),
    (1.20, 0.0800),
    (1.40, 0.0950),
    (1.80, 0.1000),
];

/// Per-brightness noise threshold, interpolated linearly between the curve
/// keypoints; constant below the first and above the last.
pub fn dark_threshold_curve_interpolate(pixel_brightness: Float) -> Float {
    if pixel_brightness <= DARK_CURVE[0].0 {
        return DARK_CURVE[0].1;
    }
    for i in 1..DARK_CURVE.len() {
        let (b1, t1) = DARK_CURVE[i];
        if pixel_brightness <= b1 {
            let (b0, t0) = DARK_CURVE[i - 1];
            return t0 + (pixel_brightness - b0) * (t1 - t0) / (b1 - b0);
        }
    }
    return DARK_CURVE[DARK_CURVE.len() - 1].1;
}

/// Scans the beauty pass between passes and marks pixels that need more
/// samples in the next pass.
pub struct AdaptiveAaAnalyzer<'a> {
    params: &'a AaNoiseParams,
}

impl<'a> AdaptiveAaAnalyzer<'a> {
    pub fn new(params: &'a AaNoiseParams) -> Self {
        AdaptiveAaAnalyzer { params }
    }

    fn threshold_for(&self, brightness: Float) -> Float {
        match self.params.dark_detection {
            DarkDetection::Linear => {
                if self.params.dark_threshold_factor > 0.0 {
                    let f = self.params.dark_threshold_factor;
                    return self.params.threshold * ((1.0 - f) + brightness * f);
                }
                return self.params.threshold;
            }
            DarkDetection::Curve => {
                return dark_threshold_curve_interpolate(brightness);
            }
        }
    }

    /// Clears the mask and repopulates it from the beauty pass. The optional
    /// sampling-factor pass gates pixels whose material asked for no further
    /// samples, unless background resampling is on.
    pub fn mark_resample(
        &self,
        beauty: &PixelImage,
        sampling_factor: Option<&PixelImage>,
        mask: &mut ResampleMask,
    ) {
        let w = beauty.width() as i32;
        let h = beauty.height() as i32;
        let p = self.params;
        let variance_half_edge = p.variance_edge_size / 2;

        mask.clear_all();

        for y in 0..h - 1 {
            for x in 0..w - 1 {
                // Pixels never rendered at all (e.g. after a partial film
                // load) must get samples regardless of neighbor differences.
                if beauty.get(x as usize, y as usize).weight <= 0.0 {
                    mask.set(x as usize, y as usize);
                }

                if let Some(sf) = sampling_factor {
                    let mat_sample_factor = sf.get(x as usize, y as usize).normalized().r;
                    if !p.background_resampling && mat_sample_factor == 0.0 {
                        continue;
                    }
                }

                let pix_col = beauty.get(x as usize, y as usize).normalized();
                let thresh = self.threshold_for(pix_col.abs_brightness());

                let probe = |nx: i32, ny: i32, mask: &mut ResampleMask| {
                    let n = beauty.get(nx as usize, ny as usize).normalized();
                    if pix_col.color_difference(&n, p.detect_color_noise) >= thresh {
                        mask.set(x as usize, y as usize);
                        mask.set(nx as usize, ny as usize);
                    }
                };
                probe(x + 1, y, mask);
                probe(x, y + 1, mask);
                probe(x + 1, y + 1, mask);
                if x > 0 {
                    probe(x - 1, y + 1, mask);
                }

                if p.variance_pixels > 0 {
                    let mut variance_x = 0;
                    let mut variance_y = 0;

                    for xd in -variance_half_edge..variance_half_edge - 1 {
                        let xi = (x + xd).clamp(0, w - 2);
                        let c0 = beauty.get(xi as usize, y as usize).normalized();
                        let c1 = beauty.get(xi as usize + 1, y as usize).normalized();
                        if c0.color_difference(&c1, p.detect_color_noise) >= thresh {
                            variance_x += 1;
                        }
                    }

                    for yd in -variance_half_edge..variance_half_edge - 1 {
                        let yi = (y + yd).clamp(0, h - 2);
                        let c0 = beauty.get(x as usize, yi as usize).normalized();
                        let c1 = beauty.get(x as usize, yi as usize + 1).normalized();
                        if c0.color_difference(&c1, p.detect_color_noise) >= thresh {
                            variance_y += 1;
                        }
                    }

                    if variance_x + variance_y >= p.variance_pixels {
                        for xd in -variance_half_edge..variance_half_edge {
                            for yd in -variance_half_edge..variance_half_edge {
                                let xi = (x + xd).clamp(0, w - 1);
                                let yi = (y + yd).clamp(0, h - 1);
                                mask.set(xi as usize, yi as usize);
                            }
                        }
                    }
                }
            }
        }
    }
}
