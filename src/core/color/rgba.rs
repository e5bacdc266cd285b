use crate::core::base::Float;
use serde::{Deserialize, Serialize};
use std::ops;

const YWEIGHT: [Float; 3] = [0.212671, 0.715160, 0.072169];

/// Exponent applied per channel before the noise-detection difference.
const NOISE_GAMMA: Float = 1.0 / 2.2;

/// Linear, unclamped, unbounded RGBA sample color.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct Rgba {
    pub r: Float,
    pub g: Float,
    pub b: Float,
    pub a: Float,
}

/// Alpha-less color used by the density accumulator.
#[derive(Debug, Default, PartialEq, Copy, Clone, Serialize, Deserialize)]
pub struct Rgb {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl Rgba {
    #[inline]
    pub fn new(r: Float, g: Float, b: Float, a: Float) -> Self {
        Rgba { r, g, b, a }
    }

    #[inline]
    pub fn zero() -> Self {
        Rgba::default()
    }

    #[inline]
    pub fn gray(v: Float) -> Self {
        Rgba::new(v, v, v, 1.0)
    }

    pub fn from_rgb(c: &Rgb, a: Float) -> Self {
        Rgba::new(c.r, c.g, c.b, a)
    }

    pub fn to_rgb(&self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }

    pub fn max_rgb_component(&self) -> Float {
        return Float::max(self.r, Float::max(self.g, self.b));
    }

    /// Rec.709 luma of the absolute channel values.
    pub fn abs_brightness(&self) -> Float {
        return YWEIGHT[0] * self.r.abs() + YWEIGHT[1] * self.g.abs() + YWEIGHT[2] * self.b.abs();
    }

    /// Difference measure driving the adaptive AA comparisons.
    ///
    /// Exact formula: the base difference is `|bri(a) - bri(b)|` with
    /// `bri(c) = 0.212671*|R| + 0.715160*|G| + 0.072169*|B|`. With
    /// `detect_color_noise` the result is the maximum of the base difference
    /// and the per-channel differences `||a_c|^(1/2.2) - |b_c|^(1/2.2)|`,
    /// so chroma-only noise registers even when brightness matches.
    pub fn color_difference(&self, other: &Rgba, detect_color_noise: bool) -> Float {
        let mut diff = (self.abs_brightness() - other.abs_brightness()).abs();
        if detect_color_noise {
            let g = |v: Float| -> Float { v.abs().powf(NOISE_GAMMA) };
            diff = diff.max((g(self.r) - g(other.r)).abs());
            diff = diff.max((g(self.g) - g(other.g)).abs());
            diff = diff.max((g(self.b) - g(other.b)).abs());
        }
        return diff;
    }

    /// Clamps negative RGB to zero; alpha is left alone.
    pub fn clamp_rgb0(&mut self) {
        self.r = self.r.max(0.0);
        self.g = self.g.max(0.0);
        self.b = self.b.max(0.0);
    }

    pub fn clamp_alpha01(&mut self) {
        self.a = self.a.clamp(0.0, 1.0);
    }

    /// Rounds RGB up to the nearest integer, reversing anti-aliased blending
    /// of absolute index passes.
    pub fn ceil_rgb(&mut self) {
        self.r = self.r.ceil();
        self.g = self.g.ceil();
        self.b = self.b.ceil();
    }

    /// Scales RGB so the maximum component does not exceed `max`, keeping the
    /// channel ratios. A `max` of zero disables clamping.
    pub fn clamp_proportional_rgb(&mut self, max: Float) {
        if max > 0.0 {
            let m = self.max_rgb_component();
            if m > max {
                let s = max / m;
                self.r *= s;
                self.g *= s;
                self.b *= s;
            }
        }
    }

    pub fn alpha_premultiply(&mut self) {
        self.r *= self.a;
        self.g *= self.a;
        self.b *= self.a;
    }

    /// `self = self*(1-factor) + other*factor` on RGB.
    pub fn blend_rgb(&mut self, other: &Rgba, factor: Float) {
        self.r = self.r * (1.0 - factor) + other.r * factor;
        self.g = self.g * (1.0 - factor) + other.g * factor;
        self.b = self.b * (1.0 - factor) + other.b * factor;
    }
}

impl Rgb {
    #[inline]
    pub fn new(r: Float, g: Float, b: Float) -> Self {
        Rgb { r, g, b }
    }

    #[inline]
    pub fn zero() -> Self {
        Rgb::default()
    }

    /// Hue in `[0, 6)`, saturation and value unclamped.
    pub fn to_hsv(&self) -> (Float, Float, Float) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;
        let v = max;
        let s = if max > 0.0 { delta / max } else { 0.0 };
        let h = if delta <= 0.0 {
            0.0
        } else if max == self.r {
            ((self.g - self.b) / delta).rem_euclid(6.0)
        } else if max == self.g {
            (self.b - self.r) / delta + 2.0
        } else {
            (self.r - self.g) / delta + 4.0
        };
        return (h, s, v);
    }

    pub fn from_hsv(h: Float, s: Float, v: Float) -> Self {
        let h = h.rem_euclid(6.0);
        let i = h.floor();
        let f = h - i;
        let p = v * (1.0 - s);
        let q = v * (1.0 - s * f);
        let t = v * (1.0 - s * (1.0 - f));
        let (r, g, b) = match i as i32 {
            0 => (v, t, p),
            1 => (q, v, p),
            2 => (p, v, t),
            3 => (p, q, v),
            4 => (t, p, v),
            _ => (v, p, q),
        };
        return Rgb::new(r, g, b);
    }
}

impl ops::Add for Rgba {
    type Output = Rgba;
    fn add(self, rhs: Rgba) -> Rgba {
        Rgba::new(
            self.r + rhs.r,
            self.g + rhs.g,
            self.b + rhs.b,
            self.a + rhs.a,
        )
    }
}

impl ops::AddAssign for Rgba {
    fn add_assign(&mut self, rhs: Rgba) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
        self.a += rhs.a;
    }
}

impl ops::Mul<Float> for Rgba {
    type Output = Rgba;
    fn mul(self, s: Float) -> Rgba {
        Rgba::new(self.r * s, self.g * s, self.b * s, self.a * s)
    }
}

impl ops::Add for Rgb {
    type Output = Rgb;
    fn add(self, rhs: Rgb) -> Rgb {
        Rgb::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl ops::AddAssign for Rgb {
    fn add_assign(&mut self, rhs: Rgb) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl ops::Mul<Float> for Rgb {
    type Output = Rgb;
    fn mul(self, s: Float) -> Rgb {
        Rgb::new(self.r * s, self.g * s, self.b * s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_is_luma_weighted() {
        let c = Rgba::new(1.0, 0.0, 0.0, 1.0);
        assert!((c.abs_brightness() - 0.212671).abs() < 1e-6);
        let w = Rgba::gray(1.0);
        assert!((w.abs_brightness() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn color_difference_detects_chroma_noise() {
        // Equal brightness, different hue.
        let a = Rgba::new(0.5, 0.2, 0.1, 1.0);
        let bri = a.abs_brightness();
        let b = Rgba::new(0.1, 0.2, 0.5 + (0.4 * YWEIGHT[0] - 0.4 * YWEIGHT[2]) / YWEIGHT[2], 1.0);
        assert!((b.abs_brightness() - bri).abs() < 1e-4);
        assert!(a.color_difference(&b, false) < 1e-3);
        assert!(a.color_difference(&b, true) > 0.1);
    }

    #[test]
    fn proportional_clamp_keeps_ratios() {
        let mut c = Rgba::new(4.0, 2.0, 1.0, 1.0);
        c.clamp_proportional_rgb(2.0);
        assert_eq!(c.r, 2.0);
        assert_eq!(c.g, 1.0);
        assert_eq!(c.b, 0.5);
        let mut d = Rgba::new(4.0, 2.0, 1.0, 1.0);
        d.clamp_proportional_rgb(0.0);
        assert_eq!(d.r, 4.0);
    }

    #[test]
    fn hsv_round_trip() {
        let c = Rgb::new(0.8, 0.3, 0.1);
        let (h, s, v) = c.to_hsv();
        let back = Rgb::from_hsv(h, s, v);
        assert!((back.r - c.r).abs() < 1e-5);
        assert!((back.g - c.g).abs() < 1e-5);
        assert!((back.b - c.b).abs() < 1e-5);
    }
}
