//! Derived edge and toon passes.
//!
//! Faces edges come from the geometric normal plus depth, object edges and
//! the toon pass from the smooth normal plus depth and the beauty pass.
//! All of it needs the convolution backend from the `image` crate; without
//! the `edge-detection` feature these passes emit zeros.

use super::film::Film;
use crate::core::color::Rgba;
use crate::core::passes::IntPassType;
#[cfg(not(feature = "edge-detection"))]
use log::warn;

#[cfg(feature = "edge-detection")]
mod detection {
    use super::super::film::{Film, FilmImages};
    use super::super::pixel_image::PixelImage;
    use crate::core::base::Float;
    use crate::core::color::Rgba;
    use crate::core::passes::IntPassType;
    use image::{imageops, ImageBuffer, Luma, Rgb as ImageRgb};
    use rayon::prelude::*;

    pub(super) type GrayBuf = ImageBuffer<Luma<f32>, Vec<f32>>;
    pub(super) type RgbBuf = ImageBuffer<ImageRgb<f32>, Vec<f32>>;

    // OpenCV-style Laplacian aperture for kernel size 3.
    const LAPLACIAN: [f32; 9] = [2.0, 0.0, 2.0, 0.0, -8.0, 0.0, 2.0, 0.0, 2.0];

    /// k x k mean filter with replicated borders.
    fn mean_filter(img: &GrayBuf, k: i32) -> GrayBuf {
        let (w, h) = img.dimensions();
        let mut out = GrayBuf::new(w, h);
        let norm = 1.0 / (k * k) as f32;
        let half = k / 2;
        for y in 0..h as i32 {
            for x in 0..w as i32 {
                let mut sum = 0.0;
                for dy in -half..k - half {
                    for dx in -half..k - half {
                        let sx = (x + dx).clamp(0, w as i32 - 1) as u32;
                        let sy = (y + dy).clamp(0, h as i32 - 1) as u32;
                        sum += img.get_pixel(sx, sy).0[0];
                    }
                }
                out.put_pixel(x as u32, y as u32, Luma([sum * norm]));
            }
        }
        return out;
    }

    /// Laplacian per channel, channel-wise max, binary threshold, optional
    /// mean-filter dilation re-thresholded at 0.1 and optional Gaussian
    /// smoothing. Returns the scalar edge image.
    pub(super) fn edge_image_detection(
        channels: Vec<GrayBuf>,
        edge_threshold: Float,
        edge_thickness: i32,
        smoothness: Float,
    ) -> GrayBuf {
        let mut combined: Option<GrayBuf> = None;
        for img in channels.iter() {
            let lap = imageops::filter3x3(img, &LAPLACIAN);
            combined = Some(match combined {
                None => lap,
                Some(mut acc) => {
                    for (a, l) in acc.pixels_mut().zip(lap.pixels()) {
                        a.0[0] = a.0[0].max(l.0[0]);
                    }
                    acc
                }
            });
        }
        let mut edges = combined.expect("edge detection needs at least one channel");

        for p in edges.pixels_mut() {
            p.0[0] = if p.0[0] > edge_threshold { 1.0 } else { 0.0 };
        }

        if edge_thickness > 1 {
            edges = mean_filter(&edges, edge_thickness);
            for p in edges.pixels_mut() {
                p.0[0] = if p.0[0] > 0.1 { 1.0 } else { 0.0 };
            }
        }

        if smoothness > 0.0 {
            edges = imageops::blur(&edges, smoothness);
        }
        return edges;
    }

    /// Normal + depth split into four scalar planes over the given region.
    pub(super) fn normal_depth_planes(
        normal: &PixelImage,
        depth: &PixelImage,
        width: usize,
        height: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
    ) -> Vec<GrayBuf> {
        let mut combined = vec![[0f32; 4]; width * height];
        combined
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(j, row)| {
                if (j as i32) < ystart || (j as i32) >= yend {
                    return;
                }
                for (i, texel) in row
                    .iter_mut()
                    .enumerate()
                    .take(xend as usize)
                    .skip(xstart.max(0) as usize)
                {
                    let n = normal.get(i, j).normalized();
                    let z = depth.get(i, j).normalized().a;
                    *texel = [n.r, n.g, n.b, z];
                }
            });

        let mut planes = Vec::with_capacity(4);
        for c in 0..4 {
            let data: Vec<f32> = combined.iter().map(|t| t[c]).collect();
            planes.push(GrayBuf::from_raw(width as u32, height as u32, data).unwrap());
        }
        return planes;
    }

    pub(super) fn beauty_plane(
        images: &FilmImages,
        width: usize,
        height: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
    ) -> RgbBuf {
        let beauty = &images.passes[0];
        let mut data = vec![0f32; width * height * 3];
        data.par_chunks_mut(width * 3)
            .enumerate()
            .for_each(|(j, row)| {
                if (j as i32) < ystart || (j as i32) >= yend {
                    return;
                }
                for i in xstart.max(0) as usize..xend as usize {
                    let c = beauty.get(i, j).normalized();
                    row[3 * i] = c.r;
                    row[3 * i + 1] = c.g;
                    row[3 * i + 2] = c.b;
                }
            });
        return RgbBuf::from_raw(width as u32, height as u32, data).unwrap();
    }

    pub(super) fn find_pass<'a>(
        film: &Film,
        images: &'a FilmImages,
        t: IntPassType,
    ) -> Option<&'a PixelImage> {
        if let Some(idx) = film.pass_set.ext_index_of(t) {
            return Some(&images.passes[idx]);
        }
        if let Some(idx) = film.pass_set.aux_index_of(t) {
            return Some(&images.aux[idx]);
        }
        return None;
    }
}

#[cfg(feature = "edge-detection")]
fn border_color() -> Rgba {
    Rgba::new(0.5, 0.0, 0.0, 1.0)
}

#[cfg(feature = "edge-detection")]
fn on_border(i: i32, j: i32, xstart: i32, xend: i32, ystart: i32, yend: i32) -> bool {
    return i <= xstart + 1 || j <= ystart + 1 || i >= xend - 2 || j >= yend - 2;
}

#[cfg(feature = "edge-detection")]
impl Film {
    /// Derives the faces-edges pass (geometric normal + depth) for the given
    /// region and writes it to the sinks.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn generate_faces_edges(
        &self,
        num_view: usize,
        idx_pass: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
        draw_border: bool,
    ) {
        use detection::*;

        let planes;
        {
            let images = self.images.lock().unwrap();
            let normal = find_pass(self, &images, IntPassType::NormalGeom);
            let depth = find_pass(self, &images, IntPassType::ZDepthNorm);
            let (normal, depth) = match (normal, depth) {
                (Some(n), Some(z)) => (n, z),
                _ => return,
            };
            planes = normal_depth_planes(
                normal,
                depth,
                self.w as usize,
                self.h as usize,
                xstart,
                xend,
                ystart,
                yend,
            );
        }

        let edge = self.settings.edge;
        let edges = edge_image_detection(
            planes,
            edge.faces_edge_threshold,
            edge.faces_edge_thickness,
            edge.faces_edge_smoothness,
        );

        self.write_edge_pass(
            num_view,
            idx_pass,
            &edges,
            xstart,
            xend,
            ystart,
            yend,
            draw_border,
        );
    }

    /// Derives the objects-edges pass and, when present, the toon pass
    /// (smooth normal + depth + beauty) for the given region.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn generate_toon_and_object_edges(
        &self,
        num_view: usize,
        idx_pass: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
        draw_border: bool,
    ) {
        use detection::*;
        use crate::core::color::Rgb;

        let planes;
        let mut beauty;
        {
            let images = self.images.lock().unwrap();
            let normal = find_pass(self, &images, IntPassType::NormalSmooth);
            let depth = find_pass(self, &images, IntPassType::ZDepthNorm);
            let (normal, depth) = match (normal, depth) {
                (Some(n), Some(z)) => (n, z),
                _ => return,
            };
            planes = normal_depth_planes(
                normal,
                depth,
                self.w as usize,
                self.h as usize,
                xstart,
                xend,
                ystart,
                yend,
            );
            beauty = beauty_plane(
                &images,
                self.w as usize,
                self.h as usize,
                xstart,
                xend,
                ystart,
                yend,
            );
        }

        let edge = self.settings.edge;

        beauty = image::imageops::blur(&beauty, edge.toon_pre_smooth);
        if edge.toon_quantization > 0.0 {
            let q = edge.toon_quantization;
            for p in beauty.pixels_mut() {
                let col = Rgb::new(p.0[0], p.0[1], p.0[2]);
                let (h, s, v) = col.to_hsv();
                let h = (h / q).round() * q;
                let s = (s / q).round() * q;
                let v = (v / q).round() * q;
                let col = Rgb::from_hsv(h, s, v);
                p.0 = [col.r, col.g, col.b];
            }
            beauty = image::imageops::blur(&beauty, edge.toon_post_smooth);
        }

        let edges = edge_image_detection(
            planes,
            edge.object_edge_threshold,
            edge.object_edge_thickness,
            edge.object_edge_smoothness,
        );

        self.write_edge_pass(
            num_view,
            idx_pass,
            &edges,
            xstart,
            xend,
            ystart,
            yend,
            draw_border,
        );

        let idx_toon = match self.pass_set.ext_index_of(IntPassType::Toon) {
            Some(idx) => idx,
            None => return,
        };
        let toon_edge_color = Rgba::from_rgb(&edge.toon_edge_color, 1.0);

        let write_second = !draw_border && !self.output.lock().unwrap().is_preview();
        for j in ystart..yend {
            for i in xstart..xend {
                let edge_value = edges.get_pixel(i as u32, j as u32).0[0];
                let p = beauty.get_pixel(i as u32, j as u32).0;
                let mut col_toon = Rgba::new(p[0], p[1], p[2], 1.0);
                col_toon.blend_rgb(&toon_edge_color, edge_value);
                if draw_border && on_border(i, j, xstart, xend, ystart, yend) {
                    col_toon = border_color();
                }

                {
                    let mut c = col_toon;
                    c.color_space_from_linear_rgb(self.settings.color_space, self.settings.gamma);
                    let mut out = self.output.lock().unwrap();
                    out.put_pass_pixel(num_view, i, j, idx_toon, &c);
                }
                if write_second {
                    if let Some(out2) = &self.output2 {
                        let mut c = col_toon;
                        c.color_space_from_linear_rgb(
                            self.settings.color_space2,
                            self.settings.gamma2,
                        );
                        let mut out2 = out2.lock().unwrap();
                        out2.put_pass_pixel(num_view, i, j, idx_toon, &c);
                    }
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn write_edge_pass(
        &self,
        num_view: usize,
        idx_pass: usize,
        edges: &detection::GrayBuf,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
        draw_border: bool,
    ) {
        let write_second = !draw_border && !self.output.lock().unwrap().is_preview();
        for j in ystart..yend {
            for i in xstart..xend {
                let mut col_edge = Rgba::gray(edges.get_pixel(i as u32, j as u32).0[0]);
                if draw_border && on_border(i, j, xstart, xend, ystart, yend) {
                    col_edge = border_color();
                }
                {
                    let mut out = self.output.lock().unwrap();
                    out.put_pass_pixel(num_view, i, j, idx_pass, &col_edge);
                }
                if write_second {
                    if let Some(out2) = &self.output2 {
                        let mut out2 = out2.lock().unwrap();
                        out2.put_pass_pixel(num_view, i, j, idx_pass, &col_edge);
                    }
                }
            }
        }
    }
}

#[cfg(not(feature = "edge-detection"))]
impl Film {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn generate_faces_edges(
        &self,
        num_view: usize,
        idx_pass: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
        _draw_border: bool,
    ) {
        warn!("film: compiled without the edge-detection feature; faces-edges pass emits zeros");
        self.write_zero_pass(num_view, idx_pass, xstart, xend, ystart, yend);
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn generate_toon_and_object_edges(
        &self,
        num_view: usize,
        idx_pass: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
        _draw_border: bool,
    ) {
        warn!("film: compiled without the edge-detection feature; edge/toon passes emit zeros");
        self.write_zero_pass(num_view, idx_pass, xstart, xend, ystart, yend);
        if let Some(idx_toon) = self.pass_set.ext_index_of(IntPassType::Toon) {
            self.write_zero_pass(num_view, idx_toon, xstart, xend, ystart, yend);
        }
    }

    fn write_zero_pass(
        &self,
        num_view: usize,
        idx_pass: usize,
        xstart: i32,
        xend: i32,
        ystart: i32,
        yend: i32,
    ) {
        let mut out = self.output.lock().unwrap();
        for j in ystart..yend {
            for i in xstart..xend {
                out.put_pass_pixel(num_view, i, j, idx_pass, &Rgba::zero());
            }
        }
    }
}

#[cfg(all(test, feature = "edge-detection"))]
mod tests {
    use super::detection::*;
    use image::{ImageBuffer, Luma};

    fn step_image(w: u32, h: u32, split: u32) -> GrayBuf {
        ImageBuffer::from_fn(w, h, |x, _| {
            if x < split {
                Luma([0.0f32])
            } else {
                Luma([1.0f32])
            }
        })
    }

    #[test]
    fn step_edge_is_detected() {
        let img = step_image(16, 16, 8);
        let edges = edge_image_detection(vec![img], 0.5, 1, 0.0);
        // The discontinuity column lights up, flat areas stay black.
        assert_eq!(edges.get_pixel(7, 8).0[0], 1.0);
        assert_eq!(edges.get_pixel(2, 8).0[0], 0.0);
        assert_eq!(edges.get_pixel(14, 8).0[0], 0.0);
    }

    #[test]
    fn thickness_dilates_the_edge() {
        let img = step_image(16, 16, 8);
        let thin = edge_image_detection(vec![img.clone()], 0.5, 1, 0.0);
        let thick = edge_image_detection(vec![img], 0.5, 3, 0.0);
        let count = |e: &GrayBuf| e.pixels().filter(|p| p.0[0] > 0.5).count();
        assert!(count(&thick) > count(&thin));
    }

    #[test]
    fn channel_max_combines_planes() {
        let flat = GrayBuf::from_pixel(16, 16, Luma([0.25f32]));
        let img = step_image(16, 16, 8);
        let edges = edge_image_detection(vec![flat, img], 0.5, 1, 0.0);
        assert_eq!(edges.get_pixel(7, 8).0[0], 1.0);
    }
}
