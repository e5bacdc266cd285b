// Derived edge and toon passes, wired through flush and finish_area.

use renderfilm::core::color::Rgba;
use renderfilm::core::film::{Film, FilmSettings, IF_ALL};
use renderfilm::core::output::{CaptureSink, NullProgress, SystemClock};
use renderfilm::core::passes::{ColorPasses, IntPassType, PassSet};
use std::sync::{Arc, Mutex};

fn make_film(
    width: i32,
    height: i32,
    settings: FilmSettings,
    pass_set: PassSet,
) -> (Arc<Film>, Arc<Mutex<CaptureSink>>) {
    let sink = Arc::new(Mutex::new(CaptureSink::new(
        width as usize,
        height as usize,
        pass_set.num_ext(),
    )));
    let film = Film::new(
        width,
        height,
        0,
        0,
        settings,
        pass_set,
        sink.clone(),
        None,
        Box::new(NullProgress),
        Box::new(SystemClock::new()),
    );
    return (Arc::new(film), sink);
}

fn splat_geometry(film: &Film, x: i32, y: i32, beauty: Rgba, normal: (f32, f32, f32), depth: f32) {
    let mut cp = ColorPasses::new();
    cp.set(IntPassType::Combined, beauty);
    let n = Rgba::new(normal.0, normal.1, normal.2, 1.0);
    cp.set(IntPassType::NormalGeom, n);
    cp.set(IntPassType::NormalSmooth, n);
    cp.set(IntPassType::ZDepthNorm, Rgba::new(depth, depth, depth, depth));
    film.add_sample(&cp, x, y, 0.5, 0.5, 0, 0, 1.0);
}

fn faces_edges_pass_set() -> PassSet {
    PassSet::new(
        vec![IntPassType::Combined, IntPassType::DebugFacesEdges],
        vec![IntPassType::NormalGeom, IntPassType::ZDepthNorm],
    )
    .unwrap()
}

fn splat_split_normals(film: &Film, width: i32, height: i32, split: i32) {
    for y in 0..height {
        for x in 0..width {
            let normal = if x < split {
                (1.0, 0.0, 0.0)
            } else {
                (0.0, 0.0, 1.0)
            };
            splat_geometry(film, x, y, Rgba::gray(0.5), normal, 0.5);
        }
    }
}

#[cfg(feature = "edge-detection")]
mod with_detection {
    use super::*;

    #[test]
    fn faces_edges_appear_at_normal_discontinuities() {
        let mut settings = FilmSettings::default();
        settings.edge.faces_edge_thickness = 1;
        settings.edge.faces_edge_smoothness = 0.0;
        let (film, sink) = make_film(16, 16, settings, faces_edges_pass_set());
        film.init(1);
        splat_split_normals(&film, 16, 16, 8);
        film.flush(0, IF_ALL);

        // The normal flips between columns 7 and 8; the Laplacian trips on
        // both sides. Flat areas stay black.
        let sink = sink.lock().unwrap();
        assert_eq!(sink.get(1, 7, 8).r, 1.0);
        assert_eq!(sink.get(1, 8, 8).r, 1.0);
        assert_eq!(sink.get(1, 2, 8).r, 0.0);
        assert_eq!(sink.get(1, 14, 8).r, 0.0);
    }

    #[test]
    fn faces_edges_dilate_with_thickness() {
        let mut settings = FilmSettings::default();
        settings.edge.faces_edge_thickness = 3;
        settings.edge.faces_edge_smoothness = 0.0;
        let (film, sink) = make_film(16, 16, settings, faces_edges_pass_set());
        film.init(1);
        splat_split_normals(&film, 16, 16, 8);
        film.flush(0, IF_ALL);

        // The 3x3 mean dilation widens the two-column edge by one pixel on
        // each side.
        let sink = sink.lock().unwrap();
        assert_eq!(sink.get(1, 6, 8).r, 1.0);
        assert_eq!(sink.get(1, 9, 8).r, 1.0);
        assert_eq!(sink.get(1, 4, 8).r, 0.0);
    }

    #[test]
    fn toon_pass_keeps_quantized_beauty_on_flat_geometry() {
        let pass_set = PassSet::new(
            vec![IntPassType::Combined, IntPassType::Toon],
            vec![IntPassType::NormalSmooth, IntPassType::ZDepthNorm],
        )
        .unwrap();
        let (film, sink) = make_film(16, 16, FilmSettings::default(), pass_set);
        film.init(1);
        for y in 0..16 {
            for x in 0..16 {
                splat_geometry(&film, x, y, Rgba::gray(0.5), (0.0, 1.0, 0.0), 0.5);
            }
        }
        film.flush(0, IF_ALL);

        // Flat normals produce no edges, so the toon pass is the smoothed,
        // HSV-quantized beauty: still mid gray away from the frame border.
        let sink = sink.lock().unwrap();
        let c = sink.get(1, 8, 8);
        assert!((c.r - 0.5).abs() < 0.01, "got {}", c.r);
        assert!((c.g - 0.5).abs() < 0.01);
        assert!((c.b - 0.5).abs() < 0.01);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn finish_area_draws_the_tile_border_marker() {
        let mut settings = FilmSettings::default();
        settings.tile_size = 4;
        let (film, sink) = make_film(4, 4, settings, faces_edges_pass_set());
        film.init(1);
        for y in 0..4 {
            for x in 0..4 {
                splat_geometry(&film, x, y, Rgba::gray(0.5), (0.0, 1.0, 0.0), 0.5);
            }
        }
        let area = film.next_area(0).unwrap();
        film.finish_area(0, &area);

        // Every pixel of a 4x4 tile sits on the two-pixel border band, so
        // the whole derived pass carries the red tile marker.
        let sink = sink.lock().unwrap();
        assert_eq!(sink.get(1, 0, 0), Rgba::new(0.5, 0.0, 0.0, 1.0));
        assert_eq!(sink.get(1, 3, 3), Rgba::new(0.5, 0.0, 0.0, 1.0));
    }
}

// Compiled with --no-default-features only: the in-crate convolution
// backend is gone and the derived passes must emit zeros instead.
#[cfg(not(feature = "edge-detection"))]
mod without_detection {
    use super::*;

    #[test]
    fn edge_passes_emit_zeros_without_backend() {
        let (film, sink) = make_film(16, 16, FilmSettings::default(), faces_edges_pass_set());
        film.init(1);
        splat_split_normals(&film, 16, 16, 8);
        film.flush(0, IF_ALL);

        let sink = sink.lock().unwrap();
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(sink.get(1, x, y), Rgba::zero());
            }
        }
    }
}
