// Adaptive AA: mask recomputation between passes and worker-side queries.

use renderfilm::core::color::Rgba;
use renderfilm::core::film::{DarkDetection, Film, FilmSettings};
use renderfilm::core::output::{CaptureSink, NullProgress, SystemClock};
use renderfilm::core::passes::{ColorPasses, IntPassType, PassSet};
use std::sync::{Arc, Mutex};

fn make_film(width: i32, height: i32, settings: FilmSettings) -> (Arc<Film>, Arc<Mutex<CaptureSink>>) {
    let pass_set = PassSet::combined_only();
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

fn splat_gray(film: &Film, x: i32, y: i32, v: f32) {
    let mut cp = ColorPasses::new();
    cp.set(IntPassType::Combined, Rgba::gray(v));
    film.add_sample(&cp, x, y, 0.5, 0.5, 0, 0, 1.0);
}

#[test]
fn threshold_zero_always_resamples() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.0;
    let (film, _sink) = make_film(3, 3, settings);
    film.init(2);
    let n = film.next_pass(0, true, "test", false);
    assert_eq!(n, 9);
    for y in 0..3 {
        for x in 0..3 {
            assert!(film.do_more_samples(x, y));
        }
    }
}

#[test]
fn uniform_image_leaves_mask_empty() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.05;
    let (film, _sink) = make_film(3, 3, settings);
    film.init(2);
    for y in 0..3 {
        for x in 0..3 {
            splat_gray(&film, x, y, 0.5);
        }
    }
    let n = film.next_pass(0, true, "test", false);
    assert_eq!(n, 0);
    assert!(!film.do_more_samples(1, 1));
}

#[test]
fn brightness_delta_marks_center_and_neighbors() {
    // Dark-curve detection: tau(0.5) ~ 0.0055, the 0.3 brightness step
    // exceeds it by far.
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.01;
    settings.aa.dark_detection = DarkDetection::Curve;
    let (film, _sink) = make_film(3, 3, settings);
    film.init(2);
    for y in 0..3 {
        for x in 0..3 {
            let v = if (x, y) == (1, 1) { 0.8 } else { 0.5 };
            splat_gray(&film, x, y, v);
        }
    }
    let n = film.next_pass(0, true, "test", false);
    assert!(n >= 5);
    assert!(film.do_more_samples(1, 1));
    assert!(film.do_more_samples(0, 1));
    assert!(film.do_more_samples(2, 1));
    assert!(film.do_more_samples(1, 0));
    assert!(film.do_more_samples(1, 2));
    // (2, 0) pairs with the center only through the backward-diagonal probe
    // of a pixel column outside the scan, so it stays clear.
    assert!(!film.do_more_samples(2, 0));
}

#[test]
fn unrendered_pixels_resample_after_partial_pass() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.05;
    let (film, _sink) = make_film(4, 4, settings);
    film.init(2);
    // Only the top-left quarter got samples.
    for y in 0..2 {
        for x in 0..2 {
            splat_gray(&film, x, y, 0.5);
        }
    }
    film.next_pass(0, true, "test", false);
    // Unrendered interior pixels are marked...
    assert!(film.do_more_samples(2, 2));
    assert!(film.do_more_samples(2, 1));
    // ...while sampled, converged ones are not.
    assert!(!film.do_more_samples(0, 0));
}

#[test]
fn resample_mask_painting_tints_marked_pixels() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.01;
    settings.aa.dark_detection = DarkDetection::Curve;
    let (film, sink) = make_film(3, 3, settings);
    sink.lock().unwrap().show_mask = true;
    film.init(2);
    for y in 0..3 {
        for x in 0..3 {
            let v = if (x, y) == (1, 1) { 0.8 } else { 0.5 };
            splat_gray(&film, x, y, v);
        }
    }
    film.next_pass(0, true, "test", false);

    // Marked gray pixels paint as (brightness, 0.7, brightness, 1): the
    // red channel is not the strict minimum, and the sample factor is 1 so
    // the blue channel stays at the brightness.
    let sink = sink.lock().unwrap();
    let c = sink.get(0, 1, 1);
    assert!((c.r - 0.8).abs() < 1e-3);
    assert_eq!(c.g, 0.7);
    assert!((c.b - 0.8).abs() < 1e-3);
    assert_eq!(c.a, 1.0);
    let c = sink.get(0, 0, 1);
    assert!((c.r - 0.5).abs() < 1e-3);
    assert_eq!(c.g, 0.7);
    assert!((c.b - 0.5).abs() < 1e-3);
    // Pixels the mask never marks keep their sink state.
    assert_eq!(sink.get(0, 2, 0), Rgba::zero());
}

#[test]
fn green_dominant_marked_pixels_paint_the_red_highlight() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.01;
    let (film, sink) = make_film(2, 2, settings);
    sink.lock().unwrap().show_mask = true;
    film.init(2);
    let mut cp = ColorPasses::new();
    cp.set(IntPassType::Combined, Rgba::new(0.1, 0.9, 0.5, 1.0));
    film.add_sample(&cp, 0, 0, 0.5, 0.5, 0, 0, 1.0);
    for (x, y) in [(1, 0), (0, 1), (1, 1)] {
        splat_gray(&film, x, y, 0.1);
    }
    film.next_pass(0, true, "test", false);

    // Red below both other channels flips the tint.
    let sink = sink.lock().unwrap();
    let c = sink.get(0, 0, 0);
    assert_eq!(c.r, 0.7);
    assert!((c.g - 0.701).abs() < 1e-3);
    assert!((c.b - 0.701).abs() < 1e-3);
    let c = sink.get(0, 1, 0);
    assert!((c.r - 0.1).abs() < 1e-3);
    assert_eq!(c.g, 0.7);
}

#[test]
fn high_sampling_factor_drops_the_blue_channel() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.01;
    let pass_set = PassSet::new(
        vec![IntPassType::Combined],
        vec![IntPassType::DebugSamplingFactor],
    )
    .unwrap();
    let sink = Arc::new(Mutex::new(CaptureSink::new(3, 3, pass_set.num_ext())));
    sink.lock().unwrap().show_mask = true;
    let film = Film::new(
        3,
        3,
        0,
        0,
        settings,
        pass_set,
        sink.clone(),
        None,
        Box::new(NullProgress),
        Box::new(SystemClock::new()),
    );
    film.init(2);
    for y in 0..3 {
        for x in 0..3 {
            let v = if (x, y) == (1, 1) { 0.8 } else { 0.5 };
            let mut cp = ColorPasses::new();
            cp.set(IntPassType::Combined, Rgba::gray(v));
            cp.set(
                IntPassType::DebugSamplingFactor,
                Rgba::new(2.0, 2.0, 2.0, 1.0),
            );
            film.add_sample(&cp, x, y, 0.5, 0.5, 0, 0, 1.0);
        }
    }
    film.next_pass(0, true, "test", false);

    // A material sample factor above one replaces the blue channel by 0.7.
    let sink = sink.lock().unwrap();
    let c = sink.get(0, 1, 1);
    assert!((c.r - 0.8).abs() < 1e-3);
    assert_eq!(c.g, 0.7);
    assert_eq!(c.b, 0.7);
}

#[test]
fn skip_next_pass_short_circuits() {
    let mut settings = FilmSettings::default();
    settings.aa.threshold = 0.05;
    let (film, _sink) = make_film(3, 3, settings);
    film.init(3);
    assert_eq!(film.next_pass(0, true, "test", true), 0);
}

#[test]
fn next_pass_resets_tile_cursor() {
    let mut settings = FilmSettings::default();
    settings.tile_size = 2;
    settings.aa.threshold = 0.0;
    let (film, _sink) = make_film(4, 4, settings);
    film.init(2);
    let first = film.next_area(0).unwrap();
    while film.next_area(0).is_some() {}
    film.next_pass(0, false, "test", false);
    let again = film.next_area(0).unwrap();
    assert_eq!(first, again);
}
