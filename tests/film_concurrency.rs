// Concurrent splatting: sample application is commutative up to floating
// point rounding, and the tile cursor hands every tile out exactly once.

use renderfilm::core::color::Rgba;
use renderfilm::core::film::{Film, FilmSettings, TilesOrder};
use renderfilm::core::filter::FilterType;
use renderfilm::core::output::{CaptureSink, NullProgress, SystemClock};
use renderfilm::core::passes::{ColorPasses, IntPassType, PassSet};
use std::sync::{Arc, Mutex};

const W: i32 = 16;
const H: i32 = 16;

fn make_film(settings: FilmSettings) -> Arc<Film> {
    let pass_set = PassSet::combined_only();
    let sink = Arc::new(Mutex::new(CaptureSink::new(
        W as usize,
        H as usize,
        pass_set.num_ext(),
    )));
    let film = Film::new(
        W,
        H,
        0,
        0,
        settings,
        pass_set,
        sink,
        None,
        Box::new(NullProgress),
        Box::new(SystemClock::new()),
    );
    return Arc::new(film);
}

// Minimal xorshift generator so the sample streams are reproducible.
struct Rng(u64);

impl Rng {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        return (x >> 32) as u32;
    }

    fn next_float(&mut self) -> f32 {
        return (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32;
    }
}

fn random_samples(seed: u64, count: usize) -> Vec<(i32, i32, f32, f32, Rgba)> {
    let mut rng = Rng(seed | 1);
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let x = (rng.next_u32() % W as u32) as i32;
        let y = (rng.next_u32() % H as u32) as i32;
        let dx = rng.next_float();
        let dy = rng.next_float();
        let col = Rgba::new(
            rng.next_float(),
            rng.next_float(),
            rng.next_float(),
            1.0,
        );
        samples.push((x, y, dx, dy, col));
    }
    return samples;
}

fn splat_all(film: &Film, samples: &[(i32, i32, f32, f32, Rgba)]) {
    for (x, y, dx, dy, col) in samples {
        let mut cp = ColorPasses::new();
        cp.set(IntPassType::Combined, *col);
        film.add_sample(&cp, *x, *y, *dx, *dy, 0, 0, 1.0);
    }
}

fn settings_gauss() -> FilmSettings {
    let mut settings = FilmSettings::default();
    settings.filter_type = FilterType::Gauss;
    settings.filter_width = 2.0;
    return settings;
}

fn assert_films_close(a: &Film, b: &Film, tolerance: f32) {
    for y in 0..H {
        for x in 0..W {
            let pa = a.weighted_pixel(0, x, y);
            let pb = b.weighted_pixel(0, x, y);
            assert!(
                (pa.weight - pb.weight).abs() <= tolerance,
                "weight differs at ({}, {}): {} vs {}",
                x,
                y,
                pa.weight,
                pb.weight
            );
            for (ca, cb) in [
                (pa.col.r, pb.col.r),
                (pa.col.g, pb.col.g),
                (pa.col.b, pb.col.b),
                (pa.col.a, pb.col.a),
            ] {
                assert!((ca - cb).abs() <= tolerance);
            }
        }
    }
}

#[test]
fn reversed_sample_order_gives_the_same_film() {
    let samples = random_samples(42, 400);
    let film_a = make_film(settings_gauss());
    film_a.init(1);
    splat_all(&film_a, &samples);

    let mut reversed = samples.clone();
    reversed.reverse();
    let film_b = make_film(settings_gauss());
    film_b.init(1);
    splat_all(&film_b, &reversed);

    assert_films_close(&film_a, &film_b, 1e-4);
}

#[test]
fn threaded_splatting_matches_serial_reference() {
    let streams: Vec<_> = (0..4).map(|t| random_samples(1000 + t, 300)).collect();

    let reference = make_film(settings_gauss());
    reference.init(1);
    for stream in &streams {
        splat_all(&reference, stream);
    }

    let film = make_film(settings_gauss());
    film.init(1);
    std::thread::scope(|scope| {
        for stream in &streams {
            let film = film.clone();
            scope.spawn(move || splat_all(&film, stream));
        }
    });

    assert_films_close(&reference, &film, 1e-3);
}

#[test]
fn workers_drain_the_tile_cursor_exactly_once() {
    let mut settings = FilmSettings::default();
    settings.tile_size = 4;
    settings.tiles_order = TilesOrder::Interleaved;
    settings.n_threads = 4;
    let film = make_film(settings);
    film.init(1);

    let seen = Arc::new(Mutex::new(Vec::new()));
    std::thread::scope(|scope| {
        for _ in 0..4 {
            let film = film.clone();
            let seen = seen.clone();
            scope.spawn(move || {
                while let Some(area) = film.next_area(0) {
                    seen.lock().unwrap().push((area.x, area.y));
                }
            });
        }
    });

    let mut seen = Arc::try_unwrap(seen).unwrap().into_inner().unwrap();
    seen.sort();
    let mut expected = Vec::new();
    for ty in 0..4 {
        for tx in 0..4 {
            expected.push((tx * 4, ty * 4));
        }
    }
    expected.sort();
    assert_eq!(seen, expected);
}

#[test]
fn concurrent_samplers_and_mask_readers_coexist() {
    let mut settings = settings_gauss();
    settings.aa.threshold = 0.05;
    let film = make_film(settings);
    film.init(2);

    let samples = random_samples(7, 500);
    std::thread::scope(|scope| {
        let writer_film = film.clone();
        let writer_samples = &samples;
        scope.spawn(move || splat_all(&writer_film, writer_samples));
        let reader = film.clone();
        scope.spawn(move || {
            for y in 0..H {
                for x in 0..W {
                    // Mask reads are allowed during sampling; no writer runs
                    // between passes here.
                    let _ = reader.do_more_samples(x, y);
                }
            }
        });
    });
}
