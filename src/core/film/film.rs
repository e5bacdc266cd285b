use super::analyzer::AdaptiveAaAnalyzer;
use super::filter_table::FilterTable;
use super::persistence;
use super::persistence::{FilmCheckInfo, FilmSnapshot, FILM_STRUCTURE_VERSION};
use super::pixel_image::{DensityImage, PixelImage, WeightedPixel};
use super::resample_mask::ResampleMask;
use super::settings::{AutosaveInterval, FilmSettings};
use super::tile_splitter::{TileArea, TileSplitter};
use super::MAX_FILTER_SIZE;
use crate::core::base::{round2int, Float};
use crate::core::color::{ColorSpace, Rgb, Rgba};
use crate::core::error::FilmError;
use crate::core::filter::FilterFunction;
use crate::core::output::{Clock, ProgressSink, SinkWriter};
use crate::core::passes::{ColorPasses, ExportRule, IntPassType, PassSet};
use crate::filters::create_filter;
use log::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Export the regular (normalized) passes.
pub const IF_IMAGE: u32 = 1;
/// Blend the density image into the beauty pass at export.
pub const IF_DENSITYIMAGE: u32 = 2;
pub const IF_ALL: u32 = IF_IMAGE | IF_DENSITYIMAGE;

pub(crate) struct FilmImages {
    pub passes: Vec<PixelImage>,
    pub aux: Vec<PixelImage>,
}

struct DensityState {
    image: Option<DensityImage>,
    num_samples: u64,
}

struct SplitterState {
    splitter: Option<TileSplitter>,
    next_area: usize,
}

struct OutputState {
    area_cnt: usize,
    completed_cnt: usize,
    n_pass: u32,
    n_passes: u32,
    images_pass_counter: u32,
    film_pass_counter: u32,
    images_timer_mark: f64,
    film_timer_mark: f64,
    resumed: bool,
}

/// The image film: thread-safe pixel accumulator, adaptive AA controller and
/// checkpoint of an offline render.
///
/// Workers pull regions with [`Film::next_area`], splat samples with
/// [`Film::add_sample`] and hand finished regions back through
/// [`Film::finish_area`]; between passes [`Film::next_pass`] recomputes the
/// resample mask that [`Film::do_more_samples`] serves during sampling.
pub struct Film {
    pub(crate) w: i32,
    pub(crate) h: i32,
    pub(crate) cx0: i32,
    pub(crate) cy0: i32,
    pub(crate) cx1: i32,
    pub(crate) cy1: i32,

    pub(crate) filter_table: FilterTable,
    pub(crate) pass_set: PassSet,
    pub(crate) settings: FilmSettings,

    pub(crate) images: Mutex<FilmImages>,
    density: Mutex<DensityState>,
    splitter: Mutex<SplitterState>,
    out: Mutex<OutputState>,
    mask: RwLock<ResampleMask>,
    aborted: AtomicBool,
    sampling_offset: AtomicU64,
    base_sampling_offset: AtomicU64,

    pub(crate) output: Arc<Mutex<dyn SinkWriter>>,
    pub(crate) output2: Option<Arc<Mutex<dyn SinkWriter>>>,
    progress: Mutex<Box<dyn ProgressSink>>,
    clock: Box<dyn Clock>,
}

impl Film {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        width: i32,
        height: i32,
        xstart: i32,
        ystart: i32,
        settings: FilmSettings,
        pass_set: PassSet,
        output: Arc<Mutex<dyn SinkWriter>>,
        output2: Option<Arc<Mutex<dyn SinkWriter>>>,
        progress: Box<dyn ProgressSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        let filter: Box<dyn FilterFunction> = create_filter(settings.filter_type);
        let filter_table = FilterTable::new(filter.as_ref(), settings.filter_width);

        info!(
            "film: created {}x{} film at ({}, {}), {:?} filter width {:.3}, {} passes ({} aux)",
            width,
            height,
            xstart,
            ystart,
            settings.filter_type,
            filter_table.filter_width(),
            pass_set.num_ext(),
            pass_set.num_aux(),
        );

        let passes = (0..pass_set.num_ext())
            .map(|_| PixelImage::new(width as usize, height as usize))
            .collect();
        let aux = (0..pass_set.num_aux())
            .map(|_| PixelImage::new(width as usize, height as usize))
            .collect();

        Film {
            w: width,
            h: height,
            cx0: xstart,
            cy0: ystart,
            cx1: xstart + width,
            cy1: ystart + height,
            filter_table,
            pass_set,
            settings,
            images: Mutex::new(FilmImages { passes, aux }),
            density: Mutex::new(DensityState {
                image: None,
                num_samples: 0,
            }),
            splitter: Mutex::new(SplitterState {
                splitter: None,
                next_area: 0,
            }),
            out: Mutex::new(OutputState {
                area_cnt: 0,
                completed_cnt: 0,
                n_pass: 1,
                n_passes: 1,
                images_pass_counter: 0,
                film_pass_counter: 0,
                images_timer_mark: 0.0,
                film_timer_mark: 0.0,
                resumed: false,
            }),
            mask: RwLock::new(ResampleMask::new(width as usize, height as usize)),
            aborted: AtomicBool::new(false),
            sampling_offset: AtomicU64::new(0),
            base_sampling_offset: AtomicU64::new(0),
            output,
            output2,
            progress: Mutex::new(progress),
            clock,
        }
    }

    pub fn width(&self) -> i32 {
        return self.w;
    }

    pub fn height(&self) -> i32 {
        return self.h;
    }

    pub fn pass_set(&self) -> &PassSet {
        return &self.pass_set;
    }

    pub fn settings(&self) -> &FilmSettings {
        return &self.settings;
    }

    pub fn filter_width(&self) -> Float {
        return self.filter_table.filter_width();
    }

    pub fn is_aborted(&self) -> bool {
        return self.aborted.load(Ordering::SeqCst);
    }

    /// Requests cancellation; subsequent `next_area` calls return `None`.
    pub fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn sampling_offset(&self) -> u64 {
        return self.sampling_offset.load(Ordering::SeqCst);
    }

    pub fn set_sampling_offset(&self, offset: u64) {
        self.sampling_offset.store(offset, Ordering::SeqCst);
    }

    pub fn base_sampling_offset(&self) -> u64 {
        return self.base_sampling_offset.load(Ordering::SeqCst);
    }

    pub fn set_base_sampling_offset(&self, offset: u64) {
        self.base_sampling_offset.store(offset, Ordering::SeqCst);
    }

    /// Accumulated state of one pixel of an external pass. Test and tooling
    /// accessor; workers never read pixels back.
    pub fn weighted_pixel(&self, ext_index: usize, x: i32, y: i32) -> WeightedPixel {
        let images = self.images.lock().unwrap();
        return *images.passes[ext_index].get((x - self.cx0) as usize, (y - self.cy0) as usize);
    }

    /// Resets the film for a fresh render of `num_passes` passes, merging
    /// previously saved sibling films first when configured to resume.
    pub fn init(&self, num_passes: u32) {
        {
            let mut images_guard = self.images.lock().unwrap();
            let images = &mut *images_guard;
            for img in images.passes.iter_mut().chain(images.aux.iter_mut()) {
                img.clear();
            }
        }
        {
            let mut density = self.density.lock().unwrap();
            if self.settings.estimate_density {
                match density.image.as_mut() {
                    Some(img) => img.clear(),
                    None => {
                        density.image =
                            Some(DensityImage::new(self.w as usize, self.h as usize));
                    }
                }
            } else {
                density.image = None;
            }
            density.num_samples = 0;
        }

        let area_cnt;
        {
            let mut sp = self.splitter.lock().unwrap();
            let splitter = TileSplitter::new(
                self.w,
                self.h,
                self.cx0,
                self.cy0,
                self.settings.tile_size,
                self.settings.tiles_order,
                self.settings.n_threads,
            );
            area_cnt = splitter.len();
            sp.splitter = Some(splitter);
            sp.next_area = 0;
        }

        self.aborted.store(false, Ordering::SeqCst);
        {
            let now = self.clock.now_seconds();
            let mut out = self.out.lock().unwrap();
            out.area_cnt = area_cnt;
            out.completed_cnt = 0;
            out.n_pass = 1;
            out.n_passes = num_passes;
            out.images_pass_counter = 0;
            out.film_pass_counter = 0;
            out.images_timer_mark = now;
            out.film_timer_mark = now;
            out.resumed = false;
        }
        {
            let mut progress = self.progress.lock().unwrap();
            progress.init((self.w * self.h) as usize);
        }

        // Previews never load or save films.
        let preview = self.output.lock().unwrap().is_preview();
        if !preview {
            if self.settings.film_file_mode.loads() {
                self.load_all_in_folder();
            }
            if self.settings.film_file_mode.saves() {
                persistence::backup_film_file(&self.film_path());
            }
        }
    }

    /// Hands out the next tile, shrunk to its sample-safe bounds. `None`
    /// once the pass is exhausted or the film was aborted.
    pub fn next_area(&self, num_view: usize) -> Option<TileArea> {
        if self.is_aborted() {
            return None;
        }

        let area;
        {
            let mut sp = self.splitter.lock().unwrap();
            let n = sp.next_area;
            sp.next_area += 1;
            area = sp.splitter.as_ref().and_then(|s| s.area(n));
        }

        let mut a = area?;
        a.set_sample_borders(self.filter_table.int_filter_width());
        {
            let mut out = self.output.lock().unwrap();
            out.highlight_area(num_view, a.x, a.y, a.x + a.w, a.y + a.h);
        }
        return Some(a);
    }

    /// True when `(x, y)` still needs samples this pass. Always true while
    /// adaptive AA is off.
    pub fn do_more_samples(&self, x: i32, y: i32) -> bool {
        if self.settings.aa.threshold <= 0.0 {
            return true;
        }
        let mask = self.mask.read().unwrap();
        return mask.get((x - self.cx0) as usize, (y - self.cy0) as usize);
    }

    /// Splats one sample into every pass image across its filter footprint.
    ///
    /// `(x, y)` is the integer pixel, `(dx, dy)` the sub-pixel offset in
    /// `[0, 1]`. Safe to call from any number of worker threads; the image
    /// mutex is held for the whole footprint so partial footprints are never
    /// observable.
    #[allow(clippy::too_many_arguments)]
    pub fn add_sample(
        &self,
        color_passes: &ColorPasses,
        x: i32,
        y: i32,
        dx: Float,
        dy: Float,
        _num_sample: usize,
        _aa_pass_number: usize,
        inv_aa_max_possible_samples: Float,
    ) {
        let fw = self.filter_table.filter_width() as f64;

        // Filter extent, clipped to the image area.
        let dx0 = i32::max(self.cx0 - x, round2int(dx as f64 - fw));
        let dx1 = i32::min(self.cx1 - x - 1, round2int(dx as f64 + fw - 1.0));
        let dy0 = i32::max(self.cy0 - y, round2int(dy as f64 - fw));
        let dy1 = i32::min(self.cy1 - y - 1, round2int(dy as f64 + fw - 1.0));
        if dx0 > dx1 || dy0 > dy1 {
            return;
        }

        let mut x_index = [0usize; MAX_FILTER_SIZE + 1];
        let x_offs = dx as f64 - 0.5;
        for (n, i) in (dx0..=dx1).enumerate() {
            x_index[n] = self.filter_table.index_for(i as f64 - x_offs);
        }
        let mut y_index = [0usize; MAX_FILTER_SIZE + 1];
        let y_offs = dy as f64 - 0.5;
        for (n, j) in (dy0..=dy1).enumerate() {
            y_index[n] = self.filter_table.index_for(j as f64 - y_offs);
        }

        let x0 = x + dx0;
        let x1 = x + dx1;
        let y0 = y + dy0;
        let y1 = y + dy1;
        let footprint_area = ((x1 - x0 + 1) * (y1 - y0 + 1)) as Float;

        let mut images = self.images.lock().unwrap();
        let images = &mut *images;
        for j in y0..=y1 {
            for i in x0..=x1 {
                let wt = self
                    .filter_table
                    .value_at(x_index[(i - x0) as usize], y_index[(j - y0) as usize]);
                let px = (i - self.cx0) as usize;
                let py = (j - self.cy0) as usize;

                for (idx, pass) in self.pass_set.ext_passes().iter().enumerate() {
                    Self::accumulate(
                        images.passes[idx].get_mut(px, py),
                        *pass,
                        color_passes,
                        wt,
                        inv_aa_max_possible_samples,
                        footprint_area,
                        &self.settings,
                    );
                }
                for (idx, pass) in self.pass_set.aux_passes().iter().enumerate() {
                    Self::accumulate(
                        images.aux[idx].get_mut(px, py),
                        *pass,
                        color_passes,
                        wt,
                        inv_aa_max_possible_samples,
                        footprint_area,
                        &self.settings,
                    );
                }
            }
        }
    }

    #[inline]
    fn accumulate(
        pixel: &mut WeightedPixel,
        pass: IntPassType,
        color_passes: &ColorPasses,
        filter_weight: Float,
        inv_aa_max_possible_samples: Float,
        footprint_area: Float,
        settings: &FilmSettings,
    ) {
        if pass == IntPassType::AaSamples {
            pixel.weight += inv_aa_max_possible_samples / footprint_area;
            return;
        }
        let mut col = color_passes.get(pass);
        col.clamp_proportional_rgb(settings.aa.clamp_samples);
        if settings.premult_alpha {
            col.alpha_premultiply();
        }
        pixel.col += col * filter_weight;
        pixel.weight += filter_weight;
    }

    /// Splats one density sample. No-op unless density estimation is on.
    pub fn add_density_sample(&self, c: &Rgb, x: i32, y: i32, dx: Float, dy: Float) {
        if !self.settings.estimate_density {
            return;
        }

        let fw = self.filter_table.filter_width() as f64;
        let dx0 = i32::max(self.cx0 - x, round2int(dx as f64 - fw));
        let dx1 = i32::min(self.cx1 - x - 1, round2int(dx as f64 + fw - 1.0));
        let dy0 = i32::max(self.cy0 - y, round2int(dy as f64 - fw));
        let dy1 = i32::min(self.cy1 - y - 1, round2int(dy as f64 + fw - 1.0));
        if dx0 > dx1 || dy0 > dy1 {
            return;
        }

        let mut x_index = [0usize; MAX_FILTER_SIZE + 1];
        let x_offs = dx as f64 - 0.5;
        for (n, i) in (dx0..=dx1).enumerate() {
            x_index[n] = self.filter_table.index_for(i as f64 - x_offs);
        }
        let mut y_index = [0usize; MAX_FILTER_SIZE + 1];
        let y_offs = dy as f64 - 0.5;
        for (n, j) in (dy0..=dy1).enumerate() {
            y_index[n] = self.filter_table.index_for(j as f64 - y_offs);
        }

        let mut density = self.density.lock().unwrap();
        if let Some(img) = density.image.as_mut() {
            for j in dy0..=dy1 {
                for i in dx0..=dx1 {
                    let wt = self
                        .filter_table
                        .value_at(x_index[(i - dx0) as usize], y_index[(j - dy0) as usize]);
                    let px = (x + i - self.cx0) as usize;
                    let py = (y + j - self.cy0) as usize;
                    *img.get_mut(px, py) += *c * wt;
                }
            }
        }
        density.num_samples += 1;
    }

    fn export_base_color(
        &self,
        images: &FilmImages,
        ext_index: usize,
        px: usize,
        py: usize,
        flags: u32,
        density: Option<(&DensityImage, Float)>,
    ) -> Rgba {
        let pixel = images.passes[ext_index].get(px, py);
        let mut col = match self.pass_set.rule_from_ext_index(ext_index) {
            ExportRule::WeightAsColor => {
                Rgba::new(pixel.weight, pixel.weight, pixel.weight, pixel.weight)
            }
            ExportRule::NormalizedCeil => {
                let mut c = pixel.normalized();
                c.ceil_rgb();
                c
            }
            ExportRule::Normalized => {
                if flags & IF_IMAGE != 0 {
                    pixel.normalized()
                } else {
                    Rgba::zero()
                }
            }
        };
        if ext_index == 0 {
            if let Some((img, factor)) = density {
                col += Rgba::from_rgb(&(*img.get(px, py) * factor), 0.0);
            }
        }
        col.clamp_rgb0();
        return col;
    }

    fn encode_for_sink(
        col: &mut Rgba,
        ext_index: usize,
        color_space: ColorSpace,
        gamma: Float,
        premult_alpha: bool,
    ) {
        col.color_space_from_linear_rgb(color_space, gamma);
        if premult_alpha && ext_index == 0 {
            col.alpha_premultiply();
        }
        col.clamp_alpha01();
    }

    /// Normalizes and exposes every pixel of a finished region through the
    /// primary sink, then derives the edge/toon passes for it. Serialized by
    /// the output mutex; a refused pixel aborts the film.
    pub fn finish_area(&self, num_view: usize, a: &TileArea) {
        let mut out_state = self.out.lock().unwrap();

        let start_x = a.x - self.cx0;
        let start_y = a.y - self.cy0;
        let end_x = a.x + a.w - self.cx0;
        let end_y = a.y + a.h - self.cy0;
        let num_ext = self.pass_set.num_ext();

        let mut col_ext_passes =
            Vec::with_capacity(((end_x - start_x) * (end_y - start_y)) as usize * num_ext);
        {
            let images = self.images.lock().unwrap();
            for j in start_y..end_y {
                for i in start_x..end_x {
                    for idx in 0..num_ext {
                        let mut col = self.export_base_color(
                            &images,
                            idx,
                            i as usize,
                            j as usize,
                            IF_ALL,
                            None,
                        );
                        Self::encode_for_sink(
                            &mut col,
                            idx,
                            self.settings.color_space,
                            self.settings.gamma,
                            self.settings.premult_alpha,
                        );
                        col_ext_passes.push(col);
                    }
                }
            }
        }

        {
            let mut out = self.output.lock().unwrap();
            let mut k = 0;
            for j in start_y..end_y {
                for i in start_x..end_x {
                    let colors = &col_ext_passes[k..k + num_ext];
                    k += num_ext;
                    if !out.put_pixel(num_view, i, j, &self.pass_set, colors) {
                        self.aborted.store(true, Ordering::SeqCst);
                    }
                }
            }
        }

        for idx in 1..num_ext {
            match self.pass_set.int_pass_from_ext_index(idx) {
                IntPassType::DebugFacesEdges => {
                    self.generate_faces_edges(num_view, idx, start_x, end_x, start_y, end_y, true);
                }
                IntPassType::DebugObjectsEdges | IntPassType::Toon => {
                    self.generate_toon_and_object_edges(
                        num_view, idx, start_x, end_x, start_y, end_y, true,
                    );
                }
                _ => {}
            }
        }

        {
            let mut out = self.output.lock().unwrap();
            out.flush_area(
                num_view,
                a.x,
                a.y,
                end_x + self.cx0,
                end_y + self.cy0,
                &self.pass_set,
            );
        }

        // Time-based autosaves tick on finished areas.
        let preview = self.output.lock().unwrap().is_preview();
        if !preview {
            let now = self.clock.now_seconds();
            if let AutosaveInterval::Time(secs) = self.settings.images_autosave {
                if now - out_state.images_timer_mark > secs {
                    debug!(
                        "film: images autosave after {:.1}s",
                        now - out_state.images_timer_mark
                    );
                    self.flush(num_view, IF_ALL);
                    out_state.images_timer_mark = now;
                }
            }
            if let AutosaveInterval::Time(secs) = self.settings.film_autosave {
                if self.settings.film_file_mode.saves() && now - out_state.film_timer_mark > secs {
                    debug!(
                        "film: film autosave after {:.1}s",
                        now - out_state.film_timer_mark
                    );
                    if let Err(e) = self.save_film() {
                        warn!("film: error while saving film file: {}", e);
                    }
                    out_state.film_timer_mark = now;
                }
            }
        }

        {
            let mut progress = self.progress.lock().unwrap();
            out_state.completed_cnt += 1;
            if out_state.completed_cnt == out_state.area_cnt {
                progress.done();
            } else {
                progress.update((a.w * a.h) as usize);
            }
        }
    }

    /// Advances the pass counter, runs the autosaves that are due, and
    /// recomputes the resample mask from the beauty pass. Returns the number
    /// of pixels to be resampled in the coming pass.
    ///
    /// Callers must have joined all workers of the previous pass.
    pub fn next_pass(
        &self,
        num_view: usize,
        adaptive_aa: bool,
        integrator_name: &str,
        skip_next_pass: bool,
    ) -> usize {
        {
            let mut sp = self.splitter.lock().unwrap();
            sp.next_area = 0;
        }

        let mut do_images_autosave = false;
        let mut do_film_autosave = false;
        let n_pass;
        let n_passes;
        let resumed;
        {
            let mut out = self.out.lock().unwrap();
            out.n_pass += 1;
            out.images_pass_counter += 1;
            out.film_pass_counter += 1;
            n_pass = out.n_pass;
            n_passes = out.n_passes;
            resumed = out.resumed;

            if !skip_next_pass {
                if let AutosaveInterval::Pass(n) = self.settings.images_autosave {
                    if out.images_pass_counter >= n {
                        do_images_autosave = true;
                        out.images_pass_counter = 0;
                    }
                }
                if let AutosaveInterval::Pass(n) = self.settings.film_autosave {
                    if self.settings.film_file_mode.saves() && out.film_pass_counter >= n {
                        do_film_autosave = true;
                        out.film_pass_counter = 0;
                    }
                }
            }
        }

        if skip_next_pass {
            return 0;
        }

        debug!(
            "film: n_pass={} images_autosave={} film_autosave={}",
            n_pass, do_images_autosave, do_film_autosave
        );

        let preview = self.output.lock().unwrap().is_preview();
        if !preview {
            if do_images_autosave {
                self.flush(num_view, IF_ALL);
            }
            if do_film_autosave {
                if let Err(e) = self.save_film() {
                    warn!("film: error while saving film file: {}", e);
                }
            }
        }

        let n_resample;
        if adaptive_aa && self.settings.aa.threshold > 0.0 {
            {
                let images = self.images.lock().unwrap();
                let sampling_factor = self.sampling_factor_image(&images);
                let mut mask = self.mask.write().unwrap();
                let analyzer = AdaptiveAaAnalyzer::new(&self.settings.aa);
                analyzer.mark_resample(&images.passes[0], sampling_factor, &mut mask);
            }
            n_resample = self.mask.read().unwrap().count_set();

            let show_mask = self.output.lock().unwrap().show_resample_mask();
            if show_mask {
                self.paint_resample_mask(num_view);
            }
        } else {
            n_resample = (self.w * self.h) as usize;
        }

        {
            // Interactive viewers refresh between passes; file sinks would
            // re-encode their output, so they flush from `flush` only.
            let mut out = self.output.lock().unwrap();
            if !out.is_image_output() {
                out.flush(num_view, &self.pass_set);
            }
        }

        let mut pass_string = String::new();
        if resumed {
            pass_string.push_str("Film loaded + ");
        }
        pass_string.push_str(&format!(
            "Rendering pass {} of {}, resampling {} pixels.",
            n_pass, n_passes, n_resample
        ));
        info!("{}: {}", integrator_name, pass_string);

        {
            let mut progress = self.progress.lock().unwrap();
            progress.init((self.w * self.h) as usize);
            progress.set_tag(&pass_string);
        }
        {
            let mut out = self.out.lock().unwrap();
            out.completed_cnt = 0;
        }

        return n_resample;
    }

    fn sampling_factor_image<'a>(&self, images: &'a FilmImages) -> Option<&'a PixelImage> {
        if let Some(idx) = self.pass_set.ext_index_of(IntPassType::DebugSamplingFactor) {
            return Some(&images.passes[idx]);
        }
        if let Some(idx) = self.pass_set.aux_index_of(IntPassType::DebugSamplingFactor) {
            return Some(&images.aux[idx]);
        }
        return None;
    }

    /// Paints the marked pixels into the sink so interactive views can show
    /// what the next pass will resample. Green/red tint encodes whether the
    /// pixel is predominantly red; the blue channel drops to 0.7 where the
    /// material sample factor exceeds one.
    fn paint_resample_mask(&self, num_view: usize) {
        let images = self.images.lock().unwrap();
        let sampling_factor = self.sampling_factor_image(&images);
        let mask = self.mask.read().unwrap();
        let mut out = self.output.lock().unwrap();
        let num_ext = self.pass_set.num_ext();
        let mut colors = vec![Rgba::zero(); num_ext];

        for y in 0..self.h as usize {
            for x in 0..self.w as usize {
                if !mask.get(x, y) {
                    continue;
                }
                let mut mat_sample_factor = 1.0;
                if let Some(sf) = sampling_factor {
                    mat_sample_factor = sf.get(x, y).normalized().r;
                    if !self.settings.aa.background_resampling && mat_sample_factor == 0.0 {
                        continue;
                    }
                }
                for (idx, slot) in colors.iter_mut().enumerate() {
                    let pix = images.passes[idx].get(x, y).normalized();
                    let bri = pix.abs_brightness();
                    let third = if mat_sample_factor > 1.0 { 0.7 } else { bri };
                    *slot = if pix.r < pix.g && pix.r < pix.b {
                        Rgba::new(0.7, bri, third, 1.0)
                    } else {
                        Rgba::new(bri, 0.7, third, 1.0)
                    };
                }
                out.put_pixel(num_view, x as i32, y as i32, &self.pass_set, &colors);
            }
        }
    }

    /// Full-frame export to the configured sinks. `flags` selects whether the
    /// regular image and the density blend are included.
    pub fn flush(&self, num_view: usize, flags: u32) {
        info!("film: flushing buffer (view {})", num_view);

        let density: Option<(DensityImage, Float)> = {
            let density = self.density.lock().unwrap();
            match (&density.image, flags & IF_DENSITYIMAGE != 0) {
                (Some(img), true) if density.num_samples > 0 => {
                    let factor = (self.w * self.h) as Float / density.num_samples as Float;
                    Some((img.clone(), factor))
                }
                _ => None,
            }
        };
        let density_ref = density.as_ref().map(|(img, f)| (img, *f));

        let out1_preview = self.output.lock().unwrap().is_preview();
        // Previews never hit the secondary file output, and exporting twice
        // to one sink is pointless.
        let output2 = if out1_preview {
            None
        } else {
            self.output2.clone()
        };

        let num_ext = self.pass_set.num_ext();
        let mut row1 = vec![Rgba::zero(); self.w as usize * num_ext];
        let mut row2 = vec![Rgba::zero(); self.w as usize * num_ext];

        for j in 0..self.h {
            {
                let images = self.images.lock().unwrap();
                for i in 0..self.w {
                    for idx in 0..num_ext {
                        let col = self.export_base_color(
                            &images,
                            idx,
                            i as usize,
                            j as usize,
                            flags,
                            density_ref,
                        );
                        let k = i as usize * num_ext + idx;
                        row1[k] = col;
                        row2[k] = col;
                        Self::encode_for_sink(
                            &mut row1[k],
                            idx,
                            self.settings.color_space,
                            self.settings.gamma,
                            self.settings.premult_alpha,
                        );
                        Self::encode_for_sink(
                            &mut row2[k],
                            idx,
                            self.settings.color_space2,
                            self.settings.gamma2,
                            self.settings.premult_alpha2,
                        );
                    }
                }
            }
            {
                let mut out = self.output.lock().unwrap();
                for i in 0..self.w {
                    let k = i as usize * num_ext;
                    out.put_pixel(num_view, i, j, &self.pass_set, &row1[k..k + num_ext]);
                }
            }
            if let Some(out2) = &output2 {
                let mut out2 = out2.lock().unwrap();
                for i in 0..self.w {
                    let k = i as usize * num_ext;
                    out2.put_pixel(num_view, i, j, &self.pass_set, &row2[k..k + num_ext]);
                }
            }
        }

        for idx in 1..num_ext {
            match self.pass_set.int_pass_from_ext_index(idx) {
                IntPassType::DebugFacesEdges => {
                    self.generate_faces_edges(num_view, idx, 0, self.w, 0, self.h, false);
                }
                IntPassType::DebugObjectsEdges | IntPassType::Toon => {
                    self.generate_toon_and_object_edges(num_view, idx, 0, self.w, 0, self.h, false);
                }
                _ => {}
            }
        }

        {
            let mut out = self.output.lock().unwrap();
            if out.is_image_output() {
                info!("film: saving image files");
            } else {
                info!("film: flushing output");
            }
            out.flush(num_view, &self.pass_set);
        }
        if let Some(out2) = &output2 {
            let mut out2 = out2.lock().unwrap();
            if out2.is_image_output() {
                out2.flush(num_view, &self.pass_set);
            }
        }
    }

    pub fn check_info(&self) -> FilmCheckInfo {
        FilmCheckInfo {
            structure_version: FILM_STRUCTURE_VERSION,
            w: self.w,
            h: self.h,
            cx0: self.cx0,
            cx1: self.cx1,
            cy0: self.cy0,
            cy1: self.cy1,
            num_passes: self.pass_set.num_ext() as u32,
        }
    }

    /// Clones the persistable state of the film.
    pub fn snapshot(&self) -> FilmSnapshot {
        let images = self.images.lock().unwrap();
        FilmSnapshot {
            check: self.check_info(),
            passes: images.passes.clone(),
            aux: images.aux.clone(),
            sampling_offset: self.sampling_offset(),
            base_sampling_offset: self.base_sampling_offset(),
        }
    }

    /// Adds a loaded film's accumulated colors and weights onto this film,
    /// after verifying its check stamp. Sampling offsets merge with `max` so
    /// resumed renders keep drawing fresh sample sequences.
    pub fn merge_snapshot(&self, snap: &FilmSnapshot) -> Result<(), FilmError> {
        if let Some(msg) = self.check_info().mismatch(&snap.check) {
            let msg = format!("film: loading film check failed: {}", msg);
            return Err(FilmError::geometry_mismatch(&msg));
        }
        if snap.aux.len() != self.pass_set.num_aux() {
            let msg = format!(
                "film: loading film check failed: number of auxiliary passes, expected={}, loaded={}",
                self.pass_set.num_aux(),
                snap.aux.len()
            );
            return Err(FilmError::geometry_mismatch(&msg));
        }

        {
            let mut images_guard = self.images.lock().unwrap();
            let images = &mut *images_guard;
            for (img, loaded) in images
                .passes
                .iter_mut()
                .chain(images.aux.iter_mut())
                .zip(snap.passes.iter().chain(snap.aux.iter()))
            {
                for (p, l) in img.pixels_mut().iter_mut().zip(loaded.pixels().iter()) {
                    p.col += l.col;
                    p.weight += l.weight;
                }
            }
        }
        self.sampling_offset
            .fetch_max(snap.sampling_offset, Ordering::SeqCst);
        self.base_sampling_offset
            .fetch_max(snap.base_sampling_offset, Ordering::SeqCst);
        return Ok(());
    }

    /// Path of this film's checkpoint file.
    pub fn film_path(&self) -> PathBuf {
        return persistence::film_path(&self.settings.output_path, self.settings.computer_node);
    }

    /// Saves the film checkpoint, replacing the previous one atomically.
    pub fn save_film(&self) -> Result<(), FilmError> {
        info!("film: saving internal film file");
        let snap = self.snapshot();
        return persistence::save_snapshot(&self.film_path(), &snap, self.settings.film_file_format);
    }

    /// Merges every sibling film file sharing this output's base name, in
    /// lexicographic order. Mismatching or unreadable films are skipped with
    /// a warning. Returns the number of films merged.
    pub fn load_all_in_folder(&self) -> usize {
        info!("film: loading film files");
        {
            let mut progress = self.progress.lock().unwrap();
            progress.set_tag("Loading film files");
        }

        let films = match persistence::list_sibling_films(&self.settings.output_path) {
            Ok(films) => films,
            Err(e) => {
                warn!("film: error during film loading process: {}", e);
                return 0;
            }
        };

        let mut merged = 0;
        for path in films {
            let snap = match persistence::load_snapshot(&path) {
                Ok(snap) => snap,
                Err(e) => {
                    warn!(
                        "film: error '{}' while loading film file \"{}\"",
                        e,
                        path.display()
                    );
                    continue;
                }
            };
            match self.merge_snapshot(&snap) {
                Ok(()) => {
                    info!("film: merged film file \"{}\"", path.display());
                    merged += 1;
                }
                Err(e) => warn!("{}; the loaded film will be discarded", e),
            }
        }

        if merged > 0 {
            let mut out = self.out.lock().unwrap();
            out.resumed = true;
        }
        return merged;
    }
}

/// Builds a film from a parameter set, in the shape render front-ends
/// construct one.
pub fn create_film(
    params: &crate::core::param_set::ParamSet,
    pass_set: PassSet,
    output: Arc<Mutex<dyn SinkWriter>>,
    output2: Option<Arc<Mutex<dyn SinkWriter>>>,
    progress: Box<dyn ProgressSink>,
    clock: Box<dyn Clock>,
) -> Result<Arc<Film>, FilmError> {
    let settings = FilmSettings::from_params(params)?;
    let width = params.find_one_int("width", 1280);
    let height = params.find_one_int("height", 720);
    let xstart = params.find_one_int("xstart", 0);
    let ystart = params.find_one_int("ystart", 0);
    if width <= 0 || height <= 0 {
        return Err(FilmError::error("Film dimensions must be positive."));
    }
    let film = Film::new(
        width, height, xstart, ystart, settings, pass_set, output, output2, progress, clock,
    );
    return Ok(Arc::new(film));
}
