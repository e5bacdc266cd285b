use super::analyzer::{AaNoiseParams, DarkDetection};
use crate::core::base::Float;
use crate::core::color::{ColorSpace, Rgb};
use crate::core::error::FilmError;
use crate::core::film::tile_splitter::TilesOrder;
use crate::core::filter::FilterType;
use crate::core::param_set::ParamSet;
use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum FilmFileMode {
    #[default]
    None,
    Save,
    LoadSave,
}

impl FilmFileMode {
    pub fn from_name(name: &str) -> Result<FilmFileMode, FilmError> {
        match name {
            "none" => Ok(FilmFileMode::None),
            "save" => Ok(FilmFileMode::Save),
            "load_save" => Ok(FilmFileMode::LoadSave),
            _ => {
                let msg = format!("Film file mode \"{}\" unknown.", name);
                return Err(FilmError::error(&msg));
            }
        }
    }

    pub fn saves(&self) -> bool {
        return *self != FilmFileMode::None;
    }

    pub fn loads(&self) -> bool {
        return *self == FilmFileMode::LoadSave;
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum FilmFileFormat {
    #[default]
    Binary,
    Text,
}

impl FilmFileFormat {
    pub fn from_name(name: &str) -> Result<FilmFileFormat, FilmError> {
        match name {
            "binary" => Ok(FilmFileFormat::Binary),
            "text" => Ok(FilmFileFormat::Text),
            _ => {
                let msg = format!("Film file format \"{}\" unknown.", name);
                return Err(FilmError::error(&msg));
            }
        }
    }
}

#[derive(Debug, PartialEq, Copy, Clone, Default)]
pub enum AutosaveInterval {
    #[default]
    None,
    /// Every n passes.
    Pass(u32),
    /// Every n seconds of render time.
    Time(f64),
}

/// Parameters of the derived edge/toon passes.
#[derive(Debug, Copy, Clone)]
pub struct EdgeParams {
    pub faces_edge_threshold: Float,
    pub faces_edge_thickness: i32,
    pub faces_edge_smoothness: Float,
    pub object_edge_threshold: Float,
    pub object_edge_thickness: i32,
    pub object_edge_smoothness: Float,
    pub toon_pre_smooth: Float,
    pub toon_quantization: Float,
    pub toon_post_smooth: Float,
    pub toon_edge_color: Rgb,
}

impl Default for EdgeParams {
    fn default() -> Self {
        EdgeParams {
            faces_edge_threshold: 0.01,
            faces_edge_thickness: 1,
            faces_edge_smoothness: 0.5,
            object_edge_threshold: 0.3,
            object_edge_thickness: 2,
            object_edge_smoothness: 0.75,
            toon_pre_smooth: 3.0,
            toon_quantization: 0.1,
            toon_post_smooth: 3.0,
            toon_edge_color: Rgb::zero(),
        }
    }
}

/// Resolved film configuration.
#[derive(Debug, Clone)]
pub struct FilmSettings {
    pub filter_type: FilterType,
    /// Nominal reconstruction filter width in pixels.
    pub filter_width: Float,
    pub tile_size: i32,
    pub tiles_order: TilesOrder,
    pub n_threads: usize,

    pub premult_alpha: bool,
    pub color_space: ColorSpace,
    pub gamma: Float,
    pub premult_alpha2: bool,
    pub color_space2: ColorSpace,
    pub gamma2: Float,

    pub aa: AaNoiseParams,
    pub estimate_density: bool,

    pub film_file_mode: FilmFileMode,
    pub film_file_format: FilmFileFormat,
    pub images_autosave: AutosaveInterval,
    pub film_autosave: AutosaveInterval,
    /// Distinguishes film files of peer hosts rendering the same frame.
    pub computer_node: u32,
    /// Output image path the film file names derive from.
    pub output_path: PathBuf,

    pub edge: EdgeParams,
}

impl Default for FilmSettings {
    fn default() -> Self {
        FilmSettings {
            filter_type: FilterType::Box,
            filter_width: 1.5,
            tile_size: 32,
            tiles_order: TilesOrder::Linear,
            n_threads: 1,
            premult_alpha: false,
            color_space: ColorSpace::LinearRgb,
            gamma: 1.0,
            premult_alpha2: false,
            color_space2: ColorSpace::LinearRgb,
            gamma2: 1.0,
            aa: AaNoiseParams::default(),
            estimate_density: false,
            film_file_mode: FilmFileMode::None,
            film_file_format: FilmFileFormat::Binary,
            images_autosave: AutosaveInterval::None,
            film_autosave: AutosaveInterval::None,
            computer_node: 0,
            output_path: PathBuf::from("render"),
            edge: EdgeParams::default(),
        }
    }
}

fn autosave_from_params(params: &ParamSet, prefix: &str) -> Result<AutosaveInterval, FilmError> {
    let key = format!("{}_autosave_interval", prefix);
    match params.find_one_string(&key, "none").as_str() {
        "none" => Ok(AutosaveInterval::None),
        "pass" => {
            let n = params.find_one_int(&format!("{}_autosave_passes", prefix), 1);
            return Ok(AutosaveInterval::Pass(n.max(1) as u32));
        }
        "time" => {
            let s = params.find_one_float(&format!("{}_autosave_seconds", prefix), 300.0);
            return Ok(AutosaveInterval::Time(s.max(1.0) as f64));
        }
        other => {
            let msg = format!("Autosave interval \"{}\" unknown.", other);
            return Err(FilmError::error(&msg));
        }
    }
}

impl FilmSettings {
    pub fn from_params(params: &ParamSet) -> Result<FilmSettings, FilmError> {
        let defaults = FilmSettings::default();
        let aa_defaults = AaNoiseParams::default();

        let aa = AaNoiseParams {
            threshold: params.find_one_float("aa_threshold", aa_defaults.threshold),
            dark_detection: DarkDetection::from_name(
                &params.find_one_string("aa_dark_detection", "linear"),
            )?,
            dark_threshold_factor: params
                .find_one_float("aa_dark_threshold_factor", aa_defaults.dark_threshold_factor),
            variance_edge_size: params
                .find_one_int("aa_variance_edge_size", aa_defaults.variance_edge_size),
            variance_pixels: params.find_one_int("aa_variance_pixels", aa_defaults.variance_pixels),
            clamp_samples: params.find_one_float("aa_clamp_samples", aa_defaults.clamp_samples),
            detect_color_noise: params
                .find_one_bool("aa_detect_color_noise", aa_defaults.detect_color_noise),
            background_resampling: params
                .find_one_bool("background_resampling", aa_defaults.background_resampling),
        };

        return Ok(FilmSettings {
            filter_type: FilterType::from_name(&params.find_one_string("filter_type", "box"))?,
            filter_width: params.find_one_float("filter_width", defaults.filter_width),
            tile_size: params.find_one_int("tile_size", defaults.tile_size),
            tiles_order: TilesOrder::from_name(&params.find_one_string("tiles_order", "linear"))?,
            n_threads: params.find_one_int("threads", 1).max(1) as usize,
            premult_alpha: params.find_one_bool("premult_alpha", defaults.premult_alpha),
            color_space: ColorSpace::from_name(
                &params.find_one_string("color_space", "linear_rgb"),
            )?,
            gamma: params.find_one_float("gamma", defaults.gamma),
            premult_alpha2: params.find_one_bool("premult_alpha_2", defaults.premult_alpha2),
            color_space2: ColorSpace::from_name(
                &params.find_one_string("color_space_2", "linear_rgb"),
            )?,
            gamma2: params.find_one_float("gamma_2", defaults.gamma2),
            aa,
            estimate_density: params.find_one_bool("estimate_density", defaults.estimate_density),
            film_file_mode: FilmFileMode::from_name(
                &params.find_one_string("film_file_mode", "none"),
            )?,
            film_file_format: FilmFileFormat::from_name(
                &params.find_one_string("film_file_format", "binary"),
            )?,
            images_autosave: autosave_from_params(params, "images")?,
            film_autosave: autosave_from_params(params, "film")?,
            computer_node: params.find_one_int("computer_node", 0).max(0) as u32,
            output_path: PathBuf::from(params.find_one_string("output_path", "render")),
            edge: defaults.edge,
        });
    }
}
