use super::pixel_image::{PixelImage, WeightedPixel};
use super::settings::FilmFileFormat;
use crate::core::color::Rgba;
use crate::core::error::FilmError;
use log::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

pub const FILM_STRUCTURE_VERSION: u32 = 1;

/// Geometry and structure stamp of a film. A loaded film is discarded when
/// any field differs from the live film's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmCheckInfo {
    pub structure_version: u32,
    pub w: i32,
    pub h: i32,
    pub cx0: i32,
    pub cx1: i32,
    pub cy0: i32,
    pub cy1: i32,
    pub num_passes: u32,
}

impl FilmCheckInfo {
    /// Human-readable description of the first mismatching field.
    pub fn mismatch(&self, loaded: &FilmCheckInfo) -> Option<String> {
        if self.structure_version != loaded.structure_version {
            return Some(format!(
                "film structure version, expected={}, loaded={}",
                self.structure_version, loaded.structure_version
            ));
        }
        if self.w != loaded.w || self.h != loaded.h {
            return Some(format!(
                "image size, expected={}x{}, loaded={}x{}",
                self.w, self.h, loaded.w, loaded.h
            ));
        }
        if self.cx0 != loaded.cx0
            || self.cx1 != loaded.cx1
            || self.cy0 != loaded.cy0
            || self.cy1 != loaded.cy1
        {
            return Some(format!(
                "image borders, expected=({},{})-({},{}), loaded=({},{})-({},{})",
                self.cx0, self.cy0, self.cx1, self.cy1, loaded.cx0, loaded.cy0, loaded.cx1,
                loaded.cy1
            ));
        }
        if self.num_passes != loaded.num_passes {
            return Some(format!(
                "number of render passes, expected={}, loaded={}",
                self.num_passes, loaded.num_passes
            ));
        }
        return None;
    }
}

/// Complete persisted state of a film: check stamp, every pass and auxiliary
/// image, and the sampling offsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmSnapshot {
    pub check: FilmCheckInfo,
    pub passes: Vec<PixelImage>,
    pub aux: Vec<PixelImage>,
    pub sampling_offset: u64,
    pub base_sampling_offset: u64,
}

/// Film file of this output and node: `"<output> - node NNNN.film"`.
pub fn film_path(output_path: &Path, computer_node: u32) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(format!(" - node {:04}.film", computer_node));
    return PathBuf::from(name);
}

/// Film files next to `output_path` whose stem shares its base name,
/// lexicographically sorted. These are the sibling films of peer nodes and
/// earlier sessions that `load_all_in_folder` merges.
pub fn list_sibling_films(output_path: &Path) -> Result<Vec<PathBuf>, FilmError> {
    let parent = match output_path.parent() {
        Some(p) if !p.as_os_str().is_empty() => PathBuf::from(p),
        _ => PathBuf::from("."),
    };
    let base = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut films = Vec::new();
    for entry in std::fs::read_dir(&parent)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|e| e != "film").unwrap_or(true) {
            continue;
        }
        let stem = match path.file_stem() {
            Some(s) => s.to_string_lossy().into_owned(),
            None => continue,
        };
        if stem.len() < base.len() || !stem.starts_with(&base) {
            continue;
        }
        films.push(path);
    }
    films.sort();
    return Ok(films);
}

/// Renames an existing film file to `<path>-previous.bak` so a session never
/// silently overwrites the film it was resumed from.
pub fn backup_film_file(path: &Path) {
    if !path.exists() {
        return;
    }
    let mut backup = path.as_os_str().to_os_string();
    backup.push("-previous.bak");
    let backup = PathBuf::from(backup);
    info!(
        "film: creating backup of previously saved film to \"{}\"",
        backup.display()
    );
    if let Err(e) = std::fs::rename(path, &backup) {
        warn!("film: error during film file backup: {}", e);
    }
}

fn write_u32(w: &mut impl Write, v: u32) -> Result<(), FilmError> {
    w.write_all(&v.to_le_bytes())?;
    return Ok(());
}

fn write_i32(w: &mut impl Write, v: i32) -> Result<(), FilmError> {
    w.write_all(&v.to_le_bytes())?;
    return Ok(());
}

fn write_u64(w: &mut impl Write, v: u64) -> Result<(), FilmError> {
    w.write_all(&v.to_le_bytes())?;
    return Ok(());
}

fn write_f32(w: &mut impl Write, v: f32) -> Result<(), FilmError> {
    w.write_all(&v.to_le_bytes())?;
    return Ok(());
}

fn read_u32(r: &mut impl Read) -> Result<u32, FilmError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    return Ok(u32::from_le_bytes(b));
}

fn read_i32(r: &mut impl Read) -> Result<i32, FilmError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    return Ok(i32::from_le_bytes(b));
}

fn read_u64(r: &mut impl Read) -> Result<u64, FilmError> {
    let mut b = [0u8; 8];
    r.read_exact(&mut b)?;
    return Ok(u64::from_le_bytes(b));
}

fn read_f32(r: &mut impl Read) -> Result<f32, FilmError> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    return Ok(f32::from_le_bytes(b));
}

fn write_image(w: &mut impl Write, img: &PixelImage) -> Result<(), FilmError> {
    write_u32(w, img.width() as u32)?;
    write_u32(w, img.height() as u32)?;
    for p in img.pixels() {
        write_f32(w, p.col.r)?;
        write_f32(w, p.col.g)?;
        write_f32(w, p.col.b)?;
        write_f32(w, p.col.a)?;
        write_f32(w, p.weight)?;
    }
    return Ok(());
}

fn read_image(r: &mut impl Read) -> Result<PixelImage, FilmError> {
    let width = read_u32(r)? as usize;
    let height = read_u32(r)? as usize;
    if width * height > 1 << 30 {
        return Err(FilmError::error("Film image dimensions implausible."));
    }
    let mut img = PixelImage::new(width, height);
    for p in img.pixels_mut() {
        let red = read_f32(r)?;
        let green = read_f32(r)?;
        let blue = read_f32(r)?;
        let alpha = read_f32(r)?;
        let weight = read_f32(r)?;
        *p = WeightedPixel {
            col: Rgba::new(red, green, blue, alpha),
            weight,
        };
    }
    return Ok(img);
}

fn write_binary(w: &mut impl Write, snap: &FilmSnapshot) -> Result<(), FilmError> {
    // The leading structure version doubles as the format magic: its low
    // byte is written first and is always below ASCII '0'.
    write_u32(w, snap.check.structure_version)?;
    write_i32(w, snap.check.w)?;
    write_i32(w, snap.check.h)?;
    write_i32(w, snap.check.cx0)?;
    write_i32(w, snap.check.cx1)?;
    write_i32(w, snap.check.cy0)?;
    write_i32(w, snap.check.cy1)?;
    write_u32(w, snap.check.num_passes)?;
    write_u32(w, snap.aux.len() as u32)?;
    for img in snap.passes.iter().chain(snap.aux.iter()) {
        write_image(w, img)?;
    }
    write_u64(w, snap.sampling_offset)?;
    write_u64(w, snap.base_sampling_offset)?;
    return Ok(());
}

fn read_binary(r: &mut impl Read) -> Result<FilmSnapshot, FilmError> {
    let structure_version = read_u32(r)?;
    let w = read_i32(r)?;
    let h = read_i32(r)?;
    let cx0 = read_i32(r)?;
    let cx1 = read_i32(r)?;
    let cy0 = read_i32(r)?;
    let cy1 = read_i32(r)?;
    let num_passes = read_u32(r)?;
    let num_aux = read_u32(r)?;
    let check = FilmCheckInfo {
        structure_version,
        w,
        h,
        cx0,
        cx1,
        cy0,
        cy1,
        num_passes,
    };
    let mut passes = Vec::with_capacity(num_passes as usize);
    for _ in 0..num_passes {
        passes.push(read_image(r)?);
    }
    let mut aux = Vec::with_capacity(num_aux as usize);
    for _ in 0..num_aux {
        aux.push(read_image(r)?);
    }
    let sampling_offset = read_u64(r)?;
    let base_sampling_offset = read_u64(r)?;
    return Ok(FilmSnapshot {
        check,
        passes,
        aux,
        sampling_offset,
        base_sampling_offset,
    });
}

/// Saves a snapshot to `<path>.tmp`, then renames it over `path` so readers
/// never observe a half-written film.
pub fn save_snapshot(
    path: &Path,
    snap: &FilmSnapshot,
    format: FilmFileFormat,
) -> Result<(), FilmError> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        match format {
            FilmFileFormat::Binary => {
                info!(
                    "film: saving film to \"{}\" in binary (non portable) format",
                    path.display()
                );
                write_binary(&mut writer, snap)?;
            }
            FilmFileFormat::Text => {
                info!("film: saving film to \"{}\" in text format", path.display());
                serde_json::to_writer(&mut writer, snap)?;
            }
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    return Ok(());
}

/// Loads a snapshot, sniffing the format from the first byte: anything below
/// ASCII `'0'` is the binary form, everything else the text form.
pub fn load_snapshot(path: &Path) -> Result<FilmSnapshot, FilmError> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 1];
    file.read_exact(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;
    let mut reader = BufReader::new(file);
    if magic[0] < b'0' {
        info!(
            "film: loading film from \"{}\" in binary (non portable) format",
            path.display()
        );
        return read_binary(&mut reader);
    }
    info!("film: loading film from \"{}\" in text format", path.display());
    let snap = serde_json::from_reader(reader)?;
    return Ok(snap);
}
