use crate::core::error::FilmError;
use serde::{Deserialize, Serialize};

/// Internal pass identifiers used for routing sample colors into images.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum IntPassType {
    /// The beauty pass. Always external pass index 0.
    Combined,
    NormalSmooth,
    NormalGeom,
    ZDepthNorm,
    ObjIndexAbs,
    ObjIndexAutoAbs,
    MatIndexAbs,
    MatIndexAutoAbs,
    AaSamples,
    DebugSamplingFactor,
    DebugFacesEdges,
    DebugObjectsEdges,
    Toon,
}

/// How a pass image is turned into sink colors, resolved once per film.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ExportRule {
    Normalized,
    /// Normalize, then round RGB up to the nearest integer.
    NormalizedCeil,
    /// The accumulated weight is the output value.
    WeightAsColor,
}

pub const NUM_INT_PASS_TYPES: usize = 13;

impl IntPassType {
    pub fn index(self) -> usize {
        match self {
            IntPassType::Combined => 0,
            IntPassType::NormalSmooth => 1,
            IntPassType::NormalGeom => 2,
            IntPassType::ZDepthNorm => 3,
            IntPassType::ObjIndexAbs => 4,
            IntPassType::ObjIndexAutoAbs => 5,
            IntPassType::MatIndexAbs => 6,
            IntPassType::MatIndexAutoAbs => 7,
            IntPassType::AaSamples => 8,
            IntPassType::DebugSamplingFactor => 9,
            IntPassType::DebugFacesEdges => 10,
            IntPassType::DebugObjectsEdges => 11,
            IntPassType::Toon => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntPassType::Combined => "combined",
            IntPassType::NormalSmooth => "normal_smooth",
            IntPassType::NormalGeom => "normal_geom",
            IntPassType::ZDepthNorm => "z_depth_norm",
            IntPassType::ObjIndexAbs => "obj_index_abs",
            IntPassType::ObjIndexAutoAbs => "obj_index_auto_abs",
            IntPassType::MatIndexAbs => "mat_index_abs",
            IntPassType::MatIndexAutoAbs => "mat_index_auto_abs",
            IntPassType::AaSamples => "aa_samples",
            IntPassType::DebugSamplingFactor => "debug_sampling_factor",
            IntPassType::DebugFacesEdges => "debug_faces_edges",
            IntPassType::DebugObjectsEdges => "debug_objects_edges",
            IntPassType::Toon => "toon",
        }
    }

    pub fn from_name(name: &str) -> Result<IntPassType, FilmError> {
        let all = [
            IntPassType::Combined,
            IntPassType::NormalSmooth,
            IntPassType::NormalGeom,
            IntPassType::ZDepthNorm,
            IntPassType::ObjIndexAbs,
            IntPassType::ObjIndexAutoAbs,
            IntPassType::MatIndexAbs,
            IntPassType::MatIndexAutoAbs,
            IntPassType::AaSamples,
            IntPassType::DebugSamplingFactor,
            IntPassType::DebugFacesEdges,
            IntPassType::DebugObjectsEdges,
            IntPassType::Toon,
        ];
        for t in all.iter() {
            if t.name() == name {
                return Ok(*t);
            }
        }
        let msg = format!("Render pass \"{}\" unknown.", name);
        return Err(FilmError::error(&msg));
    }

    pub fn export_rule(self) -> ExportRule {
        match self {
            IntPassType::AaSamples => ExportRule::WeightAsColor,
            IntPassType::ObjIndexAbs
            | IntPassType::ObjIndexAutoAbs
            | IntPassType::MatIndexAbs
            | IntPassType::MatIndexAutoAbs => ExportRule::NormalizedCeil,
            _ => ExportRule::Normalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_round_trip() {
        for i in ["combined", "aa_samples", "toon", "obj_index_abs"] {
            let t = IntPassType::from_name(i).unwrap();
            assert_eq!(t.name(), i);
        }
        assert!(IntPassType::from_name("bogus").is_err());
    }

    #[test]
    fn export_rules() {
        assert_eq!(IntPassType::AaSamples.export_rule(), ExportRule::WeightAsColor);
        assert_eq!(
            IntPassType::MatIndexAutoAbs.export_rule(),
            ExportRule::NormalizedCeil
        );
        assert_eq!(IntPassType::Combined.export_rule(), ExportRule::Normalized);
    }
}
