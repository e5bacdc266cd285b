use super::pass_type::*;
use crate::core::error::FilmError;

/// Ordered lists of the external and auxiliary passes a film carries.
///
/// The mapping from pass index to `IntPassType` is fixed for the lifetime of
/// the film; external index 0 is always the combined (beauty) pass.
#[derive(Debug, Clone)]
pub struct PassSet {
    ext: Vec<IntPassType>,
    aux: Vec<IntPassType>,
    ext_rules: Vec<ExportRule>,
}

impl PassSet {
    pub fn new(ext: Vec<IntPassType>, aux: Vec<IntPassType>) -> Result<PassSet, FilmError> {
        if ext.first() != Some(&IntPassType::Combined) {
            return Err(FilmError::error(
                "External pass 0 must be the combined pass.",
            ));
        }
        let ext_rules = ext.iter().map(|t| t.export_rule()).collect();
        return Ok(PassSet {
            ext,
            aux,
            ext_rules,
        });
    }

    /// Beauty-only pass set.
    pub fn combined_only() -> PassSet {
        PassSet::new(vec![IntPassType::Combined], Vec::new()).unwrap()
    }

    pub fn num_ext(&self) -> usize {
        return self.ext.len();
    }

    pub fn num_aux(&self) -> usize {
        return self.aux.len();
    }

    pub fn ext_passes(&self) -> &[IntPassType] {
        return &self.ext;
    }

    pub fn aux_passes(&self) -> &[IntPassType] {
        return &self.aux;
    }

    pub fn int_pass_from_ext_index(&self, idx: usize) -> IntPassType {
        return self.ext[idx];
    }

    pub fn int_pass_from_aux_index(&self, idx: usize) -> IntPassType {
        return self.aux[idx];
    }

    pub fn rule_from_ext_index(&self, idx: usize) -> ExportRule {
        return self.ext_rules[idx];
    }

    /// External index of a pass type, ignoring the combined pass at index 0.
    pub fn ext_index_of(&self, t: IntPassType) -> Option<usize> {
        return (1..self.ext.len()).find(|&i| self.ext[i] == t);
    }

    pub fn aux_index_of(&self, t: IntPassType) -> Option<usize> {
        return (0..self.aux.len()).find(|&i| self.aux[i] == t);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_must_lead() {
        assert!(PassSet::new(vec![IntPassType::ZDepthNorm], Vec::new()).is_err());
        assert!(PassSet::new(Vec::new(), Vec::new()).is_err());
        let p = PassSet::new(
            vec![IntPassType::Combined, IntPassType::AaSamples],
            vec![IntPassType::DebugSamplingFactor],
        )
        .unwrap();
        assert_eq!(p.num_ext(), 2);
        assert_eq!(p.num_aux(), 1);
        assert_eq!(p.ext_index_of(IntPassType::AaSamples), Some(1));
        assert_eq!(p.ext_index_of(IntPassType::Combined), None);
        assert_eq!(p.aux_index_of(IntPassType::DebugSamplingFactor), Some(0));
    }
}
