use crate::core::base::Float;
use std::collections::HashMap;

/// String-keyed configuration bag feeding the film factory. Lookups fall
/// back to the supplied default, so callers only set what they change.
#[derive(Debug, Default, Clone)]
pub struct ParamSet {
    bools: HashMap<String, bool>,
    ints: HashMap<String, i32>,
    floats: HashMap<String, Float>,
    strings: HashMap<String, String>,
}

impl ParamSet {
    pub fn new() -> Self {
        ParamSet::default()
    }

    pub fn add_bool(&mut self, key: &str, value: bool) {
        self.bools.insert(String::from(key), value);
    }

    pub fn add_int(&mut self, key: &str, value: i32) {
        self.ints.insert(String::from(key), value);
    }

    pub fn add_float(&mut self, key: &str, value: Float) {
        self.floats.insert(String::from(key), value);
    }

    pub fn add_string(&mut self, key: &str, value: &str) {
        self.strings.insert(String::from(key), String::from(value));
    }

    pub fn find_one_bool(&self, key: &str, value: bool) -> bool {
        return self.bools.get(key).copied().unwrap_or(value);
    }

    pub fn find_one_int(&self, key: &str, value: i32) -> i32 {
        return self.ints.get(key).copied().unwrap_or(value);
    }

    pub fn find_one_float(&self, key: &str, value: Float) -> Float {
        return self.floats.get(key).copied().unwrap_or(value);
    }

    pub fn find_one_string(&self, key: &str, value: &str) -> String {
        return self
            .strings
            .get(key)
            .cloned()
            .unwrap_or_else(|| String::from(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_overrides() {
        let mut params = ParamSet::new();
        params.add_int("tile_size", 16);
        params.add_string("filter_type", "mitchell");
        assert_eq!(params.find_one_int("tile_size", 32), 16);
        assert_eq!(params.find_one_int("missing", 32), 32);
        assert_eq!(params.find_one_string("filter_type", "box"), "mitchell");
        assert_eq!(params.find_one_bool("premult_alpha", false), false);
        assert_eq!(params.find_one_float("gamma", 1.0), 1.0);
    }
}
