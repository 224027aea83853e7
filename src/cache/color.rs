use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::ColorSample;

/// In-memory memo for color-average results, keyed by page URL.
/// Entries live for the process lifetime; there is no expiry and no
/// size bound. Owned by the pipeline, not a global.
pub struct ColorCache {
    samples: RwLock<HashMap<String, ColorSample>>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self {
            samples: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, url: &str) -> Option<ColorSample> {
        let samples = self.samples.read();
        samples.get(url).cloned()
    }

    pub fn put(&self, url: &str, sample: ColorSample) {
        let mut samples = self.samples.write();
        samples.insert(url.to_string(), sample);
    }
}
