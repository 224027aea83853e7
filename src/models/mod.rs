use serde::{Deserialize, Serialize};

/// Reduced color representation of a preview image: the single pixel a
/// Lanczos downscale to 1x1 produces, plus the pixel population that
/// went into it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColorSample {
    pub color: String,
    pub count: u64,
}
