pub mod pipeline;
pub mod transform;

use thiserror::Error;

use crate::fetch::FetchError;
use crate::resolver::ResolveError;

pub use pipeline::{Derivative, HttpPipeline, Pipeline};

pub const CONTENT_TYPE_JPEG: &str = "image/jpeg";
pub const CONTENT_TYPE_PNG: &str = "image/png";

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Invalid width '{0}'")]
    InvalidWidth(String),

    #[error("width <= 1024")]
    WidthTooLarge,

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Not Found: {0}")]
    InvalidOrigin(String),

    #[error(transparent)]
    FetchError(#[from] FetchError),

    #[error(transparent)]
    ResolveError(#[from] ResolveError),

    #[error(transparent)]
    TransformError(#[from] TransformError),

    #[error("Store error: {0}")]
    StoreError(#[from] std::io::Error),
}

/// Size variants for the plain image route, resolved once from the raw
/// `width`/`height` query strings instead of re-sniffing them at each
/// pipeline step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeVariant {
    /// width=auto, height=auto: respond with the pristine source bytes,
    /// never persisted.
    PassThrough,
    /// Numeric width, height=auto: proportional width-driven scale.
    ScaleWidth(u32),
    /// Any other combination. Height-driven scaling was never built;
    /// the source bytes come back unchanged but the decoded image is
    /// still persisted under the derivative key.
    Original,
}

impl SizeVariant {
    pub fn resolve(width: &str, height: &str) -> Result<Self, TransformError> {
        match (width, height) {
            ("auto", "auto") => Ok(SizeVariant::PassThrough),
            (w, "auto") => {
                let parsed: u32 = w
                    .parse()
                    .map_err(|_| TransformError::InvalidWidth(w.to_string()))?;
                if parsed == 0 {
                    return Err(TransformError::InvalidWidth(w.to_string()));
                }
                Ok(SizeVariant::ScaleWidth(parsed))
            }
            _ => Ok(SizeVariant::Original),
        }
    }
}
