use std::path::PathBuf;

use log::{info, warn};

use crate::cache::{key, ColorCache, DerivativeStore};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::images::{
    transform, PipelineError, SizeVariant, CONTENT_TYPE_JPEG, CONTENT_TYPE_PNG,
};
use crate::models::ColorSample;
use crate::resolver;

/// A computed (or cached) derivative ready to stream back.
#[derive(Debug)]
pub struct Derivative {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Orchestrates one derivative request: validate, check the store,
/// resolve the page's preview image, fetch it, transform, write through,
/// respond. Each request runs independently; concurrent misses for the
/// same key may duplicate work and the last write wins.
pub struct Pipeline<F: Fetcher> {
    fetcher: F,
    store: DerivativeStore,
    memo: ColorCache,
    url_prefix: String,
    mask_path: PathBuf,
}

pub type HttpPipeline = Pipeline<HttpFetcher>;

impl<F: Fetcher> Pipeline<F> {
    pub fn new(
        fetcher: F,
        store: DerivativeStore,
        memo: ColorCache,
        url_prefix: String,
        mask_path: PathBuf,
    ) -> Self {
        Self {
            fetcher,
            store,
            memo,
            url_prefix,
            mask_path,
        }
    }

    fn validate(&self, url: &str) -> Result<(), PipelineError> {
        if !url.starts_with(&self.url_prefix) {
            warn!("Rejected url outside allow-listed origin: {}", url);
            return Err(PipelineError::InvalidOrigin(url.to_string()));
        }
        Ok(())
    }

    /// Fetch the page and pull the first og:image content URL out of it.
    async fn resolve_preview(&self, page_url: &str) -> Result<String, PipelineError> {
        let body = self.fetcher.fetch(page_url).await?;
        let html = String::from_utf8_lossy(&body);
        Ok(resolver::extract_preview_image(&html)?)
    }

    /// The plain image route: resized, pass-through, or the original
    /// fallback, keyed by the raw width/height strings.
    pub async fn image_derivative(
        &self,
        url: &str,
        width: &str,
        height: &str,
    ) -> Result<Derivative, PipelineError> {
        self.validate(url)?;
        let variant = SizeVariant::resolve(width, height)?;
        let key = key::image_key(url, &self.url_prefix, width, height);

        if self.store.exists(&key) {
            info!("Derivative found in store: {}", key);
            return Ok(Derivative {
                bytes: self.store.read(&key)?,
                content_type: CONTENT_TYPE_JPEG,
            });
        }

        info!("Derivative not in store, computing: {}", key);
        let image_url = self.resolve_preview(url).await?;
        let source = self.fetcher.fetch(&image_url).await?;

        match variant {
            // Pristine bytes are never persisted under a derivative name.
            SizeVariant::PassThrough => Ok(Derivative {
                bytes: source,
                content_type: CONTENT_TYPE_JPEG,
            }),
            SizeVariant::ScaleWidth(target) => {
                let scaled = transform::scale_to_width(&source, target)?;
                self.store.write(&key, &scaled)?;
                Ok(Derivative {
                    bytes: scaled,
                    content_type: CONTENT_TYPE_JPEG,
                })
            }
            SizeVariant::Original => {
                // Height-driven scaling was never implemented. The
                // response is the untouched source, but the decoded
                // image still goes through the same write path.
                let persisted = transform::reencode_jpeg(&source)?;
                self.store.write(&key, &persisted)?;
                Ok(Derivative {
                    bytes: source,
                    content_type: CONTENT_TYPE_JPEG,
                })
            }
        }
    }

    /// The blurred-and-masked route; always persisted as PNG.
    pub async fn blurred_derivative(&self, url: &str) -> Result<Derivative, PipelineError> {
        self.validate(url)?;
        let key = key::blur_key(url, &self.url_prefix);

        if self.store.exists(&key) {
            info!("Blurred derivative found in store: {}", key);
            return Ok(Derivative {
                bytes: self.store.read(&key)?,
                content_type: CONTENT_TYPE_PNG,
            });
        }

        info!("Blurred derivative not in store, computing: {}", key);
        let image_url = self.resolve_preview(url).await?;
        let source = self.fetcher.fetch(&image_url).await?;

        let blurred = transform::blur_with_mask(&source, &self.mask_path)?;
        self.store.write(&key, &blurred)?;

        Ok(Derivative {
            bytes: blurred,
            content_type: CONTENT_TYPE_PNG,
        })
    }

    /// The color-average route, memoized per page URL in memory only;
    /// the derivative store is never involved.
    pub async fn color_average(&self, url: &str) -> Result<ColorSample, PipelineError> {
        self.validate(url)?;

        if let Some(sample) = self.memo.get(url) {
            info!("Color average served from memo: {}", url);
            return Ok(sample);
        }

        let image_url = self.resolve_preview(url).await?;
        let source = self.fetcher.fetch(&image_url).await?;

        let sample = transform::color_average(&source)?;
        self.memo.put(url, sample.clone());

        Ok(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use tempfile::TempDir;

    use crate::fetch::FetchError;
    use crate::images::TransformError;

    const PREFIX: &str = "http://nasust.hatenablog.com/";
    const PAGE: &str = "http://nasust.hatenablog.com/entry/foo";
    const IMAGE_URL: &str = "https://cdn.example.com/foo.png";

    struct StubFetcher {
        responses: HashMap<String, Vec<u8>>,
        calls: Arc<AtomicUsize>,
    }

    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::StatusError(404, url.to_string()))
        }
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([120, 60, 30, 255]));
        let mut out = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    fn page_html() -> Vec<u8> {
        format!(
            r#"<html><head><meta property="og:image" content="{}"/></head></html>"#,
            IMAGE_URL
        )
        .into_bytes()
    }

    fn pipeline(
        responses: HashMap<String, Vec<u8>>,
    ) -> (Pipeline<StubFetcher>, Arc<AtomicUsize>, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = StubFetcher {
            responses,
            calls: calls.clone(),
        };
        let mask_path = dir.path().join("mask.png");
        let pipeline = Pipeline::new(
            fetcher,
            DerivativeStore::new(dir.path()),
            ColorCache::new(),
            PREFIX.to_string(),
            mask_path,
        );
        (pipeline, calls, dir)
    }

    fn full_responses() -> HashMap<String, Vec<u8>> {
        let mut responses = HashMap::new();
        responses.insert(PAGE.to_string(), page_html());
        responses.insert(IMAGE_URL.to_string(), png_bytes(8, 4));
        responses
    }

    #[tokio::test]
    async fn store_hit_skips_all_outbound_fetches() {
        let (pipeline, calls, dir) = pipeline(HashMap::new());
        let key = key::image_key(PAGE, PREFIX, "320", "auto");
        std::fs::write(dir.path().join(&key), b"cached jpeg").unwrap();

        let derivative = pipeline.image_derivative(PAGE, "320", "auto").await.unwrap();

        assert_eq!(derivative.bytes, b"cached jpeg");
        assert_eq!(derivative.content_type, CONTENT_TYPE_JPEG);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pass_through_never_persists() {
        let (pipeline, calls, dir) = pipeline(full_responses());
        let key = key::image_key(PAGE, PREFIX, "auto", "auto");

        for _ in 0..2 {
            let derivative = pipeline.image_derivative(PAGE, "auto", "auto").await.unwrap();
            assert_eq!(derivative.bytes, png_bytes(8, 4));
        }

        assert!(!dir.path().join(&key).exists());
        // No caching means page + image fetched on both calls.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn scaled_derivative_is_written_through_and_reused() {
        let (pipeline, calls, dir) = pipeline(full_responses());
        let key = key::image_key(PAGE, PREFIX, "4", "auto");

        let first = pipeline.image_derivative(PAGE, "4", "auto").await.unwrap();
        let img = image::load_from_memory(&first.bytes).unwrap();
        assert_eq!(image::GenericImageView::dimensions(&img), (4, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(std::fs::read(dir.path().join(&key)).unwrap(), first.bytes);

        let second = pipeline.image_derivative(PAGE, "4", "auto").await.unwrap();
        assert_eq!(second.bytes, first.bytes);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalid_origin_fails_before_any_fetch() {
        let (pipeline, calls, _dir) = pipeline(full_responses());

        let err = pipeline
            .image_derivative("http://evil.example.com/entry/foo", "320", "auto")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidOrigin(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_width_is_rejected_after_fetch_without_write() {
        let (pipeline, calls, dir) = pipeline(full_responses());
        let key = key::image_key(PAGE, PREFIX, "2000", "auto");

        let err = pipeline.image_derivative(PAGE, "2000", "auto").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::TransformError(TransformError::WidthTooLarge)
        ));
        // The bound is only checked once the source image is in hand.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!dir.path().join(&key).exists());
    }

    #[tokio::test]
    async fn unparseable_width_fails_at_the_boundary() {
        let (pipeline, calls, _dir) = pipeline(full_responses());

        let err = pipeline.image_derivative(PAGE, "wide", "auto").await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::TransformError(TransformError::InvalidWidth(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fallback_responds_with_source_bytes_but_persists() {
        let (pipeline, calls, dir) = pipeline(full_responses());
        let key = key::image_key(PAGE, PREFIX, "100", "200");

        let derivative = pipeline.image_derivative(PAGE, "100", "200").await.unwrap();

        assert_eq!(derivative.bytes, png_bytes(8, 4));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let persisted = std::fs::read(dir.path().join(&key)).unwrap();
        // Persisted artifact is the JPEG re-encode, not the source bytes.
        assert_ne!(persisted, derivative.bytes);
        image::load_from_memory(&persisted).unwrap();
    }

    #[tokio::test]
    async fn missing_og_image_surfaces_the_expected_text() {
        let mut responses = HashMap::new();
        responses.insert(
            PAGE.to_string(),
            b"<html><head><title>bare</title></head></html>".to_vec(),
        );
        let (pipeline, _calls, _dir) = pipeline(responses);

        let err = pipeline.image_derivative(PAGE, "auto", "auto").await.unwrap_err();
        assert!(err.to_string().contains("not found og image"));
    }

    #[tokio::test]
    async fn blurred_derivative_is_written_through_and_reused() {
        let (pipeline, calls, dir) = pipeline(full_responses());
        let mask = RgbaImage::from_pixel(8, 4, Rgba([255, 255, 255, 255]));
        let mut mask_bytes = Vec::new();
        DynamicImage::ImageRgba8(mask)
            .write_to(&mut Cursor::new(&mut mask_bytes), ImageFormat::Png)
            .unwrap();
        std::fs::write(dir.path().join("mask.png"), mask_bytes).unwrap();

        let key = key::blur_key(PAGE, PREFIX);

        let first = pipeline.blurred_derivative(PAGE).await.unwrap();
        assert_eq!(first.content_type, CONTENT_TYPE_PNG);
        image::load_from_memory(&first.bytes).unwrap();
        assert_eq!(std::fs::read(dir.path().join(&key)).unwrap(), first.bytes);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = pipeline.blurred_derivative(PAGE).await.unwrap();
        assert_eq!(second.bytes, first.bytes);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn color_average_is_memoized_per_url() {
        let (pipeline, calls, _dir) = pipeline(full_responses());

        let first = pipeline.color_average(PAGE).await.unwrap();
        assert_eq!(first.count, 32);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let second = pipeline.color_average(PAGE).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
