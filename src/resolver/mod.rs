use lazy_static::lazy_static;
use scraper::{Html, Selector};
use thiserror::Error;

lazy_static! {
    static ref OG_IMAGE_SELECTOR: Selector =
        Selector::parse(r#"meta[property="og:image"]"#).unwrap();
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("not found og image")]
    OgImageMissing,

    #[error("not found og image content")]
    OgContentMissing,
}

/// Extract the canonical preview-image URL from a page's markup.
///
/// Only the first `og:image` meta element counts; pages carrying several
/// keep their first one, as the blog theme puts the entry image there.
pub fn extract_preview_image(html: &str) -> Result<String, ResolveError> {
    let document = Html::parse_document(html);

    let element = document
        .select(&OG_IMAGE_SELECTOR)
        .next()
        .ok_or(ResolveError::OgImageMissing)?;

    element
        .value()
        .attr("content")
        .map(str::to_string)
        .ok_or(ResolveError::OgContentMissing)
}
