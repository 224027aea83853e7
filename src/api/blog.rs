use std::io::Cursor;

use rocket::http::{ContentType, Header};
use rocket::request::Request;
use rocket::response::{self, Responder, Response};
use rocket::State;
use serde::Serialize;

use crate::api::ApiError;
use crate::images::{HttpPipeline, CONTENT_TYPE_PNG};
use crate::stars::HttpStarAggregator;

// Responder for derivative bytes, with an md5 ETag so unchanged
// artifacts revalidate as 304 instead of being re-sent.
pub struct ImageResponse {
    pub data: Vec<u8>,
    pub content_type: &'static str,
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let content_type = if self.content_type == CONTENT_TYPE_PNG {
            ContentType::PNG
        } else {
            ContentType::JPEG
        };

        let etag = format!("\"{:x}\"", md5::compute(&self.data));
        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(rocket::http::Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new("Cache-Control", "public, max-age=86400"))
                    .ok();
            }
        }

        Response::build()
            .header(content_type)
            .header(Header::new("Cache-Control", "public, max-age=86400"))
            .header(Header::new("ETag", etag))
            .sized_body(None, Cursor::new(self.data))
            .ok()
    }
}

pub struct Jsonp(String);

impl<'r> Responder<'r, 'static> for Jsonp {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        Response::build()
            .header(ContentType::JavaScript)
            .sized_body(None, Cursor::new(self.0))
            .ok()
    }
}

/// Serialize with 4-space indentation (the wire format the blog's
/// front-end scripts were written against) and wrap in the callback.
fn jsonp_document<T: Serialize>(callback: &str, value: &T) -> Result<Jsonp, ApiError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    let json = String::from_utf8(buf).unwrap();
    Ok(Jsonp(format!("{}({});", callback, json)))
}

#[get("/blog-image?<url>&<width>&<height>")]
pub async fn blog_image(
    url: &str,
    width: &str,
    height: &str,
    pipeline: &State<HttpPipeline>,
) -> Result<ImageResponse, ApiError> {
    let derivative = pipeline.image_derivative(url, width, height).await?;
    Ok(ImageResponse {
        data: derivative.bytes,
        content_type: derivative.content_type,
    })
}

#[get("/blog-image-blur?<url>")]
pub async fn blog_image_blur(
    url: &str,
    pipeline: &State<HttpPipeline>,
) -> Result<ImageResponse, ApiError> {
    let derivative = pipeline.blurred_derivative(url).await?;
    Ok(ImageResponse {
        data: derivative.bytes,
        content_type: derivative.content_type,
    })
}

#[get("/color-average?<url>&<callback>")]
pub async fn color_average(
    url: &str,
    callback: &str,
    pipeline: &State<HttpPipeline>,
) -> Result<Jsonp, ApiError> {
    let sample = pipeline.color_average(url).await?;
    jsonp_document(callback, &sample)
}

#[get("/star?<urls>&<callback>")]
pub async fn star(
    urls: &str,
    callback: &str,
    aggregator: &State<HttpStarAggregator>,
) -> Result<Jsonp, ApiError> {
    let counts = aggregator.aggregate(urls).await?;
    jsonp_document(callback, &counts)
}
