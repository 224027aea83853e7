use std::io::Cursor;

use rocket::http::Status;
use thiserror::Error;

use crate::images::PipelineError;
use crate::stars::StarError;

/// Everything a handler can fail with. The mapping is deliberately
/// coarse: a URL outside the allow-listed origin is a 404 carrying
/// `Not Found: <url>`, every other failure is a 500 with the plain-text
/// description. No retries, no partial bodies.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    PipelineError(#[from] PipelineError),

    #[error(transparent)]
    StarError(#[from] StarError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ApiError {
    fn status(&self) -> Status {
        match self {
            ApiError::PipelineError(PipelineError::InvalidOrigin(_)) => Status::NotFound,
            ApiError::StarError(StarError::InvalidOrigin(_)) => Status::NotFound,
            _ => Status::InternalServerError,
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();

        if status == Status::InternalServerError {
            log::error!("Request failed: {}", self);
        }

        rocket::Response::build()
            .status(status)
            .sized_body(None, Cursor::new(self.to_string()))
            .ok()
    }
}
