pub mod blog;
pub mod error;

pub use error::ApiError;
