pub mod color;
pub mod key;
pub mod store;

pub use color::ColorCache;
pub use store::DerivativeStore;
