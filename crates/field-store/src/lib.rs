#![allow(missing_docs)]

pub mod backend;
pub mod error;
pub mod normalize;

pub use backend::{InMemoryBackend, StoredAnswer};
pub use error::StoreError;
pub use normalize::normalize;
