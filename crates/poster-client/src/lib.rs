//! HTTP client for the poster generation backend.

mod http;
#[cfg(feature = "test-util")]
pub mod mock;

pub use http::HttpGenerationService;
pub use poster_types::{GenerationService, ServiceError};

#[cfg(feature = "test-util")]
pub use mock::MockGenerationService;
