mod error;
pub use error::ApiError;

mod handler;
pub use handler::{ApiHandler, JobSubmission};

mod adapter;
pub use adapter::SubmitterAdapter;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpApi;

#[cfg(feature = "http")]
pub use axum;
