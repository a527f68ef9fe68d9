pub mod client;
pub mod types;
pub mod url;

pub use client::{ApiClient, ErrorHandling};
pub use url::{segment, ServerUrl};
