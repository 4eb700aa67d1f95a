//! Concrete fetcher and enhancer implementations.

pub mod http;
pub mod openai;

pub use http::HtmlMetadataFetcher;
pub use openai::{OpenAIClient, OpenAIEnhancer};
