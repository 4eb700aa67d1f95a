//! OpenAI-backed AI enhancer.

pub mod client;
pub mod enhancer;
pub mod types;

pub use client::OpenAIClient;
pub use enhancer::OpenAIEnhancer;
