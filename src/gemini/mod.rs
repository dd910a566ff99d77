//! Gemini enrichment: prompt construction and the generateContent client.

mod client;
mod prompt;

pub use client::{EnrichError, GeminiClient, NO_ANALYSIS_SENTINEL};
pub use prompt::build_prompt;
