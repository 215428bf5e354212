//! Generation backend module
//!
//! Provides the abstraction over the hosted generation/embeddings capability
//! and its implementations: the OpenAI-compatible HTTP backend used in
//! production, and a deterministic mock used by tests.

mod mock;
mod openai;
mod traits;

pub use mock::{MockBackend, MockConfig};
pub use openai::OpenAiBackend;
pub use traits::*;
