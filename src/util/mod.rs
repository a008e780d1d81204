pub mod env;
pub mod gemini;
pub mod helix;
pub mod tracing;
