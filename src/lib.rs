//! ai-api-tester - Generate unit tests for Node web projects with an LLM
//!
//! Scans route and controller sources, asks a text-generation API for a test
//! file per source, and writes the results under the project's tests
//! directory. Supports OpenAI, OpenAI-compatible gateways and Anthropic.

pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod util;
