//! Adapters for external services.

pub mod openai;

pub use openai::OpenAiDecisionFunction;
