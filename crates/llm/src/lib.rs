//! LLM integration crate for the LexRAG pipeline.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs) through a unified trait-based interface.
//!
//! # Providers
//! - **Groq**: Hosted OpenAI-compatible API (default)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use lexrag_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//! use lexrag_core::RetryPolicy;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new(RetryPolicy::default());
//! let request = LlmRequest::new("Hello, world!", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{GroqClient, OllamaClient};
