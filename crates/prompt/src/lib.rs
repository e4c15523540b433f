//! Prompt assembly for the LexRAG pipeline.
//!
//! Builds the single deterministic instruction+context+question prompt that
//! conditions the language model on retrieved passages. The instruction
//! carries the answer-from-context contract: the model must answer only from
//! the supplied context and emit a fixed refusal sentence when the answer is
//! not derivable from it. That refusal policy is a correctness property of
//! the system, not a stylistic choice.

pub mod builder;

pub use builder::{build_prompt, BuiltPrompt, ContextBlock, REFUSAL_ANSWER};
