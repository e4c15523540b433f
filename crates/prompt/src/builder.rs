//! Prompt builder for rendering the RAG answering template.

use handlebars::Handlebars;
use lexrag_core::{AppError, AppResult};
use serde::Serialize;

/// The exact sentence the model is instructed to emit when the answer is not
/// derivable from the retrieved context. The engine also returns this text
/// directly when the index is empty, without calling the model at all.
pub const REFUSAL_ANSWER: &str =
    "I cannot find this information in the uploaded legal documents.";

/// User-message template rendered with the concatenated context and question.
const USER_TEMPLATE: &str = "Context:\n{{context}}\n\nQuestion: {{question}}\n\nAnswer:";

/// System instruction describing the domain and the refusal policy.
const SYSTEM_INSTRUCTION: &str = "\
You are an AI legal assistant answering questions about a private collection of legal documents.
Use only the provided context to answer the user's question.
Be precise and accurate, and cite relevant sections when possible.
Do not rely on outside knowledge and do not speculate.

If the information needed to answer is not found in the provided context, respond with exactly:
\"I cannot find this information in the uploaded legal documents.\"";

/// A retrieved passage with its source attribution, in retrieval rank order.
#[derive(Debug, Clone, Serialize)]
pub struct ContextBlock {
    /// Source document name (e.g., "contract.pdf")
    pub source: String,

    /// Page the passage came from
    pub page: u32,

    /// Passage text
    pub text: String,
}

/// A fully assembled prompt ready for LLM execution.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    /// System instruction carrying the refusal contract
    pub system: String,

    /// User message: tagged context blocks followed by the question
    pub user: String,
}

/// Build the answering prompt from retrieved context blocks and a question.
///
/// Blocks are concatenated in the order given (retrieval rank order), each
/// tagged with its source metadata. Output is deterministic for fixed inputs.
pub fn build_prompt(question: &str, blocks: &[ContextBlock]) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt with {} context blocks", blocks.len());

    let context = blocks
        .iter()
        .map(|block| {
            format!(
                "[Source: {}, page {}]\n{}",
                block.source, block.page, block.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    let user = render_template(
        USER_TEMPLATE,
        &serde_json::json!({
            "context": context,
            "question": question,
        }),
    )?;

    Ok(BuiltPrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
    })
}

/// Render a Handlebars template with variables.
fn render_template<T: Serialize>(template: &str, variables: &T) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}
