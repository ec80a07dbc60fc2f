//! Question answering over retrieved chunks.
//!
//! Retrieves the top-k chunks, then asks a generation model to answer from
//! them alone.

use crate::search::SearchEngine;
use crate::types::SearchResult;
use docrag_core::AppResult;
use docrag_llm::{LlmClient, LlmRequest};
use serde::Serialize;

/// A generated answer with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SearchResult>,
    /// Generation model, `None` when the model was not consulted
    pub model: Option<String>,
}

impl Answer {
    /// Fixed reply used when retrieval finds nothing.
    pub fn no_information(question: &str) -> Self {
        Self {
            answer: format!(
                "I could not find information about \"{}\" in the documentation.",
                question
            ),
            sources: Vec::new(),
            model: None,
        }
    }
}

const SYSTEM_PROMPT: &str = "You are a documentation assistant.\n\n\
Instructions:\n\
- Answer using only the documentation excerpts provided\n\
- If the excerpts do not contain the answer, say: \"I could not find this in the documentation.\"\n\
- Do not refer to excerpt numbers\n\
- Keep the answer short and factual\n";

/// Join retrieved chunks into a numbered context block.
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] ({})\n{}", i + 1, r.file, r.text))
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Question:\n{}\n\nDocumentation excerpts:\n{}",
        question, context
    )
}

/// Answer `question` from the `k` closest chunks.
///
/// The generation model is not called when retrieval returns nothing.
pub async fn answer_question(
    engine: &SearchEngine,
    llm: &dyn LlmClient,
    chat_model: &str,
    question: &str,
    k: usize,
) -> AppResult<Answer> {
    let sources = engine.query(question, k).await?;

    if sources.is_empty() {
        tracing::info!("No chunks retrieved for question, skipping generation");
        return Ok(Answer::no_information(question));
    }

    tracing::info!(
        "Retrieved {} chunks (best similarity {:.3})",
        sources.len(),
        sources[0].similarity
    );

    let context = build_context(&sources);
    let request = LlmRequest::new(build_prompt(question, &context), chat_model)
        .with_system(SYSTEM_PROMPT)
        .with_temperature(0.3);

    let response = llm.complete(&request).await?;

    Ok(Answer {
        answer: response.content.trim().to_string(),
        sources,
        model: Some(response.model),
    })
}
