//! Ask command handler.

use super::open_engine;
use clap::Args;
use docrag_core::{AppConfig, AppResult};
use docrag_knowledge::answer_question;
use docrag_llm::OllamaClient;
use std::time::Duration;

/// Answer a question from the closest paragraphs
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question
    pub question: String,

    /// Paragraphs to retrieve as context
    #[arg(short = 'k', long = "top-k")]
    pub top_k: Option<usize>,

    /// Generation model (default: chat.model from config)
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let engine = open_engine(config).await?;

        let mut llm = OllamaClient::with_base_url(&config.endpoint);
        if let Some(secs) = config.timeout_secs {
            llm = llm.with_timeout(Duration::from_secs(secs))?;
        }

        let chat_model = self.chat_model.as_deref().unwrap_or(&config.chat_model);
        let k = self.top_k.unwrap_or(config.top_k);

        let answer = answer_question(&engine, &llm, chat_model, &self.question, k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            return Ok(());
        }

        println!("{}", answer.answer);
        if !answer.sources.is_empty() {
            println!();
            println!("Sources:");
            for source in &answer.sources {
                println!(
                    "  - {} #{} ({:.3})",
                    source.file, source.chunk, source.similarity
                );
            }
        }

        Ok(())
    }
}
