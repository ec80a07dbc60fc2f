//! Serve command handler.

use clap::Args;
use docrag_core::{AppConfig, AppResult};

/// Run the query-time proxy
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind address (default: proxy.listen from config)
    #[arg(long)]
    pub listen: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let mut config = config.clone();
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
            config.validate()?;
        }

        docrag_proxy::serve(&config).await
    }
}
