//! Application Context
//!
//! Wires configuration into the long-lived services shared by the CLI
//! commands and the dashboard server.

use std::sync::Arc;

use tracing::{info, warn};

use crate::agents::{AgentId, RiskCrew, ToolRegistry, build_agent_providers};
use crate::ai::{TimeoutConfig, create_embedder};
use crate::config::{Config, ConfigLoader};
use crate::constants::chat::UNAVAILABLE_REPLY;
use crate::data::ProjectDataService;
use crate::risk::RiskScorer;
use crate::storage::{ChatHistory, RiskRepository, open_vector_store};
use crate::types::{ChatMessage, Result};

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub data: Arc<ProjectDataService>,
    pub repository: Arc<RiskRepository>,
    pub tools: Arc<ToolRegistry>,
    /// `None` when no language model is configured
    pub crew: Option<Arc<RiskCrew>>,
    pub chat: ChatHistory,
}

impl AppContext {
    /// Load configuration from the usual sources and build the services
    pub fn load() -> Result<Self> {
        Self::from_config(ConfigLoader::load()?)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let scorer = RiskScorer::from_config(&config.risk);
        let data = Arc::new(ProjectDataService::new(&config.data, scorer));

        let store = open_vector_store(&config)?;
        let embedder = create_embedder(&config.embedding, &config.llm);
        let repository = Arc::new(RiskRepository::new(store, embedder));

        let providers = build_agent_providers(&config.llm)?;
        let mut tools = ToolRegistry::new(Arc::clone(&data), Arc::clone(&repository));
        if let Some(analyst) = providers
            .as_ref()
            .and_then(|p| p.get(&AgentId::MarketAnalyst))
        {
            tools = tools.with_analyst(Arc::clone(analyst));
        }
        let tools = Arc::new(tools);

        let crew = match providers {
            Some(providers) => {
                let crew = RiskCrew::new(providers, Arc::clone(&tools))?
                    .with_timeouts(TimeoutConfig::from_llm(&config.llm))
                    .with_days_back(config.dashboard.default_days_back);
                info!(
                    "Agents ready ({} / {})",
                    config.llm.provider, config.llm.model
                );
                Some(Arc::new(crew))
            }
            None => {
                warn!("No language model configured; chat is unavailable");
                None
            }
        };

        let chat = ChatHistory::new(&config.chat.history_path, config.chat.max_history);

        Ok(Self {
            config: Arc::new(config),
            data,
            repository,
            tools,
            crew,
            chat,
        })
    }

    pub fn llm_enabled(&self) -> bool {
        self.crew.is_some()
    }

    /// Answer a question through the agent crew. Failures become the reply
    /// text so the conversation can continue.
    pub async fn ask(&self, question: &str, project: &str) -> String {
        let Some(crew) = &self.crew else {
            return UNAVAILABLE_REPLY.to_string();
        };
        match crew.run(question, project).await {
            Ok(result) => result.answer,
            Err(e) => {
                warn!("Chat request failed: {}", e);
                format!("I encountered an error while analyzing your request: {}", e)
            }
        }
    }

    /// Ask, then persist both turns. Returns the reply and the updated history.
    pub async fn converse(
        &self,
        question: &str,
        project: &str,
    ) -> Result<(String, Vec<ChatMessage>)> {
        let user = ChatMessage::user(question);
        let reply = self.ask(question, project).await;
        let history = self
            .chat
            .append(&[user, ChatMessage::assistant(reply.clone())])?;
        Ok((reply, history))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbeddingProviderKind, VectorBackend};
    use tempfile::TempDir;

    #[test]
    fn test_offline_context() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.llm.provider = "none".to_string();
        config.embedding.provider = EmbeddingProviderKind::Hashing;
        config.vector_db.backend = VectorBackend::Sqlite;
        config.vector_db.path = temp.path().join("vectors.db");
        config.chat.history_path = temp.path().join("chat.json");

        let ctx = AppContext::from_config(config).unwrap();
        assert!(!ctx.llm_enabled());
        assert!(ctx.repository.is_enabled());
        assert_eq!(ctx.chat.path(), temp.path().join("chat.json"));
    }

    #[tokio::test]
    async fn test_offline_chat_replies_unavailable() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.llm.provider = "none".to_string();
        config.embedding.provider = EmbeddingProviderKind::Hashing;
        config.vector_db.backend = VectorBackend::None;
        config.chat.history_path = temp.path().join("chat.json");

        let ctx = AppContext::from_config(config).unwrap();
        let (reply, history) = ctx
            .converse("What are the top risks?", "Cloud Migration")
            .await
            .unwrap();
        assert_eq!(reply, UNAVAILABLE_REPLY);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "What are the top risks?");
        assert_eq!(ctx.chat.load().len(), 2);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = Config::default();
        config.llm.temperature = 5.0;
        assert!(AppContext::from_config(config).is_err());
    }
}
