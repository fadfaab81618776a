//! Common interface of the conversation-facing memories

use crate::episodic::EpisodicMemory;
use crate::knowledge::KnowledgeGraphMemory;
use async_trait::async_trait;
use engram_core::Result;

/// A memory that observes conversation turns and renders prompt context
#[async_trait]
pub trait ConversationMemory: Send + Sync {
    /// Observe one turn of a session
    async fn save_exchange(&self, session_id: &str, input: &str, output: &str) -> Result<()>;

    /// Render context for the next turn of a session
    async fn context_for(&self, session_id: &str, input: &str) -> Result<String>;

    /// Drop what the memory holds for a session
    async fn forget_session(&self, session_id: &str) -> Result<()>;
}

#[async_trait]
impl ConversationMemory for KnowledgeGraphMemory {
    async fn save_exchange(&self, session_id: &str, input: &str, output: &str) -> Result<()> {
        self.save_texts(session_id, &[input, output]).await?;
        Ok(())
    }

    async fn context_for(&self, session_id: &str, input: &str) -> Result<String> {
        self.load_context(session_id, input).await
    }

    async fn forget_session(&self, session_id: &str) -> Result<()> {
        self.clear_session(session_id)?;
        Ok(())
    }
}

#[async_trait]
impl ConversationMemory for EpisodicMemory {
    async fn save_exchange(&self, session_id: &str, input: &str, output: &str) -> Result<()> {
        self.record_exchange(session_id, input, output)?;
        Ok(())
    }

    async fn context_for(&self, session_id: &str, _input: &str) -> Result<String> {
        self.load_context(session_id)
    }

    async fn forget_session(&self, session_id: &str) -> Result<()> {
        self.clear_session(session_id)?;
        Ok(())
    }
}
