use std::collections::HashMap;

use tokio::sync::RwLock;

use techpro_core::ChatMessage;

pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Short-term per-session history, capped at `2 * max_history` messages.
pub struct ConversationMemory {
    max_history: usize,
    sessions: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}

impl ConversationMemory {
    pub fn new(max_history: usize) -> Self {
        Self { max_history, sessions: RwLock::new(HashMap::new()) }
    }

    pub async fn append(&self, session_id: &str, message: ChatMessage) {
        let capacity = self.max_history * 2;
        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(message);
        if history.len() > capacity {
            let excess = history.len() - capacity;
            history.drain(..excess);
        }
    }

    pub async fn recent(&self, session_id: &str, count: usize) -> Vec<ChatMessage> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|history| history[history.len().saturating_sub(count)..].to_vec())
            .unwrap_or_default()
    }

    pub async fn history(&self, session_id: &str) -> Vec<ChatMessage> {
        self.sessions.read().await.get(session_id).cloned().unwrap_or_default()
    }

    /// Returns whether the session existed.
    pub async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use techpro_core::ChatMessage;

    use super::ConversationMemory;

    #[tokio::test]
    async fn history_is_trimmed_to_twice_max_history() {
        let memory = ConversationMemory::new(2);
        for index in 0..7 {
            memory.append("s1", ChatMessage::user(format!("m{index}"))).await;
        }

        let contents: Vec<String> =
            memory.history("s1").await.into_iter().map(|message| message.content).collect();
        assert_eq!(contents, vec!["m3", "m4", "m5", "m6"]);
    }

    #[tokio::test]
    async fn recent_returns_tail_and_handles_unknown_sessions() {
        let memory = ConversationMemory::default();
        memory.append("s1", ChatMessage::user("hi")).await;
        memory.append("s1", ChatMessage::assistant("hello")).await;
        memory.append("s1", ChatMessage::user("order?")).await;

        let recent = memory.recent("s1", 2).await;
        assert_eq!(recent[0].content, "hello");
        assert_eq!(recent[1].content, "order?");
        assert_eq!(memory.recent("s1", 10).await.len(), 3);
        assert!(memory.recent("missing", 6).await.is_empty());
    }

    #[tokio::test]
    async fn sessions_are_isolated_and_clearable() {
        let memory = ConversationMemory::default();
        memory.append("a", ChatMessage::user("one")).await;
        memory.append("b", ChatMessage::user("two")).await;
        assert_eq!(memory.session_count().await, 2);

        assert!(memory.clear("a").await);
        assert!(!memory.clear("a").await);
        assert_eq!(memory.session_count().await, 1);
        assert_eq!(memory.history("b").await.len(), 1);
    }
}
