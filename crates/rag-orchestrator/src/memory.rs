//! Token-bounded conversation memory.
//!
//! Messages live in a short-term window bounded by `max_tokens`. When the
//! window overflows, the oldest messages are evicted and folded into a
//! running summary bounded by `summary_tokens`; the oldest summary text goes
//! first. One instance per conversation, owned by the caller.
//!
//! Planning sees only the user side of the conversation: the most recent
//! `context_turns` questions, whether still in the window or already
//! folded into the summary.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;
use tracing::{debug, warn};

use rag_types::MemoryConfig;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Token count of `content`
    pub tokens: usize,
}

/// One evicted message as kept in the summary.
#[derive(Debug, Clone, PartialEq)]
struct SummaryLine {
    role: Role,
    text: String,
}

impl SummaryLine {
    fn render(&self) -> String {
        format!("{}: {}", self.role, self.text)
    }
}

/// cl100k_base token counter with a ~4 chars/token fallback.
#[derive(Clone)]
struct TokenCounter {
    bpe: Option<Arc<CoreBPE>>,
}

impl TokenCounter {
    fn new() -> Self {
        let bpe = match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(Arc::new(bpe)),
            Err(e) => {
                warn!(error = %e, "Tokenizer unavailable, estimating token counts");
                None
            }
        };
        Self { bpe }
    }

    fn count(&self, text: &str) -> usize {
        match &self.bpe {
            Some(bpe) => bpe.encode_with_special_tokens(text).len(),
            None => (text.len() / 4).max(1),
        }
    }
}

/// Per-conversation message log with token-bounded eviction.
#[derive(Clone)]
pub struct ConversationMemory {
    config: MemoryConfig,
    messages: VecDeque<Message>,
    summary: VecDeque<SummaryLine>,
    window_tokens: usize,
    counter: TokenCounter,
}

impl std::fmt::Debug for ConversationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationMemory")
            .field("config", &self.config)
            .field("messages", &self.messages.len())
            .field("summary_lines", &self.summary.len())
            .field("window_tokens", &self.window_tokens)
            .finish()
    }
}

impl ConversationMemory {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            messages: VecDeque::new(),
            summary: VecDeque::new(),
            window_tokens: 0,
            counter: TokenCounter::new(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Append a message, evicting the oldest ones if the window overflows.
    ///
    /// The newest message always stays in the window, even when it alone
    /// exceeds `max_tokens`.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        let content = content.into();
        let tokens = self.counter.count(&content);
        self.window_tokens += tokens;
        self.messages.push_back(Message {
            role,
            content,
            timestamp: Utc::now(),
            tokens,
        });

        while self.window_tokens > self.config.max_tokens && self.messages.len() > 1 {
            let Some(evicted) = self.messages.pop_front() else {
                break;
            };
            self.window_tokens -= evicted.tokens;
            debug!(
                role = %evicted.role,
                tokens = evicted.tokens,
                window_tokens = self.window_tokens,
                "Evicted message into summary"
            );
            self.fold_into_summary(&evicted);
        }
    }

    /// Rendered summary followed by the message window; empty when nothing
    /// has been said.
    pub fn get_context(&self) -> String {
        let mut sections = Vec::new();
        if !self.summary.is_empty() {
            sections.push(format!("Earlier conversation:\n{}", self.summary()));
        }
        if !self.messages.is_empty() {
            sections.push(
                self.messages
                    .iter()
                    .map(|m| format!("{}: {}", m.role, m.content))
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        sections.join("\n\n")
    }

    /// Earlier user questions, oldest first, across the summary and the
    /// window; at most `context_turns` of them.
    pub fn user_turns(&self) -> Vec<&str> {
        let summarized = self
            .summary
            .iter()
            .filter(|line| line.role == Role::User)
            .map(|line| line.text.as_str());
        let windowed = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.trim());

        let turns: Vec<&str> = summarized
            .chain(windowed)
            .filter(|t| !t.is_empty())
            .collect();
        let skip = turns.len().saturating_sub(self.config.context_turns);
        turns.into_iter().skip(skip).collect()
    }

    /// Query text for planning: [`Self::user_turns`] then `query`, joined
    /// with "; ".
    pub fn planning_context(&self, query: &str) -> String {
        let mut parts = self.user_turns();
        if parts.is_empty() {
            return query.to_string();
        }
        parts.push(query);
        parts.join("; ")
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Summary of evicted messages, one line per message.
    pub fn summary(&self) -> String {
        self.summary
            .iter()
            .map(SummaryLine::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Messages currently in the window.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.summary.is_empty()
    }

    /// Tokens held in the window plus the summary.
    pub fn total_tokens(&self) -> usize {
        let summary_tokens = if self.summary.is_empty() {
            0
        } else {
            self.counter.count(&self.summary())
        };
        self.window_tokens + summary_tokens
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.summary.clear();
        self.window_tokens = 0;
    }

    fn fold_into_summary(&mut self, message: &Message) {
        self.summary.push_back(SummaryLine {
            role: message.role,
            text: message.content.trim().to_string(),
        });

        while !self.summary.is_empty()
            && self.counter.count(&self.summary()) > self.config.summary_tokens
        {
            if self.summary.len() > 1 {
                self.summary.pop_front();
                continue;
            }
            // Single oversized line: drop its leading words until it fits.
            let Some(line) = self.summary.pop_front() else {
                break;
            };
            let words: Vec<&str> = line.text.split_whitespace().collect();
            let kept = (1..words.len())
                .map(|start| SummaryLine {
                    role: line.role,
                    text: words[start..].join(" "),
                })
                .find(|tail| self.counter.count(&tail.render()) <= self.config.summary_tokens);
            if let Some(tail) = kept {
                self.summary.push_back(tail);
            }
            break;
        }
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}
