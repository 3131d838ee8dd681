//! Conversation buffer.
//!
//! Append-only log of turns. Prompts are built from a window of the most
//! recent turns, formatted as `"<Role>: <content>"` lines and closed with
//! the bot cue so generation continues as the bot.

use parley_types::chat::{Role, Turn};

/// Trailing cue appended to every prompt. Reply extraction looks for the
/// same marker in the decoded output.
pub const CUE_MARKER: &str = "Bot:";

/// Ordered store of the turns in one conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationBuffer {
    turns: Vec<Turn>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a turn at the end of the conversation.
    ///
    /// Callers only ever pass non-empty content: user input is trimmed and
    /// rejected upstream, bot replies fall back to a fixed string.
    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        let turn = Turn::new(role, content);
        debug_assert!(!turn.content().is_empty(), "turn content must be non-empty");
        self.turns.push(turn);
    }

    /// The last `min(k, len)` turns, oldest first.
    pub fn recent(&self, k: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(k);
        &self.turns[start..]
    }

    /// Render the last `k` turns as prompt text ending in the bot cue.
    pub fn to_prompt(&self, k: usize) -> String {
        let mut prompt = self
            .recent(k)
            .iter()
            .map(|turn| format!("{}: {}", turn.role(), turn.content()))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push('\n');
        prompt.push_str(CUE_MARKER);
        prompt
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
