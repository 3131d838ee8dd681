//! Conversation turn types for Parley.
//!
//! A conversation is an ordered log of [`Turn`]s authored by either the
//! user or the bot. [`TurnOutcome`] describes what a single exchange
//! produced, including which pipeline stage failed when it did.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Author of a conversation turn.
///
/// `Display` yields the label used in prompts (`User`, `Bot`); serde uses
/// lowercase names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Bot,
}

impl Role {
    /// Prompt label for this role.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Bot => "Bot",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "bot" => Ok(Role::Bot),
            other => Err(format!("invalid role: '{other}'")),
        }
    }
}

/// A single message in the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::new(Role::Bot, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Pipeline stage at which a turn failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Encode,
    Generate,
    Decode,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Encode => write!(f, "encode"),
            FailureStage::Generate => write!(f, "generate"),
            FailureStage::Decode => write!(f, "decode"),
        }
    }
}

/// Result of handling one user submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// Input was empty after trimming; nothing was recorded.
    Ignored,

    /// The pipeline completed and a bot turn was recorded.
    ///
    /// `fallback` is set when the model output held no usable reply and
    /// the fixed fallback text was used instead.
    Replied { reply: String, fallback: bool },

    /// A collaborator call failed; no bot turn was recorded.
    Failed {
        stage: FailureStage,
        message: String,
    },
}

impl TurnOutcome {
    /// Text to show the user, or `None` when nothing should be rendered.
    pub fn display_text(&self) -> Option<&str> {
        match self {
            TurnOutcome::Ignored => None,
            TurnOutcome::Replied { reply, .. } => Some(reply),
            TurnOutcome::Failed { message, .. } => Some(message),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TurnOutcome::Failed { .. })
    }
}
