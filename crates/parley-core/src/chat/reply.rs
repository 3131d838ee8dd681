//! Reply extraction and the fixed user-facing strings.
//!
//! The four strings below are part of the observable contract: each failed
//! stage maps to exactly one apology, and an unusable model output maps to
//! the fallback reply.

use parley_types::chat::FailureStage;

use crate::conversation::CUE_MARKER;

pub const APOLOGY_ENCODE: &str = "I'm sorry, I couldn't process your input.";
pub const APOLOGY_GENERATE: &str = "I'm sorry, I couldn't generate a response.";
pub const APOLOGY_DECODE: &str = "I'm sorry, I couldn't decode the response.";
pub const FALLBACK_REPLY: &str = "I'm not sure how to respond to that.";

/// Shown when the tokenizer or model cannot be loaded at startup.
pub const LOAD_FAILURE_BANNER: &str = "Failed to load the chatbot model. Please try again later.";

/// Apology shown for a turn that failed at `stage`.
pub fn apology(stage: FailureStage) -> &'static str {
    match stage {
        FailureStage::Encode => APOLOGY_ENCODE,
        FailureStage::Generate => APOLOGY_GENERATE,
        FailureStage::Decode => APOLOGY_DECODE,
    }
}

/// Text after the last cue marker, trimmed.
///
/// Returns `None` when the marker is absent or nothing follows it.
pub fn extract_reply(decoded: &str) -> Option<String> {
    let start = decoded.rfind(CUE_MARKER)? + CUE_MARKER.len();
    let reply = decoded[start..].trim();
    if reply.is_empty() {
        None
    } else {
        Some(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_text_after_cue() {
        assert_eq!(
            extract_reply("User: hi\nBot: Hello there!").as_deref(),
            Some("Hello there!")
        );
    }

    #[test]
    fn test_uses_last_cue() {
        let decoded = "User: hi\nBot: hello\nUser: how are you?\nBot:  Fine, thanks. \n";
        assert_eq!(extract_reply(decoded).as_deref(), Some("Fine, thanks."));
    }

    #[test]
    fn test_missing_cue() {
        assert_eq!(extract_reply("User: hi\nsomething else"), None);
    }

    #[test]
    fn test_empty_after_cue() {
        assert_eq!(extract_reply("User: hi\nBot:   \n"), None);
    }

    #[test]
    fn test_apology_per_stage_is_distinct() {
        assert_eq!(apology(FailureStage::Encode), "I'm sorry, I couldn't process your input.");
        assert_eq!(apology(FailureStage::Generate), "I'm sorry, I couldn't generate a response.");
        assert_eq!(apology(FailureStage::Decode), "I'm sorry, I couldn't decode the response.");
    }
}
