//! Chat endpoints.
//!
//! - `POST /api/v1/chat` runs one turn and returns the reply (or apology)
//! - `GET /api/v1/history` returns the conversation so far
//! - `GET /api/v1/session` returns session metadata and counters
//!
//! Turns go through `ChatSession::try_handle`: a request that arrives while
//! another turn is generating is rejected with 409 instead of queued. The
//! turn itself runs on a session task, so a client that disconnects
//! mid-generation still gets its exchange recorded.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use parley_types::chat::{FailureStage, Turn, TurnOutcome};

use crate::http::error::AppError;
use crate::http::response::{ApiResponse, RequestClock};
use crate::state::AppState;

/// Request body for `POST /api/v1/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Response payload for `POST /api/v1/chat`.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    /// Text to show the user: the model reply or a fixed apology.
    pub reply: String,
    /// `replied` or `failed`.
    pub outcome: &'static str,
    /// The model output had no usable reply and the fallback was used.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<FailureStage>,
}

/// Payload for `GET /api/v1/session`.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub started_at: String,
    pub model: String,
    pub max_history: usize,
    pub exchanges: u32,
    pub failures: u32,
    pub busy: bool,
}

/// POST /api/v1/chat - Run one turn.
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatReply>>, AppError> {
    let clock = RequestClock::start();

    if body.message.trim().is_empty() {
        return Err(AppError::Validation("message must not be empty".to_string()));
    }

    let outcome = state.session.try_handle(&body.message).await?;
    let reply = match outcome {
        TurnOutcome::Replied { reply, fallback } => ChatReply {
            reply,
            outcome: "replied",
            fallback,
            failed_stage: None,
        },
        TurnOutcome::Failed { stage, message } => ChatReply {
            reply: message,
            outcome: "failed",
            fallback: false,
            failed_stage: Some(stage),
        },
        TurnOutcome::Ignored => {
            return Err(AppError::Validation("message must not be empty".to_string()));
        }
    };

    Ok(Json(clock.success(reply).with_link("history", "/api/v1/history")))
}

/// GET /api/v1/history - Conversation so far, oldest first.
pub async fn get_history(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Turn>>>, AppError> {
    let clock = RequestClock::start();
    let history = state.session.history();
    Ok(Json(clock.success(history)))
}

/// GET /api/v1/session - Session metadata.
pub async fn get_session(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SessionInfo>>, AppError> {
    let clock = RequestClock::start();
    let session = &state.session;
    let info = SessionInfo {
        id: session.id().to_string(),
        started_at: session.started_at().to_rfc3339(),
        model: state.model_name().to_string(),
        max_history: state.config.conversation.max_history,
        exchanges: session.exchange_count(),
        failures: session.failure_count(),
        busy: session.is_busy(),
    };
    Ok(Json(clock.success(info)))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use parley_core::chat::reply::{APOLOGY_GENERATE, FALLBACK_REPLY};
    use parley_core::inference::scripted::{ScriptedModel, ScriptedTokenizer};
    use parley_core::inference::{BoxCausalLm, BoxTokenizer};
    use parley_types::chat::Role;
    use parley_types::config::ChatConfig;
    use parley_types::error::SessionError;

    use super::*;

    fn state_with(model: ScriptedModel) -> AppState {
        AppState::from_backend(
            BoxTokenizer::new(ScriptedTokenizer::new()),
            BoxCausalLm::new(model),
            ChatConfig::default(),
        )
    }

    fn request(message: &str) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn test_send_message_returns_reply() {
        let state = state_with(ScriptedModel::replying(" Hello there!"));

        let Json(resp) = send_message(State(state.clone()), request("hi")).await.unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.reply, "Hello there!");
        assert_eq!(data.outcome, "replied");
        assert!(!data.fallback);
        assert!(data.failed_stage.is_none());
        assert_eq!(resp.links.get("history").map(String::as_str), Some("/api/v1/history"));

        let Json(history) = get_history(State(state)).await.unwrap();
        let turns = history.data.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role(), Role::User);
        assert_eq!(turns[1].content(), "Hello there!");
    }

    #[tokio::test]
    async fn test_send_message_rejects_blank() {
        let state = state_with(ScriptedModel::replying(" unused"));

        let err = send_message(State(state.clone()), request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let Json(history) = get_history(State(state)).await.unwrap();
        assert!(history.data.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_is_an_apology_not_an_error() {
        let state = state_with(ScriptedModel::replying(" x").failing());

        let Json(resp) = send_message(State(state.clone()), request("hi")).await.unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.reply, APOLOGY_GENERATE);
        assert_eq!(data.outcome, "failed");
        assert_eq!(data.failed_stage, Some(FailureStage::Generate));

        // The user turn stays; no bot turn is recorded.
        let Json(history) = get_history(State(state)).await.unwrap();
        assert_eq!(history.data.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_reply_is_flagged() {
        let state = state_with(ScriptedModel::replying("   "));

        let Json(resp) = send_message(State(state), request("hi")).await.unwrap();
        let data = resp.data.unwrap();
        assert_eq!(data.reply, FALLBACK_REPLY);
        assert!(data.fallback);
    }

    #[tokio::test]
    async fn test_concurrent_request_is_rejected_as_busy() {
        let state = state_with(
            ScriptedModel::replying(" slow").with_delay(Duration::from_millis(300)),
        );

        let first = {
            let state = state.clone();
            tokio::spawn(async move { send_message(State(state), request("first")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = send_message(State(state.clone()), request("second")).await.unwrap_err();
        assert!(matches!(err, AppError::Session(SessionError::Busy)));

        let Json(resp) = first.await.unwrap().unwrap();
        assert_eq!(resp.data.unwrap().reply, "slow");
    }

    #[tokio::test]
    async fn test_session_info_counts_turns() {
        let state = state_with(ScriptedModel::replying(" ok"));
        let Json(sent) = send_message(State(state.clone()), request("one")).await.unwrap();
        assert_eq!(sent.data.unwrap().reply, "ok");

        let Json(resp) = get_session(State(state)).await.unwrap();
        let info = resp.data.unwrap();
        assert_eq!(info.exchanges, 1);
        assert_eq!(info.failures, 0);
        assert!(!info.busy);
        assert_eq!(info.max_history, 6);
        assert_eq!(info.model, "tinyllama-1.1b-chat");
    }

    #[tokio::test]
    async fn test_disconnected_client_still_completes_turn() {
        let state = state_with(
            ScriptedModel::replying(" finished").with_delay(Duration::from_millis(200)),
        );

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            send_message(State(state.clone()), request("hi")),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;
        let Json(history) = get_history(State(state.clone())).await.unwrap();
        let turns = history.data.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content(), "finished");

        let Json(session) = get_session(State(state)).await.unwrap();
        let info = session.data.unwrap();
        assert_eq!(info.exchanges, 1);
        assert!(!info.busy);
    }

    #[tokio::test]
    async fn test_history_is_served_during_a_turn() {
        let state = state_with(
            ScriptedModel::replying(" slow").with_delay(Duration::from_secs(2)),
        );

        let in_flight = {
            let state = state.clone();
            tokio::spawn(async move { send_message(State(state), request("hi")).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let history = tokio::time::timeout(Duration::from_millis(500), get_history(State(state)))
            .await
            .expect("history should not wait for the turn");
        let Json(history) = history.unwrap();
        assert!(history.data.unwrap().is_empty());

        in_flight.abort();
    }
}
