//! Send dispatch protocol
//!
//! One `send` call runs a full dispatch: trim the input, append the user's
//! message optimistically, issue exactly one gateway request, classify the
//! outcome into a transcript entry, and settle the in-flight flag. Failures
//! never propagate past this module; every branch becomes visible session
//! state.

use tokio::sync::Mutex;

use crate::conversation::{Message, SessionState};
use crate::gateway::{GatewayError, TutorGateway, TutorReply};

/// Transcript entry when the gateway answered without a reply.
pub const NO_REPLY_FALLBACK: &str = "No response from the tutor.";

/// Surfaced for any failure to complete the exchange.
pub const SEND_FAILED: &str = "Failed to send message.";

/// How one `send` invocation concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The dispatch ran to completion and its terminal message was applied.
    Completed,
    /// The input trimmed to nothing; state untouched, no request issued.
    IgnoredEmpty,
    /// Another dispatch was already in flight; state untouched.
    Busy,
    /// The session was reset while the request was in flight; the outcome
    /// was discarded.
    Superseded,
}

pub struct Dispatcher<G> {
    gateway: G,
}

impl<G: TutorGateway> Dispatcher<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    /// Run one dispatch against `state`.
    ///
    /// The lock is released across the gateway round-trip, so the session
    /// stays readable and resettable while the request runs. At most one
    /// dispatch is accepted at a time; `pending` is the cooperative gate.
    pub async fn send(&self, state: &Mutex<SessionState>, raw_text: &str) -> SendOutcome {
        let text = raw_text.trim();
        if text.is_empty() {
            return SendOutcome::IgnoredEmpty;
        }

        let generation = {
            let mut state = state.lock().await;
            if state.is_pending() {
                tracing::warn!("Dropping send while another dispatch is in flight");
                return SendOutcome::Busy;
            }
            // Optimistic append: the user's own message is visible before
            // any network activity.
            state.append(Message::user(text));
            state.set_pending(true);
            state.generation()
        };

        tracing::debug!(generation, "Dispatching message to tutor gateway");
        let outcome = self.gateway.ask(text).await;

        let mut state = state.lock().await;
        if state.generation() != generation {
            tracing::debug!(generation, "Discarding outcome for a reset session");
            state.set_pending(false);
            return SendOutcome::Superseded;
        }

        match outcome {
            Ok(TutorReply::Answer(reply)) => {
                state.append(Message::bot(reply));
            }
            Ok(TutorReply::Empty) => {
                state.append(Message::bot(NO_REPLY_FALLBACK));
            }
            Err(GatewayError::Rejected(detail)) => {
                state.set_error(Some(detail.clone()));
                state.append(Message::bot(format!("Error: {}", detail)));
            }
            Err(GatewayError::Unreachable(detail)) => {
                tracing::error!("Tutor gateway unreachable: {}", detail);
                state.set_error(Some(SEND_FAILED.to_string()));
                state.append(Message::bot(SEND_FAILED));
            }
        }

        state.set_pending(false);
        SendOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::conversation::Sender;

    /// Returns a scripted outcome and counts how often it was asked.
    struct ScriptedGateway {
        outcome: StdMutex<Option<Result<TutorReply, GatewayError>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedGateway {
        fn new(outcome: Result<TutorReply, GatewayError>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let gateway = Self {
                outcome: StdMutex::new(Some(outcome)),
                calls: Arc::clone(&calls),
            };
            (gateway, calls)
        }
    }

    #[async_trait]
    impl TutorGateway for ScriptedGateway {
        async fn ask(&self, _message: &str) -> Result<TutorReply, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
                .lock()
                .unwrap()
                .take()
                .expect("gateway asked more than once")
        }
    }

    /// Records what the session looked like at the moment of the call.
    struct ObservingGateway {
        state: Arc<Mutex<SessionState>>,
        seen: Arc<StdMutex<Option<Observation>>>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Observation {
        message: String,
        transcript_len: usize,
        last_text: String,
        pending: bool,
    }

    #[async_trait]
    impl TutorGateway for ObservingGateway {
        async fn ask(&self, message: &str) -> Result<TutorReply, GatewayError> {
            let state = self.state.lock().await;
            *self.seen.lock().unwrap() = Some(Observation {
                message: message.to_string(),
                transcript_len: state.transcript().len(),
                last_text: state.transcript().last().map(|m| m.text.clone()).unwrap_or_default(),
                pending: state.is_pending(),
            });
            Ok(TutorReply::Answer("ok".to_string()))
        }
    }

    /// Simulates the user clearing the chat while the request is in flight.
    struct ResettingGateway {
        state: Arc<Mutex<SessionState>>,
    }

    #[async_trait]
    impl TutorGateway for ResettingGateway {
        async fn ask(&self, _message: &str) -> Result<TutorReply, GatewayError> {
            self.state.lock().await.reset();
            Ok(TutorReply::Answer("stale".to_string()))
        }
    }

    #[tokio::test]
    async fn test_whitespace_input_is_ignored() {
        let (gateway, calls) = ScriptedGateway::new(Ok(TutorReply::Answer("x".to_string())));
        let dispatcher = Dispatcher::new(gateway);
        let state = Mutex::new(SessionState::new());

        let outcome = dispatcher.send(&state, "   \t  ").await;

        assert_eq!(outcome, SendOutcome::IgnoredEmpty);
        let state = state.lock().await;
        assert!(state.transcript().is_empty());
        assert!(!state.is_pending());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_user_message_visible_before_request() {
        let state = Arc::new(Mutex::new(SessionState::new()));
        let seen = Arc::new(StdMutex::new(None));
        let dispatcher = Dispatcher::new(ObservingGateway {
            state: Arc::clone(&state),
            seen: Arc::clone(&seen),
        });

        let outcome = dispatcher.send(&state, "  salut  ").await;

        assert_eq!(outcome, SendOutcome::Completed);
        let observed = seen.lock().unwrap().clone().expect("gateway never asked");
        assert_eq!(
            observed,
            Observation {
                message: "salut".to_string(),
                transcript_len: 1,
                last_text: "salut".to_string(),
                pending: true,
            }
        );

        let state = state.lock().await;
        assert_eq!(state.transcript()[0].sender, Sender::User);
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn test_reply_appended_verbatim() {
        let (gateway, _) = ScriptedGateway::new(Ok(TutorReply::Answer("Bonjour".to_string())));
        let dispatcher = Dispatcher::new(gateway);
        let state = Mutex::new(SessionState::new());
        state.lock().await.set_error(Some("old error".to_string()));

        let outcome = dispatcher.send(&state, "hello").await;

        assert_eq!(outcome, SendOutcome::Completed);
        let state = state.lock().await;
        assert_eq!(state.transcript().len(), 2);
        assert_eq!(state.transcript()[1].sender, Sender::Bot);
        assert_eq!(state.transcript()[1].text, "Bonjour");
        // A prior error stands until explicitly dismissed.
        assert_eq!(state.last_error(), Some("old error"));
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback_without_touching_error() {
        let (gateway, _) = ScriptedGateway::new(Ok(TutorReply::Empty));
        let dispatcher = Dispatcher::new(gateway);
        let state = Mutex::new(SessionState::new());
        state.lock().await.set_error(Some("old error".to_string()));

        let outcome = dispatcher.send(&state, "hello").await;

        assert_eq!(outcome, SendOutcome::Completed);
        let state = state.lock().await;
        assert_eq!(state.transcript()[1].text, NO_REPLY_FALLBACK);
        // An empty reply is benign; the standing error is not replaced.
        assert_eq!(state.last_error(), Some("old error"));
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn test_rejection_surfaces_backend_detail() {
        let (gateway, _) =
            ScriptedGateway::new(Err(GatewayError::Rejected("rate limited".to_string())));
        let dispatcher = Dispatcher::new(gateway);
        let state = Mutex::new(SessionState::new());

        let outcome = dispatcher.send(&state, "hello").await;

        assert_eq!(outcome, SendOutcome::Completed);
        let state = state.lock().await;
        assert_eq!(state.last_error(), Some("rate limited"));
        assert_eq!(state.transcript()[1].text, "Error: rate limited");
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn test_transport_failure_stays_generic() {
        let (gateway, _) =
            ScriptedGateway::new(Err(GatewayError::Unreachable("connection refused".to_string())));
        let dispatcher = Dispatcher::new(gateway);
        let state = Mutex::new(SessionState::new());

        let outcome = dispatcher.send(&state, "hello").await;

        assert_eq!(outcome, SendOutcome::Completed);
        let state = state.lock().await;
        assert_eq!(state.last_error(), Some(SEND_FAILED));
        assert_eq!(state.transcript()[1].text, SEND_FAILED);
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn test_send_while_pending_is_noop() {
        let (gateway, calls) = ScriptedGateway::new(Ok(TutorReply::Empty));
        let dispatcher = Dispatcher::new(gateway);
        let state = Mutex::new(SessionState::new());
        state.lock().await.set_pending(true);

        let outcome = dispatcher.send(&state, "hello").await;

        assert_eq!(outcome, SendOutcome::Busy);
        let state = state.lock().await;
        assert!(state.transcript().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reset_mid_flight_discards_outcome() {
        let state = Arc::new(Mutex::new(SessionState::new()));
        let dispatcher = Dispatcher::new(ResettingGateway {
            state: Arc::clone(&state),
        });

        let outcome = dispatcher.send(&state, "hello").await;

        assert_eq!(outcome, SendOutcome::Superseded);
        let state = state.lock().await;
        assert!(state.transcript().is_empty());
        assert!(state.last_error().is_none());
        assert!(!state.is_pending());
    }
}
