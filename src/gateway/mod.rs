//! Tutor gateway integration

mod http;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpTutorGateway;

/// A completed exchange with the tutor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TutorReply {
    /// The gateway produced a non-empty reply.
    Answer(String),
    /// The gateway answered but carried no usable reply text.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The gateway was reachable but returned a non-success status. Carries
    /// the backend's error description, or a generic fallback when the body
    /// had none.
    #[error("{0}")]
    Rejected(String),

    /// The exchange could not be completed at all: connection, DNS, timeout,
    /// or a malformed response body. Carries the underlying detail for the
    /// log; the user-facing description stays generic.
    #[error("request failed: {0}")]
    Unreachable(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Unreachable(err.to_string())
    }
}

/// The external collaborator that turns one user message into a tutoring
/// reply. The dispatch protocol depends on this seam only, so tests can
/// substitute scripted gateways for the HTTP client.
#[async_trait]
pub trait TutorGateway: Send + Sync {
    async fn ask(&self, message: &str) -> Result<TutorReply, GatewayError>;
}
