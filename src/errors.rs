use crate::utils::IsTransient;

// ============================================================================
// Error Taxonomy
// ============================================================================
//
// Every failure the SDK surfaces to a caller is one of these typed errors.
// Dispatcher-side handler failures are the single exception: they are logged
// locally and reduced to a bare 400 on the wire, since the callback response
// schema has no error-detail field.
//
// ============================================================================

/// Transport-level failure talking to the proxy. Distinct from an
/// application-level rejection, which arrives as a structured status.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http request to proxy failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to decode proxy response: {0}")]
    Decode(#[from] prost::DecodeError),
}

/// Envelope pack/unpack contract violations.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("envelope type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("failed to decode envelope payload: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures materializing a handler's workflow result.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("response type mismatch: action declares {expected}, handler supplied {got}")]
    ResponseTypeMismatch { expected: String, got: String },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

/// Errors building or tearing down a system handle.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    #[error("a live actor system already exists in this process; tear it down first")]
    SystemAlreadyCreated,

    #[error("system is already registered; cannot add actor or action `{0}`")]
    SystemAlreadyRegistered(String),

    #[error("failed to start callback server: {0}")]
    CallbackServer(#[from] std::io::Error),
}

/// The proxy rejected (or never received) a registration.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("proxy rejected registration (status {status}): {message}")]
    Rejected { message: String, status: i32 },
}

impl IsTransient for RegisterError {
    /// Only transport failures are worth retrying; a structured rejection
    /// will not change on a resend.
    fn is_transient(&self) -> bool {
        matches!(self, RegisterError::Transport(_))
    }
}

/// The proxy rejected a named-instance spawn.
#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("proxy rejected spawn (status {status}): {message}")]
    Rejected { message: String, status: i32 },
}

/// Failures invoking an action through the proxy.
#[derive(Debug, thiserror::Error)]
pub enum InvocationError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("proxy rejected invocation (status {status}): {message}")]
    Rejected { message: String, status: i32 },

    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("actor did not return the expected output type: expected {expected}, got {got}")]
    WrongOutput { expected: String, got: String },

    #[error("a response was expected but the invocation returned no payload")]
    MissingResponse,

    #[error("invocation timed out (limit: {limit_ms} ms)")]
    Timeout { limit_ms: u128 },

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}
