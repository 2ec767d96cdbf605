//! Crate-wide error taxonomy.
//!
//! Each subsystem owns a `thiserror`-derived error type for its own
//! Result<T, E> boundary. [`ErrorKind`] is the flattened, machine-readable
//! shape that ends up in `OrchestrationResult.errors[]` (spec.md §3, §7) —
//! it carries no payload that could leak a secret or a raw prompt.

use serde::{Deserialize, Serialize};

/// Flattened error taxonomy surfaced on [`crate::domain::OrchestrationResult`].
///
/// Variant names mirror spec.md §7 verbatim so the machine-readable field
/// matches the specification's vocabulary exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Required provider unreachable; secret not configured.
    ConfigMissingSecret { provider: String },
    /// Gateway: provider rate limit hit, retry advised.
    RateLimit { provider: String },
    /// Gateway: transient failure, retry advised.
    Transient { provider: String, detail: String },
    /// Gateway: circuit open for this provider.
    ProviderDown { provider: String },
    /// Gateway: request exceeded its deadline.
    Timeout { provider: String },
    /// Gateway: malformed or invalid request, do not retry.
    InvalidRequest { detail: String },
    /// Tool Broker: input could not be parsed by the tool.
    ToolMalformedInput { tool: String, detail: String },
    /// Tool Broker: sandbox execution itself failed (not a test failure).
    ToolSandboxFailure { detail: String },
    /// Tool Broker: a tool result was rejected by the calling handler.
    ToolResultRejected { tool: String, detail: String },
    /// Router: no model satisfying the request's capability/tier exists.
    CapabilityUnavailable { category: String },
    /// Refiner: had to synthesise an answer to satisfy the output contract.
    FormatFallback { detail: String },
    /// Orchestrator: deadline expired before all parallel calls returned.
    PartialTimeout,
    /// Classifier: no category rule matched; routed to `general`.
    CategoryUnknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigMissingSecret { provider } => {
                write!(f, "provider '{provider}' has no configured secret")
            }
            Self::RateLimit { provider } => write!(f, "rate limited by provider '{provider}'"),
            Self::Transient { provider, detail } => {
                write!(f, "transient failure from '{provider}': {detail}")
            }
            Self::ProviderDown { provider } => write!(f, "circuit open for provider '{provider}'"),
            Self::Timeout { provider } => write!(f, "timed out waiting on provider '{provider}'"),
            Self::InvalidRequest { detail } => write!(f, "invalid request: {detail}"),
            Self::ToolMalformedInput { tool, detail } => {
                write!(f, "malformed input for tool '{tool}': {detail}")
            }
            Self::ToolSandboxFailure { detail } => write!(f, "sandbox failure: {detail}"),
            Self::ToolResultRejected { tool, detail } => {
                write!(f, "tool '{tool}' result rejected: {detail}")
            }
            Self::CapabilityUnavailable { category } => {
                write!(f, "no routable model for category '{category}'")
            }
            Self::FormatFallback { detail } => write!(f, "format fallback applied: {detail}"),
            Self::PartialTimeout => write!(f, "deadline expired before all calls returned"),
            Self::CategoryUnknown => write!(f, "classifier could not assign a category"),
        }
    }
}

/// Provider Gateway error, used as the `Result` boundary for `gateway::call`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("rate limited by provider '{provider}'")]
    RateLimit { provider: String },
    #[error("transient failure from '{provider}': {detail}")]
    Transient { provider: String, detail: String },
    #[error("circuit open for provider '{provider}'")]
    ProviderDown { provider: String },
    #[error("timed out waiting on provider '{provider}'")]
    Timeout { provider: String },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no secret configured for provider '{provider}'")]
    MissingSecret { provider: String },
}

impl GatewayError {
    pub fn provider(&self) -> &str {
        match self {
            Self::RateLimit { provider }
            | Self::Transient { provider, .. }
            | Self::ProviderDown { provider }
            | Self::Timeout { provider }
            | Self::MissingSecret { provider } => provider,
            Self::InvalidRequest(_) => "unknown",
        }
    }

    pub fn to_error_kind(&self) -> ErrorKind {
        match self {
            Self::RateLimit { provider } => ErrorKind::RateLimit {
                provider: provider.clone(),
            },
            Self::Transient { provider, detail } => ErrorKind::Transient {
                provider: provider.clone(),
                detail: detail.clone(),
            },
            Self::ProviderDown { provider } => ErrorKind::ProviderDown {
                provider: provider.clone(),
            },
            Self::Timeout { provider } => ErrorKind::Timeout {
                provider: provider.clone(),
            },
            Self::InvalidRequest(detail) => ErrorKind::InvalidRequest {
                detail: detail.clone(),
            },
            Self::MissingSecret { provider } => ErrorKind::ConfigMissingSecret {
                provider: provider.clone(),
            },
        }
    }

    /// Whether the gateway may retry this error on the same or a different model.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit { .. } | Self::Transient { .. })
    }
}

/// Tool Broker error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("malformed input for tool '{tool}': {detail}")]
    MalformedInput { tool: String, detail: String },
    #[error("sandbox failure: {0}")]
    SandboxFailure(String),
    #[error("result rejected for tool '{tool}': {detail}")]
    ResultRejected { tool: String, detail: String },
}

impl ToolError {
    pub fn to_error_kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput { tool, detail } => ErrorKind::ToolMalformedInput {
                tool: tool.clone(),
                detail: detail.clone(),
            },
            Self::SandboxFailure(detail) => ErrorKind::ToolSandboxFailure {
                detail: detail.clone(),
            },
            Self::ResultRejected { tool, detail } => ErrorKind::ToolResultRejected {
                tool: tool.clone(),
                detail: detail.clone(),
            },
        }
    }
}

/// Classifier error (used only for truly exceptional input, e.g. empty prompt).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("empty prompt")]
    EmptyPrompt,
}

/// Consensus/verification error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConsensusError {
    #[error("no candidates available for consensus")]
    NoCandidates,
    #[error("too few candidates survived dropping: got {got}, need {need}")]
    InsufficientCandidates { got: usize, need: usize },
}

/// Category handler error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("required capability unavailable for category '{category}'")]
    CapabilityUnavailable { category: String },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}

impl HandlerError {
    pub fn to_error_kind(&self) -> ErrorKind {
        match self {
            Self::CapabilityUnavailable { category } => ErrorKind::CapabilityUnavailable {
                category: category.clone(),
            },
            Self::Gateway(e) => e.to_error_kind(),
            Self::Tool(e) => e.to_error_kind(),
            Self::Consensus(_) => ErrorKind::PartialTimeout,
        }
    }
}

/// Benchmark harness error.
#[derive(Debug, thiserror::Error)]
pub enum BenchmarkError {
    #[error("failed to load suite: {0}")]
    SuiteLoad(String),
    #[error("checkpoint store error: {0}")]
    Checkpoint(String),
    #[error("regression gate failed: {0}")]
    Regression(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
