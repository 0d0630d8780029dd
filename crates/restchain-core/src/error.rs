//! Error taxonomy for chain construction and execution

/// Error from building or executing an extraction chain.
///
/// `Configuration` is only produced at construction time; everything else can
/// surface while a stream is being consumed.
#[derive(Debug)]
pub enum ExtractError {
    /// Invalid chain construction: forward reference, field collision,
    /// empty seed, malformed template or path expression.
    Configuration(String),
    /// A URL/param placeholder referenced a field the parent record does not
    /// carry a value for. Always fatal.
    Substitution { placeholder: String },
    /// Response body could not be projected (arity mismatch, invalid JSON).
    Projection(String),
    /// HTTP/network failure with optional status code.
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// Execution was cancelled cooperatively.
    Cancelled,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Substitution { placeholder } => {
                write!(f, "no value for placeholder '{{{placeholder}}}'")
            }
            Self::Projection(msg) => write!(f, "projection error: {msg}"),
            Self::Transport {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Transport {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Cancelled => write!(f, "extraction cancelled"),
        }
    }
}

impl std::error::Error for ExtractError {}

impl ExtractError {
    /// Create a transport error from a reqwest error.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Whether the per-chain [`FailurePolicy`] applies to this error.
    ///
    /// Substitution and cancellation are always fatal; configuration errors
    /// never reach execution.
    pub fn is_policy_controlled(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Projection(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// What to do when one parent record's HTTP call or projection fails.
///
/// The default is `Abort`: metadata extraction favors completeness over
/// partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Propagate the error and end the stream.
    #[default]
    Abort,
    /// Log a warning and treat the failure as zero records for that parent.
    SkipAndWarn,
}
