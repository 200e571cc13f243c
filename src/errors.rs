use thiserror::Error;

/// Errors raised while wiring a pipeline description together.
///
/// These are configuration mistakes, not runtime faults: assembly aborts on
/// the first one and nothing is retried. Failures from the document loader
/// or the downstream synthesis engine propagate unchanged as `anyhow`
/// errors at the call sites.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Required wiring could not be resolved from explicit arguments or
    /// defaults (e.g. a build action with no input artifact in sight).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A source action has neither a connection ARN nor an OAuth token.
    #[error("credential error: {0}")]
    Credential(String),
}

impl AssemblyError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }
}
