/// Crate-wide result alias.
pub type TrellisResult<T> = Result<T, TrellisError>;

/// Error taxonomy for scene construction and frame evaluation.
#[derive(thiserror::Error, Debug)]
pub enum TrellisError {
    /// Malformed graph detected while building or validating a scene.
    #[error("construction error: {0}")]
    Construction(String),

    /// Keyframe or time-range invariant violated.
    #[error("animation error: {0}")]
    Animation(String),

    /// GPU-side failure: allocation, upload, or program compilation.
    #[error("resource error: {0}")]
    Resource(String),

    /// Frame-time failure that is not tied to a GPU resource.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Scene description could not be read or written.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Backend rejected a command.
    #[error("backend error: {0}")]
    Backend(String),

    /// Error raised while processing a specific node.
    #[error("{kind} node {label}: {source}")]
    Node {
        /// Node kind name, e.g. `Render`.
        kind: &'static str,
        /// Node label, or `#index` when the node is unlabelled.
        label: String,
        /// Underlying failure.
        source: Box<TrellisError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Coarse classification of an error, looking through node context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Construction,
    Animation,
    Resource,
    Evaluation,
    Serde,
    Backend,
    Other,
}

impl TrellisError {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Attach node context. Errors that already carry context keep the innermost node.
    pub fn in_node(self, kind: &'static str, label: impl Into<String>) -> Self {
        match self {
            Self::Node { .. } => self,
            other => Self::Node {
                kind,
                label: label.into(),
                source: Box::new(other),
            },
        }
    }

    /// Category of the underlying failure.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Construction(_) => ErrorCategory::Construction,
            Self::Animation(_) => ErrorCategory::Animation,
            Self::Resource(_) => ErrorCategory::Resource,
            Self::Evaluation(_) => ErrorCategory::Evaluation,
            Self::Serde(_) => ErrorCategory::Serde,
            Self::Backend(_) => ErrorCategory::Backend,
            Self::Node { source, .. } => source.category(),
            Self::Other(_) => ErrorCategory::Other,
        }
    }

    /// `(kind, label)` of the node the error was raised in, if known.
    pub fn node(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::Node { kind, label, .. } => Some((*kind, label.as_str())),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TrellisError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
