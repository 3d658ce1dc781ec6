//! Error type shared by every stage of the engine.

/// Errors reported by detection, parameter validation and node-state operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectError {
    /// Input image is missing, has a zero dimension, or could not be decoded.
    InvalidImage {
        /// Human-readable cause.
        reason: String,
    },
    /// Detection parameters or tuning config violate their invariants.
    InvalidParameters {
        /// Human-readable cause.
        reason: String,
    },
    /// `toggle` referenced an id absent from the current node set.
    NotFound {
        /// Requested node id.
        id: u32,
    },
    /// Node state was read before any detection run was committed.
    EmptyState,
}

impl DetectError {
    pub(crate) fn invalid_image(reason: impl Into<String>) -> Self {
        Self::InvalidImage {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameters(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for DetectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidImage { reason } => write!(f, "invalid image: {}", reason),
            Self::InvalidParameters { reason } => {
                write!(f, "invalid detection parameters: {}", reason)
            }
            Self::NotFound { id } => write!(f, "node {} not found", id),
            Self::EmptyState => write!(f, "no detection run has been committed yet"),
        }
    }
}

impl std::error::Error for DetectError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_offending_id() {
        let err = DetectError::NotFound { id: 7 };
        assert_eq!(err.to_string(), "node 7 not found");
    }

    #[test]
    fn display_carries_reason() {
        let err = DetectError::invalid_parameters("min_radius 10 >= max_radius 5");
        assert!(err.to_string().contains("min_radius 10 >= max_radius 5"));
    }
}
