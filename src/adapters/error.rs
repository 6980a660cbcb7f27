use thiserror::Error;

/// Errors raised at the adapter boundary.
///
/// `Auth` is terminal for its domain; `Timeout` is surfaced separately so a
/// caller can retry only the timed-out domain. `NotFound` and
/// `MalformedPayload` are absorbed as diagnostics wherever aggregation is
/// naturally partial (cards, pipelines, commits).
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("authorization failed: {0}")]
    Auth(String),
    #[error("operation '{operation}' timed out after {duration_ms}ms")]
    Timeout { operation: String, duration_ms: u64 },
    #[error("network error: {0}")]
    Network(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("file system error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AdapterError {
    /// Terminal errors fail the whole domain; the rest degrade it.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AdapterError::Auth(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AdapterError::Timeout { .. })
    }

    /// Per-entity errors are absorbed into diagnostics instead of failing
    /// the sub-fetch that produced them.
    pub fn is_per_entity(&self) -> bool {
        matches!(
            self,
            AdapterError::NotFound(_) | AdapterError::MalformedPayload(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_is_terminal() {
        assert!(AdapterError::Auth("bad token".into()).is_terminal());
        assert!(!AdapterError::Network("reset".into()).is_terminal());
    }

    #[test]
    fn not_found_is_per_entity() {
        assert!(AdapterError::NotFound("commit abc".into()).is_per_entity());
        assert!(!AdapterError::Auth("bad token".into()).is_per_entity());
    }

    #[test]
    fn timeout_is_distinguished() {
        let err = AdapterError::Timeout {
            operation: "fetch_builds".into(),
            duration_ms: 5000,
        };
        assert!(err.is_timeout());
        assert!(!err.is_terminal());
    }
}
