use thiserror::Error;

/// Why a single fetch (or a whole fallback chain) did not produce an asset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("{uri}: unexpected HTTP status {status}")]
    Status { uri: String, status: u16 },

    #[error("{uri}: network error: {message}")]
    Network { uri: String, message: String },

    #[error("{uri}: no response after {after_ms} ms")]
    Timeout { uri: String, after_ms: u64 },

    #[error("{uri}: could not decode payload: {message}")]
    Decode { uri: String, message: String },

    #[error("{uri}: request rejected by the fetch queue")]
    Rejected { uri: String },

    #[error("all remote sources failed ({})", attempted.join(", "))]
    Exhausted { attempted: Vec<String> },
}

impl FetchError {
    /// The URI the failure is about, if it concerns a single source.
    pub fn uri(&self) -> Option<&str> {
        match self {
            FetchError::Status { uri, .. }
            | FetchError::Network { uri, .. }
            | FetchError::Timeout { uri, .. }
            | FetchError::Decode { uri, .. }
            | FetchError::Rejected { uri } => Some(uri),
            FetchError::Exhausted { .. } => None,
        }
    }

    pub fn network(uri: impl Into<String>, message: impl ToString) -> Self {
        FetchError::Network {
            uri: uri.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(uri: impl Into<String>, message: impl ToString) -> Self {
        FetchError::Decode {
            uri: uri.into(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FetchError;

    #[test]
    fn exhausted_lists_every_attempt() {
        let err = FetchError::Exhausted {
            attempted: vec!["https://a/x.png".into(), "https://b/x.png".into()],
        };
        assert_eq!(
            err.to_string(),
            "all remote sources failed (https://a/x.png, https://b/x.png)"
        );
        assert_eq!(err.uri(), None);
    }

    #[test]
    fn status_names_the_uri() {
        let err = FetchError::Status {
            uri: "https://a/model.glb".into(),
            status: 404,
        };
        assert_eq!(err.uri(), Some("https://a/model.glb"));
        assert!(err.to_string().contains("404"));
    }
}
