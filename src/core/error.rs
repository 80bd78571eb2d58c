use thiserror::Error;

/// Failures of the generation pipeline that callers are expected to
/// handle differently (credentials vs quota vs connectivity vs parsing).
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no Gemini API key configured (config.yml `gemini.api_key` or GEMINI_API_KEY)")]
    MissingCredential,

    #[error("model response could not be parsed as a story: {reason}")]
    MalformedResponse { reason: String, raw: String },

    #[error("image response contained no inline image payload")]
    NoImageData,

    #[error("API key rejected: {0}")]
    AuthFailure(String),

    #[error("API quota or rate limit exceeded: {0}")]
    QuotaExceeded(String),

    #[error("network failure talking to the generation API: {0}")]
    TransientNetworkFailure(String),

    #[error("generation API error: {0}")]
    Api(String),
}

impl GenerationError {
    /// Best-effort triage of an upstream error message into auth, quota
    /// or network categories. Matching is on known substrings and status
    /// codes embedded in the message, not guaranteed exhaustive.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if lower.contains("quota") || lower.contains("rate limit") || lower.contains("429") {
            GenerationError::QuotaExceeded(message)
        } else if lower.contains("api key")
            || lower.contains("unauthorized")
            || lower.contains("permission")
            || lower.contains("401")
            || lower.contains("403")
        {
            GenerationError::AuthFailure(message)
        } else if lower.contains("network") || lower.contains("timeout") || lower.contains("timed out") {
            GenerationError::TransientNetworkFailure(message)
        } else {
            GenerationError::Api(message)
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            GenerationError::TransientNetworkFailure(err.to_string())
        } else {
            GenerationError::Api(err.to_string())
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_quota() {
        let err = GenerationError::classify("Resource exhausted: quota exceeded for model");
        assert!(matches!(err, GenerationError::QuotaExceeded(_)));

        let err = GenerationError::classify("HTTP 429 Too Many Requests");
        assert!(matches!(err, GenerationError::QuotaExceeded(_)));
    }

    #[test]
    fn test_classify_auth() {
        let err = GenerationError::classify("API key not valid. Please pass a valid API key.");
        assert!(matches!(err, GenerationError::AuthFailure(_)));

        let err = GenerationError::classify("status 403 PERMISSION_DENIED");
        assert!(matches!(err, GenerationError::AuthFailure(_)));
    }

    #[test]
    fn test_classify_network() {
        let err = GenerationError::classify("connection timed out");
        assert!(matches!(err, GenerationError::TransientNetworkFailure(_)));
    }

    #[test]
    fn test_classify_general() {
        let err = GenerationError::classify("internal server error");
        assert!(matches!(err, GenerationError::Api(_)));
    }

    #[test]
    fn test_quota_wins_over_auth() {
        // "quota" is checked first even if the message also mentions the key.
        let err = GenerationError::classify("API key quota exceeded");
        assert!(matches!(err, GenerationError::QuotaExceeded(_)));
    }
}
