use thiserror::Error;

/// VK error code for an invalid, expired or revoked access token.
pub const E_AUTH_FAILED: i64 = 5;
/// "Too many requests per second".
pub const E_TOO_MANY_REQUESTS: i64 = 6;
/// "Internal server error".
pub const E_INTERNAL: i64 = 10;

#[derive(Debug, Error)]
pub enum VkError {
    #[error("VK API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Access token expired or revoked")]
    TokenExpired,

    #[error("HTTP error {status} calling {method}")]
    HttpStatus { status: u16, method: String },

    #[error("Malformed response from {method}: {source}")]
    Decode {
        method: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl VkError {
    /// Map an `{"error": {...}}` envelope onto a typed error.
    pub fn from_api(code: i64, message: String) -> Self {
        if code == E_AUTH_FAILED {
            VkError::TokenExpired
        } else {
            VkError::Api { code, message }
        }
    }

    /// Whether the request may succeed if sent again after a pause.
    pub fn is_retryable(&self) -> bool {
        match self {
            VkError::Api { code, .. } => matches!(*code, E_TOO_MANY_REQUESTS | E_INTERNAL),
            VkError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            VkError::Http(e) => e.is_connect() || e.is_timeout(),
            VkError::TokenExpired | VkError::Decode { .. } => false,
        }
    }

    /// Whether VK turned the request away for rate reasons before acting
    /// on it. Safe to resend even for calls that are not idempotent.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            VkError::Api { code, .. } => *code == E_TOO_MANY_REQUESTS,
            VkError::HttpStatus { status, .. } => *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_code_maps_to_token_expired() {
        let e = VkError::from_api(5, "User authorization failed".into());
        assert!(matches!(e, VkError::TokenExpired));
        assert!(!e.is_retryable());
    }

    #[test]
    fn test_rate_limit_code_retryable() {
        assert!(VkError::from_api(6, "Too many requests per second".into()).is_retryable());
        assert!(VkError::from_api(10, "Internal server error".into()).is_retryable());
    }

    #[test]
    fn test_other_api_codes_not_retryable() {
        let e = VkError::from_api(15, "Access denied".into());
        assert!(!e.is_retryable());
        assert_eq!(e.to_string(), "VK API error 15: Access denied");
    }

    #[test]
    fn test_http_status_classification() {
        let status = |s| VkError::HttpStatus {
            status: s,
            method: "audio.get".into(),
        };
        assert!(status(429).is_retryable());
        assert!(status(502).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(403).is_retryable());
    }

    #[test]
    fn test_only_rate_limits_are_safe_to_resend() {
        let status = |s| VkError::HttpStatus {
            status: s,
            method: "audio.addAlbum".into(),
        };
        assert!(status(429).is_rate_limited());
        assert!(!status(502).is_rate_limited());
        assert!(VkError::from_api(6, "Too many requests per second".into()).is_rate_limited());
        assert!(!VkError::from_api(10, "Internal server error".into()).is_rate_limited());
    }

    #[test]
    fn test_decode_error_not_retryable() {
        let source = serde_json::from_str::<u64>("nope").unwrap_err();
        let e = VkError::Decode {
            method: "audio.getCount".into(),
            source,
        };
        assert!(!e.is_retryable());
    }
}
