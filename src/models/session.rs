use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;

/// OAuth provider profile. Only Google is supported; the tag keeps stored
/// sessions self-describing if that ever changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
}

/// One in-flight authorization attempt, keyed in the store by its session id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// Anti-forgery value compared against the callback's composite state.
    pub state: String,
    /// PKCE secret. Only its SHA-256 challenge ever reaches the
    /// authorization endpoint.
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
    /// Opaque caller-supplied hint, echoed back in the result.
    pub redirect_to: Option<String>,
    pub provider: Provider,
}

impl AuthSession {
    pub fn new(state: String, code_verifier: String, redirect_to: Option<String>) -> Self {
        Self {
            state,
            code_verifier,
            created_at: Utc::now(),
            redirect_to,
            provider: Provider::Google,
        }
    }
}

/// Terminal outcome of an authorization attempt. The token response stays a
/// raw JSON value; this system never parses or mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthResult {
    pub tokens: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/// The `sessionId:state` value round-tripped through the provider's `state`
/// parameter. Neither component may be empty or contain the delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeState {
    pub session_id: String,
    pub state: String,
}

const DELIMITER: char = ':';

impl CompositeState {
    pub fn new(session_id: String, state: String) -> Result<Self, ServerError> {
        if session_id.is_empty() || state.is_empty() {
            return Err(ServerError::Internal(
                "Empty composite state component".to_string(),
            ));
        }
        if session_id.contains(DELIMITER) || state.contains(DELIMITER) {
            return Err(ServerError::Internal(
                "Composite state component contains delimiter".to_string(),
            ));
        }
        Ok(Self { session_id, state })
    }

    pub fn encode(&self) -> String {
        format!("{}{}{}", self.session_id, DELIMITER, self.state)
    }

    /// Split on the first delimiter. Both parts must be non-empty.
    pub fn parse(raw: &str) -> Result<Self, ServerError> {
        let (session_id, state) = raw
            .split_once(DELIMITER)
            .ok_or_else(|| ServerError::BadRequest("Malformed state parameter".to_string()))?;
        if session_id.is_empty() || state.is_empty() {
            return Err(ServerError::BadRequest(
                "Malformed state parameter".to_string(),
            ));
        }
        Ok(Self {
            session_id: session_id.to_string(),
            state: state.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_state_round_trips() {
        let composite =
            CompositeState::new("abc123".to_string(), "def456".to_string()).unwrap();
        let parsed = CompositeState::parse(&composite.encode()).unwrap();
        assert_eq!(parsed, composite);
    }

    #[test]
    fn composite_state_rejects_delimiter_in_components() {
        assert!(CompositeState::new("ab:c".to_string(), "def".to_string()).is_err());
        assert!(CompositeState::new("abc".to_string(), "d:ef".to_string()).is_err());
    }

    #[test]
    fn composite_state_rejects_empty_components() {
        assert!(CompositeState::new(String::new(), "def".to_string()).is_err());
        assert!(CompositeState::parse("abc:").is_err());
        assert!(CompositeState::parse(":def").is_err());
        assert!(CompositeState::parse("nodelimiter").is_err());
    }

    #[test]
    fn parse_splits_on_first_delimiter_only() {
        // A state value containing a colon would be a bug at encode time, but
        // parsing must still bind the session id to the first segment.
        let parsed = CompositeState::parse("session:sta:te").unwrap();
        assert_eq!(parsed.session_id, "session");
        assert_eq!(parsed.state, "sta:te");
    }
}
