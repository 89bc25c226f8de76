use url::Url;

use crate::config::GoogleConfiguration;
use crate::error::ServerError;
use crate::models::CompositeState;
use crate::pkce;

struct Credentials {
    client_id: String,
    client_secret: Option<String>,
    redirect_uri: String,
}

/// Google OAuth relay client. Builds authorization URLs and performs the
/// code-for-token and refresh exchanges. Token responses pass through as raw
/// JSON; this component never interprets them.
pub struct OAuthClient {
    http: reqwest::Client,
    credentials: Option<Credentials>,
    auth_url: String,
    token_url: String,
    scope: String,
}

impl OAuthClient {
    pub fn new(config: &GoogleConfiguration) -> Self {
        let credentials = match (&config.client_id, &config.redirect_uri) {
            (Some(client_id), Some(redirect_uri)) => Some(Credentials {
                client_id: client_id.clone(),
                client_secret: config.client_secret.clone(),
                redirect_uri: redirect_uri.clone(),
            }),
            _ => {
                tracing::warn!("Google OAuth client credentials not configured");
                None
            }
        };

        Self {
            http: reqwest::Client::new(),
            credentials,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            scope: config.scope.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn credentials(&self) -> Result<&Credentials, ServerError> {
        self.credentials
            .as_ref()
            .ok_or_else(|| ServerError::NotConfigured("Server not configured".to_string()))
    }

    /// Build the provider authorization URL. No network call happens here;
    /// the composite state and PKCE challenge are the only session-specific
    /// inputs.
    pub fn build_authorization_url(
        &self,
        state: &CompositeState,
        code_challenge: &str,
    ) -> Result<String, ServerError> {
        let credentials = self.credentials()?;
        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| ServerError::NotConfigured(format!("Invalid auth URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("redirect_uri", &credentials.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scope)
            .append_pair("state", &state.encode())
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", pkce::CHALLENGE_METHOD)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url.to_string())
    }

    /// Exchange an authorization code for tokens, proving possession of the
    /// PKCE secret. Returns the token endpoint's body untouched; non-success
    /// statuses surface the upstream body as the error detail.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<serde_json::Value, ServerError> {
        let credentials = self.credentials()?;
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = &credentials.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServerError::TokenExchange(body));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(ServerError::from)
    }

    /// Forward a refresh-token grant. Same raw-passthrough policy as
    /// `exchange_code`.
    pub async fn refresh(&self, refresh_token: &str) -> Result<serde_json::Value, ServerError> {
        let credentials = self.credentials()?;
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
        ];
        if let Some(secret) = &credentials.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServerError::TokenExchange(body));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(ServerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoogleConfiguration;

    fn configured() -> OAuthClient {
        OAuthClient::new(&GoogleConfiguration {
            client_id: Some("client-123".to_string()),
            client_secret: Some("secret".to_string()),
            redirect_uri: Some("https://gateway.example/oauth/callback".to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn unconfigured_client_reports_itself() {
        let client = OAuthClient::new(&GoogleConfiguration::default());
        assert!(!client.is_configured());

        let state = CompositeState::new("s".to_string(), "t".to_string()).unwrap();
        assert!(client.build_authorization_url(&state, "challenge").is_err());
    }

    #[test]
    fn authorization_url_carries_the_full_parameter_set() {
        let client = configured();
        let state = CompositeState::new("sid".to_string(), "anti".to_string()).unwrap();
        let raw = client.build_authorization_url(&state, "chal").unwrap();

        let url = Url::parse(&raw).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().collect();
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["state"], "sid:anti");
        assert_eq!(params["code_challenge"], "chal");
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert!(params["scope"].contains("drive.readonly"));
    }
}
