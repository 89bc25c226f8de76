use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::GoogleConfiguration;
use crate::error::ServerError;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";
const METADATA_FIELDS: &str =
    "id,name,mimeType,size,createdTime,modifiedTime,webViewLink,webContentLink,thumbnailLink,parents";

/// File metadata as returned by the Drive v3 `files.get` endpoint. Sizes
/// arrive as decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFileInfo {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub size: Option<String>,
    pub created_time: String,
    pub modified_time: String,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub thumbnail_link: Option<String>,
    #[serde(default)]
    pub parents: Option<Vec<String>>,
}

impl DriveFileInfo {
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

struct ServiceAccount {
    email: String,
    key: EncodingKey,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Narrow Drive collaborator: metadata lookup and content streaming, nothing
/// else. Authenticates with a service-account JWT-bearer assertion and caches
/// the resulting access token until shortly before expiry.
pub struct DriveClient {
    http: reqwest::Client,
    account: Option<ServiceAccount>,
    token_url: String,
    base_url: String,
    token_cache: RwLock<Option<CachedToken>>,
}

impl DriveClient {
    pub fn new(config: &GoogleConfiguration) -> Self {
        let account = match (
            &config.service_account_email,
            &config.service_account_private_key,
        ) {
            (Some(email), Some(raw_key)) => {
                // Keys handed over via env vars carry escaped newlines.
                let pem = raw_key.replace("\\n", "\n");
                match EncodingKey::from_rsa_pem(pem.as_bytes()) {
                    Ok(key) => Some(ServiceAccount {
                        email: email.clone(),
                        key,
                    }),
                    Err(e) => {
                        tracing::warn!("Invalid service account private key: {}", e);
                        None
                    }
                }
            }
            _ => {
                tracing::warn!("Google Drive service account credentials not configured");
                None
            }
        };

        Self {
            http: reqwest::Client::new(),
            account,
            token_url: config.token_url.clone(),
            base_url: config.drive_base_url.clone(),
            token_cache: RwLock::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account.is_some()
    }

    /// Google Drive file ids are 28-33 characters from [A-Za-z0-9_-].
    /// Anything else is rejected before any upstream call.
    pub fn validate_file_id(file_id: &str) -> bool {
        (28..=33).contains(&file_id.len())
            && file_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    }

    async fn access_token(&self) -> Result<String, ServerError> {
        let account = self
            .account
            .as_ref()
            .ok_or_else(|| ServerError::NotConfigured("Google Drive service not configured".to_string()))?;

        {
            let cache = self.token_cache.read().await;
            if let Some(token) = cache.as_ref() {
                // Refresh one minute early so in-flight requests never carry
                // a token that expires mid-stream.
                if token.expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &account.email,
            scope: DRIVE_SCOPE,
            aud: &self.token_url,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(3600)).timestamp(),
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &account.key)
            .map_err(|e| ServerError::Internal(format!("Failed to sign assertion: {}", e)))?;

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServerError::UpstreamFailed(format!(
                "Service account token request failed: {}",
                body
            )));
        }

        let token: TokenEndpointResponse = response.json().await?;
        let expires_at = now + Duration::seconds(token.expires_in);
        let access_token = token.access_token.clone();
        *self.token_cache.write().await = Some(CachedToken {
            access_token: token.access_token,
            expires_at,
        });
        Ok(access_token)
    }

    /// Fetch file metadata.
    pub async fn get_file_info(&self, file_id: &str) -> Result<DriveFileInfo, ServerError> {
        let token = self.access_token().await?;
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("fields", METADATA_FIELDS), ("supportsAllDrives", "true")])
            .send()
            .await?;

        match response.status().as_u16() {
            404 => Err(ServerError::NotFound("File not found".to_string())),
            403 => Err(ServerError::AccessDenied(
                "Access denied. Check file permissions and service account access.".to_string(),
            )),
            status if !(200..300).contains(&status) => {
                let body = response.text().await.unwrap_or_default();
                Err(ServerError::UpstreamFailed(format!(
                    "Drive metadata request failed ({}): {}",
                    status, body
                )))
            }
            _ => response.json().await.map_err(ServerError::from),
        }
    }

    /// Open a streaming download of the file content (`alt=media`). The
    /// caller owns size enforcement on the returned response body.
    pub async fn download(&self, file_id: &str) -> Result<reqwest::Response, ServerError> {
        let token = self.access_token().await?;
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("alt", "media"), ("supportsAllDrives", "true")])
            .send()
            .await?;

        match response.status().as_u16() {
            404 => Err(ServerError::NotFound("File not found".to_string())),
            403 => Err(ServerError::AccessDenied(
                "Access denied. Check file permissions and service account access.".to_string(),
            )),
            status if !(200..300).contains(&status) => {
                let body = response.text().await.unwrap_or_default();
                Err(ServerError::UpstreamFailed(format!(
                    "Drive download request failed ({}): {}",
                    status, body
                )))
            }
            _ => Ok(response),
        }
    }
}

/// Response content type for a Drive MIME type: known types pass through,
/// everything else is served as a generic binary attachment.
pub fn content_type_for(mime_type: &str) -> &str {
    match mime_type {
        "application/pdf"
        | "image/jpeg"
        | "image/png"
        | "image/gif"
        | "image/webp"
        | "text/plain"
        | "text/csv"
        | "application/json"
        | "application/zip"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        | "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        | "application/vnd.ms-powerpoint" => mime_type,
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_id_validator_enforces_length_bounds() {
        assert!(DriveClient::validate_file_id(&"a".repeat(28)));
        assert!(DriveClient::validate_file_id(&"a".repeat(33)));
        assert!(!DriveClient::validate_file_id(&"a".repeat(27)));
        assert!(!DriveClient::validate_file_id(&"a".repeat(34)));
        assert!(!DriveClient::validate_file_id(""));
    }

    #[test]
    fn file_id_validator_enforces_charset() {
        assert!(DriveClient::validate_file_id(
            "1A2b3C4d5E6f7G8h9I0j_k-L1M2n3O4p"
        ));
        assert!(!DriveClient::validate_file_id(
            "1A2b3C4d5E6f7G8h9I0j.k-L1M2n3O4p"
        ));
        assert!(!DriveClient::validate_file_id(
            "1A2b3C4d5E6f7G8h9I0j/k-L1M2n3O4p"
        ));
        assert!(!DriveClient::validate_file_id(
            "../../../../../../etc/passwd-aaaa"
        ));
    }

    #[test]
    fn unknown_mime_types_fall_back_to_octet_stream() {
        assert_eq!(content_type_for("application/pdf"), "application/pdf");
        assert_eq!(content_type_for("image/png"), "image/png");
        assert_eq!(
            content_type_for("application/x-malicious"),
            "application/octet-stream"
        );
        assert_eq!(content_type_for(""), "application/octet-stream");
    }

    #[test]
    fn size_bytes_parses_drive_string_sizes() {
        let file = DriveFileInfo {
            id: "x".repeat(28),
            name: "f".to_string(),
            mime_type: "text/plain".to_string(),
            size: Some("12345".to_string()),
            created_time: String::new(),
            modified_time: String::new(),
            web_view_link: None,
            thumbnail_link: None,
            parents: None,
        };
        assert_eq!(file.size_bytes(), Some(12345));
    }

    #[test]
    fn unconfigured_client_reports_itself() {
        let client = DriveClient::new(&GoogleConfiguration::default());
        assert!(!client.is_configured());
    }
}
