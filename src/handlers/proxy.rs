use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::Response,
};
use url::Url;

use crate::error::ServerError;
use crate::models::ProxyParams;
use crate::stream::{limit_bytes, MAX_PAYLOAD_BYTES};
use crate::AppState;

/// Parse and normalize the proxy target: plain web schemes only, with known
/// file-hosting share links rewritten into their direct-download form.
fn parse_target(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    if url.host_str() == Some("drive.google.com") {
        if let Some(rewritten) = rewrite_drive_url(&url) {
            return Some(rewritten);
        }
    }
    Some(url)
}

/// `/file/d/<ID>/view` and `/uc?id=<ID>` become
/// `/uc?export=download&id=<ID>`. Unrecognized shapes pass through unchanged.
fn rewrite_drive_url(url: &Url) -> Option<Url> {
    let path = url.path();
    if let Some(rest) = path.strip_prefix("/file/d/") {
        if let Some(id) = rest.strip_suffix("/view") {
            if !id.is_empty() && !id.contains('/') {
                return direct_download_url(id);
            }
        }
    }
    if path == "/uc" {
        if let Some((_, id)) = url.query_pairs().find(|(k, _)| k == "id") {
            if !id.is_empty() {
                return direct_download_url(&id);
            }
        }
    }
    None
}

fn direct_download_url(id: &str) -> Option<Url> {
    Url::parse(&format!(
        "https://drive.google.com/uc?export=download&id={}",
        urlencoding::encode(id)
    ))
    .ok()
}

/// Domain or subdomain match against the allow-list. An empty list allows
/// every host.
fn host_allowed(host: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let host = host.to_ascii_lowercase();
    allowed.iter().any(|domain| {
        let domain = domain.to_ascii_lowercase();
        host == domain || host.ends_with(&format!(".{}", domain))
    })
}

/// Fetch an arbitrary whitelisted resource and relay it under the byte cap.
pub async fn proxy_fetch(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Result<Response, ServerError> {
    let raw = params
        .url
        .ok_or_else(|| ServerError::BadRequest("Missing url".to_string()))?;

    let target = parse_target(&raw)
        .ok_or_else(|| ServerError::BadRequest("Invalid or unsupported url".to_string()))?;

    let host = target
        .host_str()
        .ok_or_else(|| ServerError::BadRequest("Invalid or unsupported url".to_string()))?;
    if !host_allowed(host, &state.config.proxy.allowed_hosts) {
        tracing::warn!(host = %host, "Proxy target host not allowed");
        return Err(ServerError::BadRequest("Host not allowed".to_string()));
    }

    let span = tracing::info_span!("proxy", target = %target);
    let _enter = span.enter();

    // Early size rejection when the server answers HEAD. Plenty reject it;
    // the streaming limiter is the real enforcement.
    if let Ok(head) = state.http.head(target.clone()).send().await {
        let declared = head
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if let Some(len) = declared {
            if len > MAX_PAYLOAD_BYTES {
                tracing::warn!(declared = len, "Rejected oversized proxy target");
                return Err(ServerError::BadRequest("File too large".to_string()));
            }
        }
    }

    let upstream = state
        .http
        .get(target)
        .send()
        .await
        .map_err(|e| ServerError::UpstreamFailed(format!("Upstream request failed: {}", e)))?;

    if !upstream.status().is_success() {
        return Err(ServerError::UpstreamFailed(format!(
            "Upstream not OK: {}",
            upstream.status()
        )));
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let body = Body::from_stream(limit_bytes(upstream.bytes_stream(), MAX_PAYLOAD_BYTES));

    Response::builder()
        .status(200)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(body)
        .map_err(|e| ServerError::Internal(format!("Failed to build response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_web_schemes() {
        assert!(parse_target("ftp://example.com/file").is_none());
        assert!(parse_target("file:///etc/passwd").is_none());
        assert!(parse_target("not a url").is_none());
        assert!(parse_target("https://example.com/file").is_some());
    }

    #[test]
    fn rewrites_drive_view_links() {
        let target = parse_target("https://drive.google.com/file/d/XYZ123/view").unwrap();
        assert_eq!(
            target.as_str(),
            "https://drive.google.com/uc?export=download&id=XYZ123"
        );
    }

    #[test]
    fn rewrites_drive_uc_links() {
        let target = parse_target("https://drive.google.com/uc?id=ABC789").unwrap();
        assert_eq!(
            target.as_str(),
            "https://drive.google.com/uc?export=download&id=ABC789"
        );
    }

    #[test]
    fn leaves_unrecognized_drive_paths_unchanged() {
        let target = parse_target("https://drive.google.com/drive/folders/XYZ").unwrap();
        assert_eq!(target.as_str(), "https://drive.google.com/drive/folders/XYZ");
    }

    #[test]
    fn host_allow_list_matches_domains_and_subdomains() {
        let allowed = vec!["example.com".to_string()];
        assert!(host_allowed("example.com", &allowed));
        assert!(host_allowed("cdn.example.com", &allowed));
        assert!(host_allowed("EXAMPLE.com", &allowed));
        assert!(!host_allowed("evil-example.com", &allowed));
        assert!(!host_allowed("example.com.evil.net", &allowed));
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        assert!(host_allowed("anything.example", &[]));
    }
}
