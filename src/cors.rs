use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;

/// Pick the `Access-Control-Allow-Origin` value and whether credentials may
/// be allowed alongside it. An absent Origin header is treated as the
/// literal "null" origin that plugin iframes send. A disallowed origin gets
/// the first configured origin echoed back, never its own.
pub fn select_allow_origin(origin: Option<&str>, allowed: &[String]) -> (String, bool) {
    let candidate = origin.unwrap_or("null");

    if allowed.iter().any(|o| o == candidate) {
        return (candidate.to_string(), true);
    }
    if allowed.iter().any(|o| o == "*") {
        return ("*".to_string(), false);
    }
    if let Some(first) = allowed.first() {
        return (first.clone(), first != "*");
    }
    ("*".to_string(), false)
}

fn apply_headers(
    headers: &mut HeaderMap,
    allowed: &[String],
    origin: Option<&str>,
    requested_headers: Option<&str>,
    requested_method: Option<&str>,
) {
    let (allow_origin, allow_credentials) = select_allow_origin(origin, allowed);

    if let Ok(value) = HeaderValue::from_str(&allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));

    let allow_headers = requested_headers.unwrap_or("Content-Type, Authorization");
    if let Ok(value) = HeaderValue::from_str(allow_headers) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
    }

    let allow_methods = requested_method.unwrap_or("GET, POST, OPTIONS");
    if let Ok(value) = HeaderValue::from_str(allow_methods) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }

    if allow_credentials {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }
}

/// Router-wide CORS layer. Preflights short-circuit to 204 before routing,
/// so every path answers OPTIONS; all other responses get the headers
/// appended on the way out.
pub async fn middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let requested_headers = req
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let requested_method = req
        .headers()
        .get(header::ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let allowed = &state.config.cors.allowed_origins;

    if req.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_headers(
            response.headers_mut(),
            allowed,
            origin.as_deref(),
            requested_headers.as_deref(),
            requested_method.as_deref(),
        );
        return response;
    }

    let mut response = next.run(req).await;
    apply_headers(
        response.headers_mut(),
        allowed,
        origin.as_deref(),
        requested_headers.as_deref(),
        requested_method.as_deref(),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        vec![
            "http://localhost:3000".to_string(),
            "https://www.figma.com".to_string(),
            "null".to_string(),
        ]
    }

    #[test]
    fn listed_origin_is_echoed_back() {
        let (origin, credentials) =
            select_allow_origin(Some("https://www.figma.com"), &allowed());
        assert_eq!(origin, "https://www.figma.com");
        assert!(credentials);
    }

    #[test]
    fn unlisted_origin_falls_back_to_first_configured() {
        let (origin, credentials) =
            select_allow_origin(Some("https://evil.example"), &allowed());
        assert_eq!(origin, "http://localhost:3000");
        assert!(credentials);
    }

    #[test]
    fn absent_origin_is_treated_as_null_literal() {
        let (origin, credentials) = select_allow_origin(None, &allowed());
        assert_eq!(origin, "null");
        assert!(credentials);
    }

    #[test]
    fn wildcard_in_list_disables_credentials() {
        let list = vec!["*".to_string()];
        let (origin, credentials) = select_allow_origin(Some("https://anything.example"), &list);
        assert_eq!(origin, "*");
        assert!(!credentials);
    }
}
