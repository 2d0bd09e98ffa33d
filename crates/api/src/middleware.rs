use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use taskdesk_auth::TokenValidator;

use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub validator: Arc<TokenValidator>,
}

/// Resolve the bearer token (if any) into a [`PrincipalContext`].
///
/// Never rejects: missing or invalid tokens yield an anonymous context and
/// the per-operation gate decides. Token failure detail stays in the logs.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let context = match extract_bearer(req.headers()) {
        None => PrincipalContext::anonymous(),
        Some(token) => match state.validator.validate(token) {
            Ok(principal) => PrincipalContext::authenticated(principal),
            Err(err) => {
                debug!(reason = ?err, "bearer token rejected");
                PrincipalContext::anonymous()
            }
        },
    };

    req.extensions_mut().insert(context);
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    // The scheme name is case-insensitive.
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("Bearer   padded  ")), Some("padded"));
    }

    #[test]
    fn scheme_matches_in_any_case() {
        assert_eq!(extract_bearer(&headers("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers("BEARER abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers("BeArEr abc")), Some("abc"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_ignored() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwdw==")), None);
        assert_eq!(extract_bearer(&headers("Bearer ")), None);
        assert_eq!(extract_bearer(&headers("Bearerabc")), None);
    }
}
