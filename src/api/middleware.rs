//! API Middleware
//!
//! Principal extraction and request logging.
//!
//! Authentication happens at the gateway in front of this service. The
//! gateway forwards the verified identity in `X-Request-User-Id` and
//! `X-Request-User-Role`; when a gateway key hash is configured, every
//! request must also carry the matching `X-API-Key`.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::audit::sha256_hex;
use crate::domain::{OperationContext, Principal, Role};
use crate::error::AppError;

pub const USER_ID_HEADER: &str = "X-Request-User-Id";
pub const USER_ROLE_HEADER: &str = "X-Request-User-Role";
pub const API_KEY_HEADER: &str = "X-API-Key";
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";

/// Gateway trust settings used by [`principal_middleware`]
#[derive(Debug, Clone, Default)]
pub struct AuthSettings {
    /// Lowercase hex SHA-256 of the gateway API key
    pub api_key_sha256: Option<String>,
}

/// Correlation id assigned by [`logging_middleware`]
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

// =========================================================================
// Principal middleware
// =========================================================================

/// Resolve the caller and attach `Principal` plus `OperationContext`.
pub async fn principal_middleware(
    State(settings): State<AuthSettings>,
    headers: HeaderMap,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if let Some(expected) = settings.api_key_sha256.as_deref() {
        verify_api_key(&headers, expected)?;
    }

    let principal = extract_principal(&headers)?;

    let correlation_id = request
        .extensions()
        .get::<CorrelationId>()
        .map(|c| c.0)
        .or_else(|| correlation_id_from(&headers))
        .unwrap_or_else(Uuid::new_v4);

    let context = OperationContext::new(principal).with_correlation_id(correlation_id);

    request.extensions_mut().insert(principal);
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

/// Read the forwarded identity headers
pub fn extract_principal(headers: &HeaderMap) -> Result<Principal, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated(format!("missing {} header", USER_ID_HEADER)))?;
    let user_id = Uuid::parse_str(user_id.trim()).map_err(|_| {
        AppError::Unauthenticated(format!("invalid {} header", USER_ID_HEADER))
    })?;

    let role = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated(format!("missing {} header", USER_ROLE_HEADER)))?;
    let role: Role = role.trim().parse().map_err(|_| {
        AppError::Unauthenticated(format!("invalid {} header", USER_ROLE_HEADER))
    })?;

    Ok(Principal::new(user_id, role))
}

/// Check `X-API-Key` against the configured hash
pub fn verify_api_key(headers: &HeaderMap, expected_sha256: &str) -> Result<(), AppError> {
    let key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthenticated(format!("missing {} header", API_KEY_HEADER)))?;

    if sha256_hex(key) != expected_sha256 {
        tracing::warn!("Rejected request with invalid gateway API key");
        return Err(AppError::Unauthenticated("invalid API key".to_string()));
    }

    Ok(())
}

fn correlation_id_from(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

// =========================================================================
// mask_headers_for_logging
// =========================================================================

/// Headers that should be masked in logs
const SENSITIVE_HEADERS: &[&str] = &["x-api-key", "authorization", "cookie", "set-cookie"];

/// Mask sensitive headers for logging
pub fn mask_headers_for_logging(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let name_lower = name.as_str().to_lowercase();
            let masked_value = if SENSITIVE_HEADERS.contains(&name_lower.as_str()) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[invalid utf8]").to_string()
            };
            (name.to_string(), masked_value)
        })
        .collect()
}

// =========================================================================
// Request Logging Middleware
// =========================================================================

/// Request logging middleware; also assigns the correlation id.
pub async fn logging_middleware(mut request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let headers = mask_headers_for_logging(request.headers());

    let correlation_id = correlation_id_from(request.headers()).unwrap_or_else(Uuid::new_v4);
    request.extensions_mut().insert(CorrelationId(correlation_id));

    let start = std::time::Instant::now();

    tracing::info!(
        method = %method,
        uri = %uri,
        correlation_id = %correlation_id,
        headers = ?headers,
        "Incoming request"
    );

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = %response.status(),
        duration_ms = %start.elapsed().as_millis(),
        correlation_id = %correlation_id,
        "Request completed"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, value.parse().unwrap());
        }
        map
    }

    #[test]
    fn test_mask_headers_for_logging() {
        let map = headers(&[
            ("content-type", "application/json"),
            ("x-api-key", "secret-key-12345"),
            ("x-request-user-role", "admin"),
        ]);

        let masked = mask_headers_for_logging(&map);

        let api_key = masked.iter().find(|(k, _)| k == "x-api-key");
        let content_type = masked.iter().find(|(k, _)| k == "content-type");
        let role = masked.iter().find(|(k, _)| k == "x-request-user-role");

        assert_eq!(api_key.unwrap().1, "[REDACTED]");
        assert_eq!(content_type.unwrap().1, "application/json");
        assert_eq!(role.unwrap().1, "admin");
    }

    #[test]
    fn test_extract_principal() {
        let id = Uuid::new_v4();
        let map = headers(&[
            ("x-request-user-id", &id.to_string()),
            ("x-request-user-role", "admin"),
        ]);

        let principal = extract_principal(&map).unwrap();
        assert_eq!(principal.user_id, id);
        assert!(principal.is_admin());
    }

    #[test]
    fn test_extract_principal_missing_or_invalid() {
        let id = Uuid::new_v4().to_string();

        assert!(matches!(
            extract_principal(&HeaderMap::new()),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            extract_principal(&headers(&[("x-request-user-id", &id)])),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            extract_principal(&headers(&[
                ("x-request-user-id", "not-a-uuid"),
                ("x-request-user-role", "user"),
            ])),
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            extract_principal(&headers(&[
                ("x-request-user-id", &id),
                ("x-request-user-role", "superuser"),
            ])),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_verify_api_key() {
        let expected = sha256_hex("gateway-secret");

        assert!(verify_api_key(&headers(&[("x-api-key", "gateway-secret")]), &expected).is_ok());
        assert!(verify_api_key(&headers(&[("x-api-key", "wrong")]), &expected).is_err());
        assert!(verify_api_key(&HeaderMap::new(), &expected).is_err());
    }
}
