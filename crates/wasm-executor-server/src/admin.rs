//! Admin token checks for privileged endpoints.
//!
//! Loading a module is the only privileged operation. Callers must send the
//! configured admin token in the `X-Admin-Token` header; callers without a
//! valid token get no load permission at all, so the load fails with
//! `403 Forbidden`. Without a configured token, HTTP loads are disabled and
//! only modules preloaded from the configuration are registered.

use axum::http::HeaderMap;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use wasm_executor_host::Permissions;

use crate::state::AppState;

/// Header carrying the admin token.
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Verify the admin token from request headers.
///
/// The comparison runs in constant time with respect to the token contents.
pub fn verify_token(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|token| bool::from(token.as_bytes().ct_eq(expected.as_bytes())))
}

/// Permissions of the caller that sent `headers`.
pub fn caller_permissions(state: &AppState, headers: &HeaderMap) -> Permissions {
    match state.admin_token() {
        None => {
            debug!("No admin token configured, module loading is disabled");
            Permissions::none()
        }
        Some(expected) if verify_token(headers, expected) => state.load_permissions(),
        Some(_) => {
            warn!("Missing or invalid admin token");
            Permissions::none()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_executor_host::HostApi;
    use wasm_executor_common::{LoaderConfig, RuntimeConfig};

    fn state(token: Option<&str>) -> AppState {
        let api =
            HostApi::from_config(&RuntimeConfig::default(), &LoaderConfig::default()).unwrap();
        AppState::from_api(api, token.map(str::to_string), Vec::new())
    }

    #[test]
    fn test_verify_token_valid() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_TOKEN_HEADER, "secret".parse().unwrap());

        assert!(verify_token(&headers, "secret"));
    }

    #[test]
    fn test_verify_token_invalid() {
        let mut headers = HeaderMap::new();
        headers.insert(ADMIN_TOKEN_HEADER, "wrong".parse().unwrap());

        assert!(!verify_token(&headers, "secret"));
        assert!(!verify_token(&headers, "wron"));
    }

    #[test]
    fn test_verify_token_missing() {
        assert!(!verify_token(&HeaderMap::new(), "secret"));
    }

    #[test]
    fn test_caller_permissions() {
        let mut good = HeaderMap::new();
        good.insert(ADMIN_TOKEN_HEADER, "secret".parse().unwrap());

        let protected = state(Some("secret"));
        assert!(caller_permissions(&protected, &good).load_enabled);
        assert!(!caller_permissions(&protected, &HeaderMap::new()).load_enabled);

        let open = state(None);
        assert!(!caller_permissions(&open, &HeaderMap::new()).load_enabled);
        assert!(!caller_permissions(&open, &good).load_enabled);
    }
}
