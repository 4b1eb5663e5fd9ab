//! Authentication middleware for Axum
//!
//! Resolves the calling [`Address`] for each request and enforces the
//! per-caller rate limit.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::{ApiKeyValidator, AuthError, CallerContext, API_KEY_PREFIX};
use crate::api::ApiError;
use crate::domain::Address;

/// Header naming the caller when authentication is disabled
pub const CALLER_ADDRESS_HEADER: &str = "x-caller-address";

/// Resolves callers from request headers
pub struct Authenticator {
    api_key_validator: Arc<ApiKeyValidator>,
}

impl Authenticator {
    pub fn new(api_key_validator: Arc<ApiKeyValidator>) -> Self {
        Self { api_key_validator }
    }

    /// Authenticate an `Authorization` header value
    pub fn authenticate(&self, auth_header: Option<&str>) -> Result<CallerContext, AuthError> {
        let header = auth_header.ok_or(AuthError::MissingAuth)?;

        if let Some(key) = header.strip_prefix("ApiKey ") {
            return self.api_key_validator.validate(key.trim());
        }

        // Try as raw API key
        if header.starts_with(API_KEY_PREFIX) {
            return self.api_key_validator.validate(header);
        }

        Err(AuthError::MissingAuth)
    }
}

/// Caller extension inserted into each authenticated request
#[derive(Clone, Copy, Debug)]
pub struct CallerExt(pub CallerContext);

/// Authentication middleware configuration/state.
#[derive(Clone)]
pub struct AuthMiddlewareState {
    pub authenticator: Arc<Authenticator>,
    /// If false, the caller is read from `X-Caller-Address` (dev mode).
    pub require_auth: bool,
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

fn caller_from_dev_header(headers: &HeaderMap) -> Result<CallerContext, AuthError> {
    let raw = headers
        .get(CALLER_ADDRESS_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingAuth)?;
    let address: Address = raw
        .parse()
        .map_err(|_| AuthError::InvalidCallerAddress(raw.to_string()))?;
    Ok(CallerContext::new(address))
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AuthMiddlewareState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let caller = if state.require_auth {
        let auth_header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        state.authenticator.authenticate(auth_header)
    } else {
        caller_from_dev_header(request.headers())
    };

    let caller = match caller {
        Ok(caller) => caller,
        Err(e) => {
            tracing::debug!(error = %e, "request rejected by auth middleware");
            return auth_error_response(e);
        }
    };

    if let Some(ref limiter) = state.rate_limiter {
        if let Err(e) = limiter.check(&caller.address.to_string(), caller.rate_limit) {
            return auth_error_response(e);
        }
    }

    request.extensions_mut().insert(CallerExt(caller));
    next.run(request).await
}

/// Convert auth error to HTTP response
fn auth_error_response(error: AuthError) -> Response {
    ApiError::from(error).into_response()
}

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window rate limiter keyed by caller
pub struct RateLimiter {
    /// Requests per minute per key
    requests_per_minute: u32,
    windows: Mutex<Windows>,
}

struct Windows {
    counts: HashMap<String, (u32, Instant)>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            requests_per_minute,
            windows: Mutex::new(Windows {
                counts: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Check if request is allowed, honoring a per-key override
    pub fn check(&self, key: &str, limit_override: Option<u32>) -> Result<(), AuthError> {
        self.check_at(key, limit_override, Instant::now())
    }

    fn check_at(
        &self,
        key: &str,
        limit_override: Option<u32>,
        now: Instant,
    ) -> Result<(), AuthError> {
        let limit = limit_override.unwrap_or(self.requests_per_minute);
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);

        // Drop expired windows at most once per window length
        if now.duration_since(windows.last_sweep) >= RATE_WINDOW {
            windows
                .counts
                .retain(|_, (_, started)| now.duration_since(*started) < RATE_WINDOW);
            windows.last_sweep = now;
        }

        let entry = windows.counts.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= RATE_WINDOW {
            *entry = (0, now);
        }

        if entry.0 >= limit {
            return Err(AuthError::RateLimited);
        }

        entry.0 += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::ApiKeyRecord;

    #[test]
    fn test_rate_limiter() {
        let limiter = RateLimiter::new(5);
        let key = "0xabc";

        for _ in 0..5 {
            assert!(limiter.check(key, None).is_ok());
        }
        assert!(matches!(
            limiter.check(key, None),
            Err(AuthError::RateLimited)
        ));
        // Other callers have their own window
        assert!(limiter.check("0xdef", None).is_ok());
    }

    #[test]
    fn test_rate_limit_override() {
        let limiter = RateLimiter::new(100);
        assert!(limiter.check("k", Some(1)).is_ok());
        assert!(limiter.check("k", Some(1)).is_err());
    }

    #[test]
    fn test_rate_window_resets_and_prunes_idle_callers() {
        let limiter = RateLimiter::new(1);
        let start = Instant::now();

        for i in 0..50 {
            limiter.check_at(&format!("0x{i:040x}"), None, start).unwrap();
        }
        assert!(limiter.check_at("0xactive", None, start).is_ok());
        assert!(limiter.check_at("0xactive", None, start).is_err());
        assert_eq!(limiter.windows.lock().unwrap().counts.len(), 51);

        // A full window later only the caller seen now is tracked
        let later = start + RATE_WINDOW + Duration::from_secs(1);
        assert!(limiter.check_at("0xactive", None, later).is_ok());
        let windows = limiter.windows.lock().unwrap();
        assert_eq!(windows.counts.len(), 1);
        assert!(windows.counts.contains_key("0xactive"));
    }

    #[test]
    fn test_authenticate_header_forms() {
        let validator = Arc::new(ApiKeyValidator::new());
        let address = Address::random();
        validator.register_key(ApiKeyRecord::new("ag_test_key", address));
        let auth = Authenticator::new(validator);

        assert_eq!(
            auth.authenticate(Some("ApiKey ag_test_key")).unwrap().address,
            address
        );
        assert_eq!(auth.authenticate(Some("ag_test_key")).unwrap().address, address);
        assert!(matches!(
            auth.authenticate(None),
            Err(AuthError::MissingAuth)
        ));
        assert!(matches!(
            auth.authenticate(Some("Bearer token")),
            Err(AuthError::MissingAuth)
        ));
        assert!(matches!(
            auth.authenticate(Some("ApiKey ag_wrong")),
            Err(AuthError::InvalidApiKey)
        ));
    }

    #[test]
    fn test_dev_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(caller_from_dev_header(&headers).is_err());

        let address = Address::random();
        headers.insert(
            CALLER_ADDRESS_HEADER,
            address.to_string().parse().unwrap(),
        );
        assert_eq!(caller_from_dev_header(&headers).unwrap().address, address);

        headers.insert(CALLER_ADDRESS_HEADER, "nope".parse().unwrap());
        assert!(matches!(
            caller_from_dev_header(&headers),
            Err(AuthError::InvalidCallerAddress(_))
        ));
    }
}
