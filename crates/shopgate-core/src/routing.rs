//! Request classification and upstream URL construction.
//!
//! The gateway recognises three kinds of paths. Everything else is answered
//! locally with a 404. The HTTP layer registers one handler per kind and
//! uses [`Route::classify`] for anything its static routes do not cover,
//! so this function is the single source of truth for dispatch.

use url::Url;

/// Gateway-local liveness endpoint
pub const LOCAL_HEALTH_PATH: &str = "/health";

/// Composite endpoint that probes the backend
pub const COMPOSITE_HEALTH_PATH: &str = "/api/health";

/// Every path under this prefix is forwarded to the backend
pub const API_PREFIX: &str = "/api/";

/// Handler a request is dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/health`
    LocalHealth,
    /// `/api/health` and anything below `/api/health/`
    CompositeHealth,
    /// Any other `/api/*` path
    Proxy,
    /// No handler
    NotFound,
}

impl Route {
    /// Classify a request path (without query string).
    ///
    /// ```
    /// # use shopgate_core::Route;
    /// assert_eq!(Route::classify("/health"), Route::LocalHealth);
    /// assert_eq!(Route::classify("/api/health"), Route::CompositeHealth);
    /// assert_eq!(Route::classify("/api/products/42"), Route::Proxy);
    /// assert_eq!(Route::classify("/products"), Route::NotFound);
    /// ```
    pub fn classify(path: &str) -> Self {
        if path == LOCAL_HEALTH_PATH {
            return Route::LocalHealth;
        }

        match path.strip_prefix(COMPOSITE_HEALTH_PATH) {
            Some("") => return Route::CompositeHealth,
            Some(rest) if rest.starts_with('/') => return Route::CompositeHealth,
            _ => {}
        }

        if path.starts_with(API_PREFIX) {
            Route::Proxy
        } else {
            Route::NotFound
        }
    }

    /// Short label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::LocalHealth => "local_health",
            Route::CompositeHealth => "composite_health",
            Route::Proxy => "proxy",
            Route::NotFound => "not_found",
        }
    }
}

/// Build the backend URL for an inbound path and query.
///
/// The inbound path is appended to the base URL's own path, so a backend
/// mounted under a prefix (e.g. `http://backend:3000/v1`) keeps it. The
/// query string is carried over byte for byte.
///
/// ```
/// # use shopgate_core::routing::upstream_url;
/// let base = url::Url::parse("http://backend:3000").unwrap();
/// assert_eq!(
///     upstream_url(&base, "/api/products", Some("page=2")),
///     "http://backend:3000/api/products?page=2"
/// );
/// ```
pub fn upstream_url(base: &Url, path: &str, query: Option<&str>) -> String {
    let base = base.as_str().trim_end_matches('/');
    match query {
        Some(q) if !q.is_empty() => format!("{}{}?{}", base, path, q),
        _ => format!("{}{}", base, path),
    }
}
