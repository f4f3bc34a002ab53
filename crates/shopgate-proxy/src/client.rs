//! BackendClient - Upstream implementation over reqwest

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use shopgate_core::headers::{forwarded_request_headers, is_bodiless, relayed_response_headers};
use shopgate_core::routing::upstream_url;
use shopgate_core::{
    GatewayConfig, ProxyRequest, Upstream, UpstreamError, UpstreamResponse, UpstreamResult,
};
use tracing::{debug, instrument, warn};
use url::Url;

/// Forwards gateway traffic to the backend.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: Url,
    health_url: String,
    proxy_timeout: Duration,
    health_timeout: Duration,
}

impl BackendClient {
    /// Create a client for the backend described by `config`.
    ///
    /// Redirects are not followed (3xx answers are relayed to the client
    /// like any other status) and system proxy settings are ignored, since
    /// the backend sits on the gateway's private network.
    pub fn new(config: &GatewayConfig) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(config.proxy_timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(Policy::none())
            .no_proxy()
            .build()
            .map_err(|e| {
                UpstreamError::InvalidRequest(format!("Failed to create client: {}", describe(&e)))
            })?;

        Ok(Self {
            client,
            base_url: config.backend_url.clone(),
            health_url: config.backend_health_url(),
            proxy_timeout: config.proxy_timeout,
            health_timeout: config.health_timeout,
        })
    }

    /// Map a send-phase reqwest error to UpstreamError
    fn map_send_err(e: reqwest::Error, bound: Duration) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(bound)
        } else if e.is_builder() {
            UpstreamError::InvalidRequest(describe(&e))
        } else {
            UpstreamError::Connect(describe(&e))
        }
    }

    /// Map a body-phase reqwest error to UpstreamError
    fn map_body_err(e: reqwest::Error, bound: Duration) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(bound)
        } else {
            UpstreamError::Truncated(describe(&e))
        }
    }
}

#[async_trait]
impl Upstream for BackendClient {
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn forward(&self, request: ProxyRequest) -> UpstreamResult<UpstreamResponse> {
        let url = upstream_url(&self.base_url, &request.path, request.query.as_deref());
        let headers =
            forwarded_request_headers(&request.headers, request.client_addr.map(|a| a.ip()));

        let method = request.method.clone();
        let mut builder = self.client.request(request.method, &url).headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            let err = Self::map_send_err(e, self.proxy_timeout);
            warn!(target_url = %url, error = %err, "Backend request failed");
            err
        })?;

        let status = response.status();
        let headers = relayed_response_headers(response.headers(), is_bodiless(&method, status));
        let body = response.bytes().await.map_err(|e| {
            let err = Self::map_body_err(e, self.proxy_timeout);
            warn!(
                target_url = %url,
                status = status.as_u16(),
                error = %err,
                "Backend response body failed"
            );
            err
        })?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Backend responded"
        );

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }

    #[instrument(skip(self))]
    async fn probe_health(&self) -> UpstreamResult<()> {
        let response = self
            .client
            .get(&self.health_url)
            .timeout(self.health_timeout)
            .send()
            .await
            .map_err(|e| Self::map_send_err(e, self.health_timeout))?;

        let status = response.status();
        if status.is_success() {
            debug!(status = status.as_u16(), "Backend health probe succeeded");
            Ok(())
        } else {
            Err(UpstreamError::Status(status.as_u16()))
        }
    }
}

/// Render an error with its source chain; reqwest's top-level message
/// alone rarely names the actual cause.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::net::SocketAddr;

    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode};
    use axum::routing::{any, get};
    use axum::Router;
    use tokio::net::TcpListener;

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        addr
    }

    /// An address nothing is listening on
    async fn closed_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    fn config_for(addr: SocketAddr) -> GatewayConfig {
        let mut config =
            GatewayConfig::for_backend(Url::parse(&format!("http://{}/", addr)).unwrap());
        config.proxy_timeout = Duration::from_millis(500);
        config.connect_timeout = Duration::from_millis(500);
        config.health_timeout = Duration::from_millis(300);
        config
    }

    fn request(
        method: Method,
        path: &str,
        query: Option<&str>,
        body: &'static [u8],
    ) -> ProxyRequest {
        ProxyRequest {
            method,
            path: path.to_string(),
            query: query.map(String::from),
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
            client_addr: Some("198.51.100.7:50000".parse().unwrap()),
        }
    }

    async fn echo(
        method: Method,
        uri: axum::http::Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> (StatusCode, HeaderMap, Bytes) {
        let mut out = HeaderMap::new();
        out.insert("x-echo-method", method.as_str().parse().unwrap());
        out.insert("x-echo-uri", uri.to_string().parse().unwrap());
        if let Some(xff) = headers.get("x-forwarded-for") {
            out.insert("x-echo-forwarded-for", xff.clone());
        }
        (StatusCode::CREATED, out, body)
    }

    #[tokio::test]
    async fn forward_preserves_method_uri_and_body() {
        let addr = serve(Router::new().route("/api/{*rest}", any(echo))).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let response = client
            .forward(request(
                Method::PUT,
                "/api/products/42",
                Some("notify=false"),
                br#"{"name":"Desk lamp","price":19.5}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::CREATED);
        assert_eq!(response.headers.get("x-echo-method").unwrap(), "PUT");
        assert_eq!(
            response.headers.get("x-echo-uri").unwrap(),
            "/api/products/42?notify=false"
        );
        assert_eq!(
            response.headers.get("x-echo-forwarded-for").unwrap(),
            "198.51.100.7"
        );
        assert_eq!(&response.body[..], br#"{"name":"Desk lamp","price":19.5}"#);
    }

    #[tokio::test]
    async fn backend_error_status_is_not_an_error() {
        let router = Router::new().route(
            "/api/products/{id}",
            get(|| async { (StatusCode::NOT_FOUND, "no such product") }),
        );
        let addr = serve(router).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let response = client
            .forward(request(Method::GET, "/api/products/missing", None, b""))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(&response.body[..], b"no such product");
    }

    #[tokio::test]
    async fn head_keeps_backend_content_length() {
        let router = Router::new().route(
            "/api/products/{id}",
            get(|| async { "x".repeat(1234) }),
        );
        let addr = serve(router).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let head = client
            .forward(request(Method::HEAD, "/api/products/7", None, b""))
            .await
            .unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(head.headers.get("content-length").unwrap(), "1234");
        assert!(head.body.is_empty());

        let get = client
            .forward(request(Method::GET, "/api/products/7", None, b""))
            .await
            .unwrap();
        assert!(get.headers.get("content-length").is_none());
        assert_eq!(get.body.len(), 1234);
    }

    #[tokio::test]
    async fn client_accept_header_is_forwarded_as_sent() {
        let router = Router::new().route(
            "/api/products",
            get(|headers: HeaderMap| async move {
                headers
                    .get("accept")
                    .map(|v| v.to_str().unwrap().to_string())
                    .unwrap_or_default()
            }),
        );
        let addr = serve(router).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let mut req = request(Method::GET, "/api/products", None, b"");
        req.headers
            .insert("accept", "application/vnd.shop+json".parse().unwrap());
        let response = client.forward(req).await.unwrap();
        assert_eq!(&response.body[..], b"application/vnd.shop+json");
    }

    #[tokio::test]
    async fn redirects_are_relayed_not_followed() {
        let router = Router::new().route(
            "/api/old",
            get(|| async { (StatusCode::FOUND, [("location", "/api/new")]) }),
        );
        let addr = serve(router).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let response = client
            .forward(request(Method::GET, "/api/old", None, b""))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::FOUND);
        assert_eq!(response.headers.get("location").unwrap(), "/api/new");
    }

    #[tokio::test]
    async fn refused_connection_maps_to_connect() {
        let client = BackendClient::new(&config_for(closed_addr().await)).unwrap();
        let err = client
            .forward(request(Method::GET, "/api/products", None, b""))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Connect(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn slow_backend_maps_to_timeout() {
        let router = Router::new().route(
            "/api/products",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "too late"
            }),
        );
        let addr = serve(router).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let started = Instant::now();
        let err = client
            .forward(request(Method::GET, "/api/products", None, b""))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn health_probe_success_and_failure() {
        let healthy = serve(Router::new().route("/health", get(|| async { "ok" }))).await;
        let client = BackendClient::new(&config_for(healthy)).unwrap();
        assert!(client.probe_health().await.is_ok());

        let failing = serve(Router::new().route(
            "/health",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let client = BackendClient::new(&config_for(failing)).unwrap();
        assert!(matches!(
            client.probe_health().await,
            Err(UpstreamError::Status(500))
        ));

        let client = BackendClient::new(&config_for(closed_addr().await)).unwrap();
        assert!(client.probe_health().await.is_err());
    }

    #[tokio::test]
    async fn health_probe_uses_its_own_timeout() {
        let router = Router::new().route(
            "/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                "ok"
            }),
        );
        let addr = serve(router).await;
        let client = BackendClient::new(&config_for(addr)).unwrap();

        let started = Instant::now();
        let err = client.probe_health().await.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(d) if d == Duration::from_millis(300)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
