//! Gateway configuration
//!
//! Settings arrive from up to three layers (CLI/environment, an optional
//! TOML file, built-in defaults) as [`RawConfig`] values. They are merged
//! once at startup and validated into an immutable [`GatewayConfig`] that
//! every component receives by reference. Nothing reads the environment
//! after that point.
//!
//! The backend address and the listen port have no defaults: a value that
//! only works on one machine's private network must always be supplied.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_BACKEND_SCHEME: &str = "http";
pub const DEFAULT_LISTEN_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PROXY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_HEALTH_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_BACKEND_HEALTH_PATH: &str = "/health";
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// `[gateway]` section: how the gateway listens and bounds upstream calls
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawGatewaySection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub proxy_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub health_timeout_ms: Option<u64>,
    pub max_body_bytes: Option<usize>,
}

/// `[backend]` section: where the private backend lives
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawBackendSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub scheme: Option<String>,
    pub health_path: Option<String>,
}

/// One layer of unvalidated settings
///
/// ```toml
/// [gateway]
/// port = 8080
/// proxy_timeout_ms = 5000
///
/// [backend]
/// host = "backend"
/// port = 3000
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawConfig {
    pub gateway: RawGatewaySection,
    pub backend: RawBackendSection,
}

impl RawConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_string(),
            source,
        })
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Layer `over` on top of `self`; values set in `over` win
    pub fn overlay(self, over: RawConfig) -> RawConfig {
        RawConfig {
            gateway: RawGatewaySection {
                host: over.gateway.host.or(self.gateway.host),
                port: over.gateway.port.or(self.gateway.port),
                proxy_timeout_ms: over.gateway.proxy_timeout_ms.or(self.gateway.proxy_timeout_ms),
                connect_timeout_ms: over
                    .gateway
                    .connect_timeout_ms
                    .or(self.gateway.connect_timeout_ms),
                health_timeout_ms: over
                    .gateway
                    .health_timeout_ms
                    .or(self.gateway.health_timeout_ms),
                max_body_bytes: over.gateway.max_body_bytes.or(self.gateway.max_body_bytes),
            },
            backend: RawBackendSection {
                host: over.backend.host.or(self.backend.host),
                port: over.backend.port.or(self.backend.port),
                scheme: over.backend.scheme.or(self.backend.scheme),
                health_path: over.backend.health_path.or(self.backend.health_path),
            },
        }
    }
}

/// Validated, immutable gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the private backend, e.g. `http://backend:3000/`
    pub backend_url: Url,
    /// Address the public listener binds to
    pub listen_addr: SocketAddr,
    /// Bound on a whole forwarded exchange, body included
    pub proxy_timeout: Duration,
    /// Bound on establishing the backend connection
    pub connect_timeout: Duration,
    /// Bound on the `/api/health` backend probe
    pub health_timeout: Duration,
    /// Backend path probed by `/api/health`
    pub backend_health_path: String,
    /// Largest inbound body the gateway will buffer and forward
    pub max_body_bytes: usize,
}

impl GatewayConfig {
    /// Validate a merged set of settings
    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let backend_host = raw
            .backend
            .host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .ok_or(ConfigError::Missing("backend host"))?;
        let backend_port = nonzero_port(raw.backend.port, "backend port")?;
        let scheme = raw
            .backend
            .scheme
            .unwrap_or_else(|| DEFAULT_BACKEND_SCHEME.to_string());
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::invalid(
                "backend scheme",
                format!("'{}' is not http or https", scheme),
            ));
        }
        let backend_url = backend_base_url(&scheme, &backend_host, backend_port)?;

        let listen_host = match raw.gateway.host.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_LISTEN_HOST,
            Some(h) => h.parse::<IpAddr>().map_err(|e| {
                ConfigError::invalid("gateway host", format!("'{}': {}", h, e))
            })?,
        };
        let listen_port = nonzero_port(raw.gateway.port, "gateway port")?;

        let proxy_timeout = timeout_ms(
            raw.gateway.proxy_timeout_ms,
            DEFAULT_PROXY_TIMEOUT_MS,
            "proxy timeout",
        )?;
        let connect_timeout = timeout_ms(
            raw.gateway.connect_timeout_ms,
            DEFAULT_CONNECT_TIMEOUT_MS,
            "connect timeout",
        )?
        .min(proxy_timeout);
        let health_timeout = timeout_ms(
            raw.gateway.health_timeout_ms,
            DEFAULT_HEALTH_TIMEOUT_MS,
            "health timeout",
        )?;

        let backend_health_path = raw
            .backend
            .health_path
            .unwrap_or_else(|| DEFAULT_BACKEND_HEALTH_PATH.to_string());
        if !backend_health_path.starts_with('/') {
            return Err(ConfigError::invalid(
                "backend health path",
                format!("'{}' must start with '/'", backend_health_path),
            ));
        }

        let max_body_bytes = raw.gateway.max_body_bytes.unwrap_or(DEFAULT_MAX_BODY_BYTES);
        if max_body_bytes == 0 {
            return Err(ConfigError::invalid("max body bytes", "must be greater than 0"));
        }

        Ok(Self {
            backend_url,
            listen_addr: SocketAddr::new(listen_host, listen_port),
            proxy_timeout,
            connect_timeout,
            health_timeout,
            backend_health_path,
            max_body_bytes,
        })
    }

    /// Config for a backend at `backend_url` with default bounds.
    ///
    /// Convenience for embedding and tests; the listen address is
    /// `127.0.0.1:0`.
    pub fn for_backend(backend_url: Url) -> Self {
        Self {
            backend_url,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            proxy_timeout: Duration::from_millis(DEFAULT_PROXY_TIMEOUT_MS),
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            health_timeout: Duration::from_millis(DEFAULT_HEALTH_TIMEOUT_MS),
            backend_health_path: DEFAULT_BACKEND_HEALTH_PATH.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Full URL of the backend health endpoint
    pub fn backend_health_url(&self) -> String {
        crate::routing::upstream_url(&self.backend_url, &self.backend_health_path, None)
    }
}

fn nonzero_port(port: Option<u16>, field: &'static str) -> Result<u16, ConfigError> {
    match port {
        None => Err(ConfigError::Missing(field)),
        Some(0) => Err(ConfigError::invalid(field, "must be between 1 and 65535")),
        Some(p) => Ok(p),
    }
}

fn timeout_ms(
    value: Option<u64>,
    default: u64,
    field: &'static str,
) -> Result<Duration, ConfigError> {
    match value.unwrap_or(default) {
        0 => Err(ConfigError::invalid(field, "must be greater than 0")),
        ms => Ok(Duration::from_millis(ms)),
    }
}

fn backend_base_url(scheme: &str, host: &str, port: u16) -> Result<Url, ConfigError> {
    // Bare IPv6 literals need brackets inside a URL authority
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    let raw = format!("{}://{}:{}/", scheme, host, port);
    Url::parse(&raw).map_err(|e| ConfigError::invalid("backend host", format!("'{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> RawConfig {
        RawConfig {
            gateway: RawGatewaySection {
                port: Some(8080),
                ..Default::default()
            },
            backend: RawBackendSection {
                host: Some("backend".to_string()),
                port: Some(3000),
                ..Default::default()
            },
        }
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let config = GatewayConfig::from_raw(minimal()).unwrap();
        assert_eq!(config.backend_url.as_str(), "http://backend:3000/");
        assert_eq!(config.listen_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.proxy_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.health_timeout, Duration::from_secs(2));
        assert_eq!(config.backend_health_path, "/health");
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.backend_health_url(), "http://backend:3000/health");
    }

    #[test]
    fn backend_host_is_required() {
        let mut raw = minimal();
        raw.backend.host = None;
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Missing("backend host"))
        ));
    }

    #[test]
    fn blank_backend_host_counts_as_missing() {
        let mut raw = minimal();
        raw.backend.host = Some("  ".to_string());
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Missing("backend host"))
        ));
    }

    #[test]
    fn ports_are_required_and_nonzero() {
        let mut raw = minimal();
        raw.gateway.port = None;
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Missing("gateway port"))
        ));

        let mut raw = minimal();
        raw.backend.port = Some(0);
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Invalid { field: "backend port", .. })
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut raw = minimal();
        raw.gateway.proxy_timeout_ms = Some(0);
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Invalid { field: "proxy timeout", .. })
        ));
    }

    #[test]
    fn connect_timeout_clamped_to_proxy_timeout() {
        let mut raw = minimal();
        raw.gateway.proxy_timeout_ms = Some(500);
        raw.gateway.connect_timeout_ms = Some(3_000);
        let config = GatewayConfig::from_raw(raw).unwrap();
        assert_eq!(config.connect_timeout, Duration::from_millis(500));
    }

    #[test]
    fn unsupported_scheme_rejected() {
        let mut raw = minimal();
        raw.backend.scheme = Some("ftp".to_string());
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Invalid { field: "backend scheme", .. })
        ));
    }

    #[test]
    fn health_path_must_be_absolute() {
        let mut raw = minimal();
        raw.backend.health_path = Some("health".to_string());
        assert!(GatewayConfig::from_raw(raw).is_err());
    }

    #[test]
    fn ipv6_backend_is_bracketed() {
        let mut raw = minimal();
        raw.backend.host = Some("fd00::5".to_string());
        let config = GatewayConfig::from_raw(raw).unwrap();
        assert_eq!(config.backend_url.as_str(), "http://[fd00::5]:3000/");
    }

    #[test]
    fn invalid_listen_host_rejected() {
        let mut raw = minimal();
        raw.gateway.host = Some("not-an-ip".to_string());
        assert!(matches!(
            GatewayConfig::from_raw(raw),
            Err(ConfigError::Invalid { field: "gateway host", .. })
        ));
    }

    #[test]
    fn overlay_prefers_upper_layer() {
        let file = RawConfig::from_toml_str(
            r#"
            [gateway]
            port = 9000
            proxy_timeout_ms = 1500

            [backend]
            host = "products.internal"
            port = 3000
            "#,
            "test.toml",
        )
        .unwrap();
        let cli = RawConfig {
            gateway: RawGatewaySection {
                port: Some(8080),
                ..Default::default()
            },
            ..Default::default()
        };

        let config = GatewayConfig::from_raw(file.overlay(cli)).unwrap();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.proxy_timeout, Duration::from_millis(1500));
        assert_eq!(config.backend_url.as_str(), "http://products.internal:3000/");
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = RawConfig::from_toml_str("[gateway]\nprot = 8080\n", "typo.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shopgate.toml");
        std::fs::write(&path, "[backend]\nhost = \"backend\"\nport = 3000\n").unwrap();

        let raw = RawConfig::load(&path).unwrap();
        assert_eq!(raw.backend.host.as_deref(), Some("backend"));
        assert_eq!(raw.backend.port, Some(3000));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = RawConfig::load(Path::new("/nonexistent/shopgate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
