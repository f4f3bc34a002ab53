//! Command-line and environment settings for shopgated

use std::path::PathBuf;

use clap::Parser;
use shopgate_core::config::{RawBackendSection, RawConfig, RawGatewaySection};
use shopgate_core::{ConfigError, GatewayConfig};

#[derive(Parser, Debug)]
#[command(name = "shopgated")]
#[command(version, about = "Public HTTP gateway in front of the private product backend")]
pub struct Cli {
    /// TOML config file; flags and environment variables override it
    #[arg(short, long, env = "SHOPGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend host on the private network
    #[arg(long, env = "BACKEND_HOST")]
    pub backend_host: Option<String>,

    /// Backend port
    #[arg(long, env = "BACKEND_PORT")]
    pub backend_port: Option<u16>,

    /// Backend URL scheme (http or https)
    #[arg(long, env = "BACKEND_SCHEME")]
    pub backend_scheme: Option<String>,

    /// Backend path probed by /api/health
    #[arg(long, env = "BACKEND_HEALTH_PATH")]
    pub backend_health_path: Option<String>,

    /// Address to listen on
    #[arg(long, env = "GATEWAY_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Upper bound for a forwarded request, in milliseconds
    #[arg(long, env = "GATEWAY_PROXY_TIMEOUT_MS")]
    pub proxy_timeout_ms: Option<u64>,

    /// Upper bound for connecting to the backend, in milliseconds
    #[arg(long, env = "GATEWAY_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: Option<u64>,

    /// Upper bound for the backend health probe, in milliseconds
    #[arg(long, env = "GATEWAY_HEALTH_TIMEOUT_MS")]
    pub health_timeout_ms: Option<u64>,

    /// Largest request body forwarded to the backend, in bytes
    #[arg(long, env = "GATEWAY_MAX_BODY_BYTES")]
    pub max_body_bytes: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long, env = "SHOPGATE_LOG_JSON")]
    pub log_json: bool,
}

impl Cli {
    /// Settings given on the command line or in the environment
    pub fn raw(&self) -> RawConfig {
        RawConfig {
            gateway: RawGatewaySection {
                host: self.host.clone(),
                port: self.port,
                proxy_timeout_ms: self.proxy_timeout_ms,
                connect_timeout_ms: self.connect_timeout_ms,
                health_timeout_ms: self.health_timeout_ms,
                max_body_bytes: self.max_body_bytes,
            },
            backend: RawBackendSection {
                host: self.backend_host.clone(),
                port: self.backend_port,
                scheme: self.backend_scheme.clone(),
                health_path: self.backend_health_path.clone(),
            },
        }
    }

    /// Merge the config file (if any) under the CLI/env layer and validate
    pub fn resolve(&self) -> Result<GatewayConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => {
                tracing::info!("Loading config from: {}", path.display());
                RawConfig::load(path)?
            }
            None => RawConfig::default(),
        };
        GatewayConfig::from_raw(file.overlay(self.raw()))
    }
}
