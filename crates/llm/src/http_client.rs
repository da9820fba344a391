//! HTTP Client
//!
//! One `reqwest::Client` per gateway, shared by every stage call.

use std::time::Duration;

use uber_codegen_core::settings::{GatewaySettings, ProxyConfig};

use crate::types::{LlmError, LlmResult};

/// Connection setup must finish well inside any call deadline.
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Build the client for `settings`.
///
/// Without a configured proxy, proxy environment variables are ignored.
/// Request deadlines are applied per call by the gateway, not here.
pub fn build_http_client(settings: &GatewaySettings) -> LlmResult<reqwest::Client> {
    let connect_timeout = CONNECT_TIMEOUT_SECS.min(settings.timeout_secs.max(1));
    let builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(connect_timeout));

    let builder = match &settings.proxy {
        Some(proxy) => builder.proxy(proxy_for(proxy)?),
        None => builder.no_proxy(),
    };
    builder.build().map_err(|e| LlmError::Other {
        message: format!("failed to build HTTP client: {}", e),
    })
}

fn proxy_for(config: &ProxyConfig) -> LlmResult<reqwest::Proxy> {
    let proxy = reqwest::Proxy::all(&config.url).map_err(|e| LlmError::InvalidRequest {
        message: format!("invalid proxy URL '{}': {}", config.url, e),
    })?;
    Ok(match (&config.username, &config.password) {
        (Some(user), Some(password)) => proxy.basic_auth(user, password),
        _ => proxy,
    })
}
