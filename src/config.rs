use std::env;

const DEFAULT_PROXY_URL: &str = "http://localhost:9006";
const DEFAULT_ACTION_PORT: u16 = 8090;

/// Connection settings for the proxy and the local callback endpoint, read
/// from the environment at system creation.
#[derive(Clone, Debug)]
pub struct ProxyConfig {
    /// Base URL of the proxy (`BRIDGE_PROXY_URL`).
    pub proxy_url: String,
    /// Bind address for the callback server.
    pub action_host: String,
    /// Bind port for the callback server (`BRIDGE_ACTION_PORT`).
    pub action_port: u16,
}

impl ProxyConfig {
    pub fn from_env() -> Self {
        let proxy_url =
            env::var("BRIDGE_PROXY_URL").unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string());

        let action_port = env::var("BRIDGE_ACTION_PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_ACTION_PORT);

        Self {
            proxy_url,
            action_host: "0.0.0.0".to_string(),
            action_port,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            action_host: "0.0.0.0".to_string(),
            action_port: DEFAULT_ACTION_PORT,
        }
    }
}
