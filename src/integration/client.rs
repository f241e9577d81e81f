use async_trait::async_trait;
use prost::Message;

use crate::errors::TransportError;
use crate::proto::{
    InvocationRequest, InvocationResponse, RegistrationRequest, RegistrationResponse,
    SpawnRequest, SpawnResponse,
};

// ============================================================================
// Proxy Transport
// ============================================================================
//
// Outbound half of the protocol: blocking, single-outstanding-request calls
// posting binary bodies to the proxy and decoding binary responses. The
// trait seam exists so registration/invocation logic can be exercised
// against test doubles.
//
// ============================================================================

#[async_trait]
pub(crate) trait ProxyTransport: Send + Sync {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationResponse, TransportError>;

    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationResponse, TransportError>;

    async fn spawn(
        &self,
        system: &str,
        request: SpawnRequest,
    ) -> Result<SpawnResponse, TransportError>;
}

/// HTTP transport against the proxy's REST surface.
pub(crate) struct HttpProxyClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpProxyClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn registration_url(&self) -> String {
        format!("{}/api/v1/system", self.base_url)
    }

    fn invocation_url(&self, system: &str, actor: &str) -> String {
        format!(
            "{}/api/v1/system/{}/actors/{}/invoke",
            self.base_url, system, actor
        )
    }

    fn spawn_url(&self, system: &str) -> String {
        format!("{}/api/v1/system/{}/actors/spawn", self.base_url, system)
    }

    async fn post_proto<Req: Message, Resp: Message + Default>(
        &self,
        url: String,
        request: &Req,
    ) -> Result<Resp, TransportError> {
        let body = request.encode_to_vec();

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/octet-stream")
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let bytes = response.bytes().await?;
        Ok(Resp::decode(bytes.as_ref())?)
    }
}

#[async_trait]
impl ProxyTransport for HttpProxyClient {
    async fn register(
        &self,
        request: RegistrationRequest,
    ) -> Result<RegistrationResponse, TransportError> {
        self.post_proto(self.registration_url(), &request).await
    }

    async fn invoke(
        &self,
        request: InvocationRequest,
    ) -> Result<InvocationResponse, TransportError> {
        let system = request
            .system
            .as_ref()
            .map(|s| s.name.as_str())
            .unwrap_or_default();
        let actor = request
            .actor
            .as_ref()
            .and_then(|a| a.id.as_ref())
            .map(|id| id.name.as_str())
            .unwrap_or_default();

        let url = self.invocation_url(system, actor);
        self.post_proto(url, &request).await
    }

    async fn spawn(
        &self,
        system: &str,
        request: SpawnRequest,
    ) -> Result<SpawnResponse, TransportError> {
        self.post_proto(self.spawn_url(system), &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxy_endpoint_urls() {
        let client = HttpProxyClient::new("http://localhost:9006");

        assert_eq!(
            client.registration_url(),
            "http://localhost:9006/api/v1/system"
        );
        assert_eq!(
            client.invocation_url("SpawnSysTest", "userActor"),
            "http://localhost:9006/api/v1/system/SpawnSysTest/actors/userActor/invoke"
        );
        assert_eq!(
            client.spawn_url("SpawnSysTest"),
            "http://localhost:9006/api/v1/system/SpawnSysTest/actors/spawn"
        );
    }
}
