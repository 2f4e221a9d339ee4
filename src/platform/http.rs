//! HTTP probe backed by reqwest

use async_trait::async_trait;
use std::time::Duration;

use super::{client_tls_secret_name, ClientTls, ClusterPlatform, HttpProbe, HttpResponse};
use crate::cluster::TidbCluster;
use crate::common::{Error, Result};

/// Status-endpoint client scoped to one check, every request bounded by `timeout`.
#[derive(Clone, Debug)]
pub struct ReqwestProbe {
    client: reqwest::Client,
}

impl ReqwestProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// Client presenting `tls` and trusting only its CA.
    pub fn with_client_tls(timeout: Duration, tls: &ClientTls) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(reqwest::Certificate::from_pem(&tls.ca_pem)?)
            .identity(reqwest::Identity::from_pem(&tls.identity_pem())?)
            .build()?;
        Ok(Self { client })
    }

    /// Probe for talking to the components of `tc`, loading the cluster's
    /// client certificate when TLS between components is enabled.
    pub async fn for_cluster(
        platform: &dyn ClusterPlatform,
        tc: &TidbCluster,
        timeout: Duration,
    ) -> Result<Self> {
        if !tc.tls_cluster_enabled() {
            return Self::new(timeout);
        }
        let secret_name = client_tls_secret_name(&tc.name);
        let secret = platform
            .get_secret(&tc.namespace, &secret_name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("secret {}/{}", tc.namespace, secret_name)))?;
        Self::with_client_tls(timeout, &ClientTls::from_secret(&secret)?)
    }

    async fn answer(res: reqwest::Response) -> Result<HttpResponse> {
        let status = res.status().as_u16();
        let body = res.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let res = Self::answer(self.client.get(url).send().await?).await?;
        tracing::debug!(url, status = res.status, "status probe answered");
        Ok(res)
    }

    async fn post(&self, url: &str, json: Option<String>) -> Result<HttpResponse> {
        let mut req = self.client.post(url);
        if let Some(body) = json {
            req = req
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        let res = Self::answer(req.send().await?).await?;
        tracing::debug!(url, status = res.status, "status post answered");
        Ok(res)
    }
}
