//! Status-port client for individual tidb servers

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::cluster::{Component, TidbCluster};
use crate::common::{Error, Result};
use crate::platform::HttpProbe;

/// Server info returned by `POST /info`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DbInfo {
    #[serde(default)]
    pub is_owner: bool,
}

/// Talks to one tidb server through its status port. Build the client with
/// [`ReqwestProbe::for_cluster`](crate::platform::ReqwestProbe::for_cluster)
/// so TLS-enabled clusters get the client certificate.
pub struct TidbControl<'a> {
    http: &'a dyn HttpProbe,
    status_port: u16,
}

impl<'a> TidbControl<'a> {
    pub fn new(http: &'a dyn HttpProbe, status_port: u16) -> Self {
        Self { http, status_port }
    }

    /// `<scheme>://<cluster>-tidb-<ordinal>.<cluster>-tidb-peer.<ns>:<port>`
    pub fn base_url(&self, tc: &TidbCluster, ordinal: i32) -> String {
        format!(
            "{}://{}-{}.{}.{}:{}",
            tc.scheme(),
            Component::Tidb.member_name(&tc.name),
            ordinal,
            Component::Tidb.peer_member_name(&tc.name),
            tc.namespace,
            self.status_port
        )
    }

    /// A server is healthy when `/status` answers below 400.
    pub async fn get_health(&self, tc: &TidbCluster, ordinal: i32) -> bool {
        let url = format!("{}/status", self.base_url(tc, ordinal));
        match self.http.get(&url).await {
            Ok(res) if res.status < 400 => true,
            Ok(res) => {
                tracing::info!(url = %url, status = res.status, body = %res.body, "tidb status error response");
                false
            }
            Err(e) => {
                tracing::info!(url = %url, error = %e, "tidb status request failed");
                false
            }
        }
    }

    /// Anything but a 200 is an error.
    pub async fn get_info(&self, tc: &TidbCluster, ordinal: i32) -> Result<DbInfo> {
        let url = format!("{}/info", self.base_url(tc, ordinal));
        let res = self.http.post(&url, None).await?;
        if res.status != 200 {
            return Err(Error::Http(format!(
                "error response {}:{} URL: {}",
                res.body, res.status, url
            )));
        }
        Ok(serde_json::from_str(&res.body)?)
    }

    /// Replace the server's labels config.
    pub async fn set_server_labels(
        &self,
        tc: &TidbCluster,
        ordinal: i32,
        labels: &BTreeMap<String, String>,
    ) -> Result<()> {
        let url = format!("{}/labels", self.base_url(tc, ordinal));
        let res = self
            .http
            .post(&url, Some(serde_json::to_string(labels)?))
            .await?;
        if res.status >= 400 {
            return Err(Error::Http(format!(
                "error response {}:{} URL: {}",
                res.body, res.status, url
            )));
        }
        tracing::info!(cluster = %tc.name, ordinal, labels = ?labels, "set tidb server labels");
        Ok(())
    }
}
