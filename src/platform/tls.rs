//! Client identity for clusters that enable TLS between components

use k8s_openapi::api::core::v1::Secret;

use crate::common::{Error, Result};

pub const CA_CERT_KEY: &str = "ca.crt";
pub const CLIENT_CERT_KEY: &str = "tls.crt";
pub const CLIENT_KEY_KEY: &str = "tls.key";

/// Secret holding the client certificate issued for cluster `cluster`.
pub fn client_tls_secret_name(cluster: &str) -> String {
    format!("{}-cluster-client-secret", cluster)
}

/// PEM material needed to talk to a TLS-enabled component.
#[derive(Clone)]
pub struct ClientTls {
    pub ca_pem: Vec<u8>,
    pub cert_pem: Vec<u8>,
    pub key_pem: Vec<u8>,
}

impl std::fmt::Debug for ClientTls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientTls").finish_non_exhaustive()
    }
}

impl ClientTls {
    pub fn from_secret(secret: &Secret) -> Result<Self> {
        let name = secret.metadata.name.as_deref().unwrap_or_default();
        let field = |key: &str| -> Result<Vec<u8>> {
            secret
                .data
                .as_ref()
                .and_then(|d| d.get(key))
                .map(|v| v.0.clone())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::InvalidConfig(format!("secret {} has no {}", name, key)))
        };
        Ok(Self {
            ca_pem: field(CA_CERT_KEY)?,
            cert_pem: field(CLIENT_CERT_KEY)?,
            key_pem: field(CLIENT_KEY_KEY)?,
        })
    }

    /// Certificate chain followed by the private key, as reqwest expects.
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut pem = self.cert_pem.clone();
        if !pem.ends_with(b"\n") {
            pem.push(b'\n');
        }
        pem.extend_from_slice(&self.key_pem);
        pem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn secret(keys: &[&str]) -> Secret {
        let data: BTreeMap<String, ByteString> = keys
            .iter()
            .map(|k| (k.to_string(), ByteString(format!("-- {} --", k).into_bytes())))
            .collect();
        Secret {
            metadata: ObjectMeta {
                name: Some(client_tls_secret_name("basic")),
                ..Default::default()
            },
            data: Some(data),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_secret() {
        let tls = ClientTls::from_secret(&secret(&[CA_CERT_KEY, CLIENT_CERT_KEY, CLIENT_KEY_KEY]))
            .unwrap();
        assert_eq!(tls.ca_pem, b"-- ca.crt --");
        assert_eq!(tls.identity_pem(), b"-- tls.crt --\n-- tls.key --");
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let err = ClientTls::from_secret(&secret(&[CA_CERT_KEY, CLIENT_CERT_KEY])).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("basic-cluster-client-secret has no tls.key"));
    }
}
