//! etcd backend.
//!
//! Keys and values go through the v3 KV API as-is. The client handle is
//! held behind a mutex only so that [`KvStore::close`] can drop it; each
//! request works on a cheap clone of the handle.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use etcd_client::{
    Certificate, Client, ConnectOptions, DeleteOptions, GetOptions, Identity, KvClient, TlsOptions,
};

use etcdpolicy_core::error::{PolicyError, Result};

use super::{KeyValue, KvStore, StoreError, StoreResult};
use crate::config::{AdapterConfig, AuthConfig};

pub struct EtcdKvStore {
    endpoints: Vec<String>,
    kv: Mutex<Option<KvClient>>,
}

impl EtcdKvStore {
    /// Open a client for `cfg.endpoints`.
    ///
    /// Malformed TLS material and connection failures are returned, never
    /// panicked on.
    pub async fn connect(cfg: &AdapterConfig) -> Result<Self> {
        let options = connect_options(cfg)?;
        let endpoints = cfg.endpoints.join(",");

        let client = tokio::time::timeout(cfg.timeouts.dial(), Client::connect(&cfg.endpoints, Some(options)))
            .await
            .map_err(|_| PolicyError::Connect {
                endpoints: endpoints.clone(),
                source: format!("dial timed out after {:?}", cfg.timeouts.dial()).into(),
            })?
            .map_err(|e| PolicyError::Connect {
                endpoints: endpoints.clone(),
                source: e.to_string().into(),
            })?;

        tracing::info!(%endpoints, "connected to etcd");
        Ok(Self {
            endpoints: cfg.endpoints.clone(),
            kv: Mutex::new(Some(client.kv_client())),
        })
    }

    fn client(&self) -> StoreResult<KvClient> {
        // A poisoned lock means a panic elsewhere; report closed instead of panicking.
        let guard = self.kv.lock().map_err(|_| StoreError::Closed)?;
        guard.clone().ok_or(StoreError::Closed)
    }
}

fn connect_options(cfg: &AdapterConfig) -> Result<ConnectOptions> {
    let t = &cfg.timeouts;
    let mut options = ConnectOptions::new()
        .with_connect_timeout(t.dial())
        .with_keep_alive(t.keepalive_time(), t.keepalive_timeout())
        .with_timeout(t.request());

    if let Some(auth) = &cfg.auth {
        auth.validate()?;
        if auth.use_tls {
            options = options.with_tls(tls_options(auth));
        }
        if let Some((user, password)) = auth.credentials() {
            options = options.with_user(user, password);
        }
    }
    Ok(options)
}

fn tls_options(auth: &AuthConfig) -> TlsOptions {
    let mut tls = TlsOptions::new();
    if !auth.ca_cert.is_empty() {
        tls = tls.ca_certificate(Certificate::from_pem(auth.ca_cert.as_bytes()));
    }
    if !auth.client_cert.is_empty() {
        tls = tls.identity(Identity::from_pem(
            auth.client_cert.as_bytes(),
            auth.client_key.as_bytes(),
        ));
    }
    tls
}

fn backend(e: etcd_client::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl KvStore for EtcdKvStore {
    async fn get_prefix(&self, prefix: &str) -> StoreResult<Vec<KeyValue>> {
        let mut kv = self.client()?;
        let resp = kv
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await
            .map_err(backend)?;

        resp.kvs()
            .iter()
            .map(|e| {
                let key = e.key_str().map_err(|_| StoreError::InvalidKey {
                    prefix: prefix.to_string(),
                })?;
                Ok(KeyValue {
                    key: key.to_string(),
                    value: Bytes::copy_from_slice(e.value()),
                })
            })
            .collect()
    }

    async fn get_keys_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut kv = self.client()?;
        let resp = kv
            .get(prefix, Some(GetOptions::new().with_prefix().with_keys_only()))
            .await
            .map_err(backend)?;

        resp.kvs()
            .iter()
            .map(|e| {
                e.key_str().map(str::to_string).map_err(|_| StoreError::InvalidKey {
                    prefix: prefix.to_string(),
                })
            })
            .collect()
    }

    async fn put(&self, key: &str, value: Bytes) -> StoreResult<()> {
        let mut kv = self.client()?;
        kv.put(key, value.to_vec(), None).await.map_err(backend)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<u64> {
        let mut kv = self.client()?;
        let resp = kv.delete(key, None).await.map_err(backend)?;
        Ok(resp.deleted().max(0) as u64)
    }

    async fn delete_prefix(&self, prefix: &str) -> StoreResult<u64> {
        let mut kv = self.client()?;
        let resp = kv
            .delete(prefix, Some(DeleteOptions::new().with_prefix()))
            .await
            .map_err(backend)?;
        Ok(resp.deleted().max(0) as u64)
    }

    fn close(&self) {
        if let Ok(mut guard) = self.kv.lock() {
            if guard.take().is_some() {
                tracing::debug!(endpoints = %self.endpoints.join(","), "etcd client released");
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.kv.lock().map(|g| g.is_none()).unwrap_or(true)
    }
}
