//! Policy adapter: load, save, add, remove and filtered remove against a
//! [`KvStore`].
//!
//! Every store request is bounded by the same request timeout and is issued
//! once; failures come back wrapped with the operation they belong to.
//! Nothing here is atomic across keys: a failure halfway through a save or a
//! filtered remove leaves the keys already written or deleted as they are.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use etcdpolicy_core::codec::{composite_key, StoredRule};
use etcdpolicy_core::error::{Phase, PolicyError, Result};
use etcdpolicy_core::filter::RuleFilter;
use etcdpolicy_core::key::Namespace;
use etcdpolicy_core::rule::{PolicyRule, SECTIONS};

use crate::config::AdapterConfig;
use crate::model::PolicyModel;
use crate::store::{EtcdKvStore, KvStore, StoreError};

/// Request timeout used when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PolicyAdapter {
    namespace: Namespace,
    request_timeout: Duration,
    store: Arc<dyn KvStore>,
}

impl PolicyAdapter {
    /// Connect to etcd as described by `cfg`.
    ///
    /// Fails if the config is invalid, the TLS material is malformed or the
    /// connection cannot be established; no adapter exists in that case.
    pub async fn connect(cfg: &AdapterConfig) -> Result<Self> {
        cfg.validate()?;
        let store = EtcdKvStore::connect(cfg).await?;
        Ok(Self::with_store(Arc::new(store), cfg.namespace(), cfg.timeouts.request()))
    }

    /// Adapter over an already opened store.
    pub fn with_store(store: Arc<dyn KvStore>, namespace: Namespace, request_timeout: Duration) -> Self {
        Self {
            namespace,
            request_timeout,
            store,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Load every stored rule into `model`.
    ///
    /// An empty namespace is reported as [`PolicyError::EmptyPolicy`], so a
    /// namespace that was never written and one whose rules were all removed
    /// look the same to the caller.
    pub async fn load_policy(&self, model: &mut dyn PolicyModel) -> Result<()> {
        let prefix = self.namespace.prefix();
        let entries = self
            .request(Phase::Load, self.store.get_prefix(&prefix))
            .await?;

        if entries.is_empty() {
            return Err(PolicyError::EmptyPolicy {
                namespace: self.namespace.root(),
            });
        }

        for kv in &entries {
            let stored = StoredRule::from_slice(&kv.key, &kv.value)?;
            model.load_policy_line(&stored.to_line())?;
        }

        tracing::info!(namespace = %self.namespace.as_str(), rules = entries.len(), "policy loaded");
        Ok(())
    }

    /// Replace everything stored under the namespace with the rules of `model`.
    ///
    /// Runs as a prefix delete followed by one put per rule.
    pub async fn save_policy(&self, model: &dyn PolicyModel) -> Result<()> {
        let mut encoded = Vec::new();
        for sec in SECTIONS {
            for rule in model.section_rules(sec) {
                encoded.push(self.encode(&rule)?);
            }
        }

        let prefix = self.namespace.prefix();
        let removed = self
            .request(Phase::Save, self.store.delete_prefix(&prefix))
            .await?;

        for (key, value) in &encoded {
            self.request(Phase::Save, self.store.put(key, value.clone()))
                .await?;
        }

        tracing::info!(
            namespace = %self.namespace.as_str(),
            removed,
            written = encoded.len(),
            "policy saved"
        );
        Ok(())
    }

    /// Store one rule. Adding a rule twice writes the same key twice.
    pub async fn add_policy(&self, sec: &str, ptype: &str, fields: &[String]) -> Result<()> {
        let rule = PolicyRule::new(ptype, fields.iter().map(String::as_str))?;
        let (key, value) = self.encode(&rule)?;
        self.request(Phase::Add, self.store.put(&key, value)).await?;
        tracing::debug!(sec, %key, "policy added");
        Ok(())
    }

    /// Delete the key [`PolicyAdapter::add_policy`] would have written.
    /// Removing an absent rule succeeds.
    pub async fn remove_policy(&self, sec: &str, ptype: &str, fields: &[String]) -> Result<()> {
        let rule = PolicyRule::new(ptype, fields.iter().map(String::as_str))?;
        let key = self.namespace.entry_key(&composite_key(&rule));
        let removed = self.request(Phase::Remove, self.store.delete(&key)).await?;
        tracing::debug!(sec, %key, removed, "policy removed");
        Ok(())
    }

    /// Delete every stored rule matching `field_values` from `field_index` on.
    ///
    /// An empty `ptype` matches all types and an empty value matches any
    /// field. Returns how many keys matched. Any failure of the key
    /// enumeration, a timeout included, is a [`PolicyError::RangeRead`].
    /// Deletes already issued are kept when a later one fails.
    pub async fn remove_filtered_policy(
        &self,
        sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<usize> {
        let filter = RuleFilter::new(ptype, field_index, field_values)?;
        let matcher = filter.compile(&self.namespace)?;

        let prefix = filter.range_prefix(&self.namespace);
        let keys = self
            .bounded(Phase::RemoveFiltered, self.store.get_keys_prefix(&prefix))
            .await
            .map_err(|e| match e {
                PolicyError::Timeout { after, .. } => PolicyError::RangeRead {
                    prefix: prefix.clone(),
                    source: format!("key enumeration timed out after {after:?}").into(),
                },
                other => other,
            })?
            .map_err(|e| match e {
                StoreError::Closed => PolicyError::Closed,
                other => PolicyError::RangeRead {
                    prefix: prefix.clone(),
                    source: Box::new(other),
                },
            })?;

        let matched: Vec<String> = keys.into_iter().filter(|k| matcher.is_match(k)).collect();
        for key in &matched {
            self.request(Phase::RemoveFiltered, self.store.delete(key))
                .await?;
        }

        tracing::info!(
            sec,
            ptype,
            field_index,
            pattern = %matcher.as_str(),
            removed = matched.len(),
            "filtered policy removed"
        );
        Ok(matched.len())
    }

    /// Delete every rule under the namespace; returns the count removed.
    pub async fn clear_policy(&self) -> Result<u64> {
        let prefix = self.namespace.prefix();
        let removed = self
            .request(Phase::Clear, self.store.delete_prefix(&prefix))
            .await?;
        tracing::info!(namespace = %self.namespace.as_str(), removed, "policy cleared");
        Ok(removed)
    }

    /// Release the store connection. Safe to call more than once; every
    /// later operation fails with [`PolicyError::Closed`].
    pub fn close(&self) {
        if !self.store.is_closed() {
            self.store.close();
            tracing::debug!(namespace = %self.namespace.as_str(), "adapter closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }

    fn encode(&self, rule: &PolicyRule) -> Result<(String, Bytes)> {
        let stored = StoredRule::from_rule(rule);
        let value = Bytes::from(stored.to_bytes()?);
        Ok((self.namespace.entry_key(&stored.key), value))
    }

    /// Run one store request under the request timeout, mapping backend
    /// errors to `phase`.
    async fn request<T>(
        &self,
        phase: Phase,
        fut: impl Future<Output = std::result::Result<T, StoreError>>,
    ) -> Result<T> {
        self.bounded(phase, fut).await?.map_err(|e| match e {
            StoreError::Closed => PolicyError::Closed,
            other => PolicyError::Store {
                phase,
                source: Box::new(other),
            },
        })
    }

    async fn bounded<T>(&self, phase: Phase, fut: impl Future<Output = T>) -> Result<T> {
        if self.store.is_closed() {
            return Err(PolicyError::Closed);
        }
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| PolicyError::Timeout {
                phase,
                after: self.request_timeout,
            })
    }
}

impl Drop for PolicyAdapter {
    fn drop(&mut self) {
        if !self.store.is_closed() {
            tracing::warn!(
                namespace = %self.namespace.as_str(),
                "policy adapter dropped without close(); releasing store connection"
            );
            self.store.close();
        }
    }
}
