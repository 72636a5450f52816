// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Declarative store seam: namespaced get, create, patch and delete.

use crate::error::Result;
use crate::types::ObjectKey;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use tracing::{debug, instrument};

/// Any namespaced object the provider reads or writes
pub trait StoredObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> StoredObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Read and write access to the declarative store.
///
/// Patches are JSON merge patches. A patch carrying `metadata.resourceVersion`
/// fails with a 409 conflict when the stored object has moved on.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Fetch an object, `None` when it does not exist
    async fn get<K: StoredObject>(&self, key: &ObjectKey) -> Result<Option<K>>;

    async fn create<K: StoredObject>(&self, obj: &K) -> Result<K>;

    async fn patch<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<K>;

    async fn patch_status<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<K>;

    /// Request deletion; an object that is already gone is not an error
    async fn delete<K: StoredObject>(&self, key: &ObjectKey) -> Result<()>;
}

/// [`ObjectStore`] backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K: StoredObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    #[instrument(skip(self), fields(kind = %K::kind(&())))]
    async fn get<K: StoredObject>(&self, key: &ObjectKey) -> Result<Option<K>> {
        Ok(self.api::<K>(&key.namespace).get_opt(&key.name).await?)
    }

    #[instrument(skip(self, obj), fields(kind = %K::kind(&()), name = %obj.name_any()))]
    async fn create<K: StoredObject>(&self, obj: &K) -> Result<K> {
        let namespace = obj.namespace().unwrap_or_default();
        Ok(self
            .api::<K>(&namespace)
            .create(&PostParams::default(), obj)
            .await?)
    }

    #[instrument(skip(self, patch), fields(kind = %K::kind(&())))]
    async fn patch<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<K> {
        debug!(%patch, "Patching object");
        Ok(self
            .api::<K>(&key.namespace)
            .patch(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }

    #[instrument(skip(self, patch), fields(kind = %K::kind(&())))]
    async fn patch_status<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<K> {
        debug!(%patch, "Patching status");
        Ok(self
            .api::<K>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(patch))
            .await?)
    }

    #[instrument(skip(self), fields(kind = %K::kind(&())))]
    async fn delete<K: StoredObject>(&self, key: &ObjectKey) -> Result<()> {
        match self
            .api::<K>(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
