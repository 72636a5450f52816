// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of the objects a resource is anchored to.

use super::meta::{cluster_name_label, owner_reference};
use super::store::ObjectStore;
use crate::constants::groups;
use crate::error::{ProviderError, Result};
use crate::types::{Cluster, Machine, ObjectKey};
use kube::{Resource, ResourceExt};
use tracing::debug;

/// The Cluster named in the object's owner references.
///
/// `None` when no such reference is set yet; an error when the reference
/// points at a Cluster that does not exist.
pub async fn get_owner_cluster<S, K>(store: &S, obj: &K) -> Result<Option<Cluster>>
where
    S: ObjectStore,
    K: Resource,
{
    get_owner(store, obj, "Cluster").await
}

/// The Machine named in the object's owner references
pub async fn get_owner_machine<S, K>(store: &S, obj: &K) -> Result<Option<Machine>>
where
    S: ObjectStore,
    K: Resource,
{
    get_owner(store, obj, "Machine").await
}

async fn get_owner<S, K, O>(store: &S, obj: &K, kind: &str) -> Result<Option<O>>
where
    S: ObjectStore,
    K: Resource,
    O: super::store::StoredObject,
{
    let Some(owner) = owner_reference(obj.meta(), groups::CLUSTER_API, kind) else {
        return Ok(None);
    };
    let key = ObjectKey::new(obj.namespace().unwrap_or_default(), &owner.name);
    match store.get::<O>(&key).await? {
        Some(found) => Ok(Some(found)),
        None => Err(ProviderError::MissingReference(format!(
            "owner {} {} not found",
            kind, key
        ))),
    }
}

/// The Cluster named by the `cluster.x-k8s.io/cluster-name` label, if both exist
pub async fn get_cluster_from_metadata<S, K>(store: &S, obj: &K) -> Result<Option<Cluster>>
where
    S: ObjectStore,
    K: Resource,
{
    let Some(name) = cluster_name_label(obj.meta()) else {
        debug!(object = %obj.name_any(), "No cluster-name label");
        return Ok(None);
    };
    store
        .get::<Cluster>(&ObjectKey::new(obj.namespace().unwrap_or_default(), name))
        .await
}
