// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory [`ObjectStore`] with the API server behaviour the controllers rely on.

use super::Journal;
use crate::error::{ProviderError, Result};
use crate::kubernetes::patch::merge_diff;
use crate::kubernetes::{ObjectStore, StoredObject};
use crate::types::ObjectKey;
use async_trait::async_trait;
use kube::core::ErrorResponse;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

type StoreKey = (String, ObjectKey);

#[derive(Default)]
struct State {
    objects: BTreeMap<StoreKey, Value>,
    next_version: u64,
    writes: usize,
    failing_status: HashSet<String>,
    /// Per kind, the number of patches left until one is rejected with a conflict
    pending_conflicts: HashMap<String, usize>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    state: Arc<Mutex<State>>,
    journal: Journal,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    /// Seed an object, returning it as stored (uid and resourceVersion assigned)
    pub fn insert<K: StoredObject>(&self, obj: K) -> K {
        let mut value = serde_json::to_value(&obj).unwrap();
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        let metadata = metadata_mut(&mut value);
        metadata
            .entry("uid")
            .or_insert_with(|| Value::String(format!("uid-{}", version)));
        metadata.insert("resourceVersion".to_string(), Value::String(version.to_string()));
        state
            .objects
            .insert(store_key::<K>(&ObjectKey::of(&obj)), value.clone());
        serde_json::from_value(value).unwrap()
    }

    pub fn fetch<K: StoredObject>(&self, key: &ObjectKey) -> Option<K> {
        let state = self.state.lock().unwrap();
        state
            .objects
            .get(&store_key::<K>(key))
            .map(|v| serde_json::from_value(v.clone()).unwrap())
    }

    pub fn contains<K: StoredObject>(&self, key: &ObjectKey) -> bool {
        self.fetch::<K>(key).is_some()
    }

    /// Simulate a concurrent writer by bumping the stored resourceVersion
    pub fn touch<K: StoredObject>(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let version = state.bump();
        if let Some(value) = state.objects.get_mut(&store_key::<K>(key)) {
            metadata_mut(value).insert(
                "resourceVersion".to_string(),
                Value::String(version.to_string()),
            );
        }
    }

    /// Make every status write for the kind fail with a server error
    pub fn fail_status_patches<K: StoredObject>(&self) {
        self.state
            .lock()
            .unwrap()
            .failing_status
            .insert(K::kind(&()).to_string());
    }

    /// Reject the `nth` next patch (main or status) of the kind with a 409, once
    pub fn conflict_on_nth_patch<K: StoredObject>(&self, nth: usize) {
        self.state
            .lock()
            .unwrap()
            .pending_conflicts
            .insert(K::kind(&()).to_string(), nth);
    }

    /// Number of accepted create, patch and delete calls
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }
}

impl State {
    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn get<K: StoredObject>(&self, key: &ObjectKey) -> Result<Option<K>> {
        Ok(self.fetch(key))
    }

    async fn create<K: StoredObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj);
        if self.contains::<K>(&key) {
            return Err(api_error(409, "AlreadyExists"));
        }
        let created = self.insert(obj.clone());
        self.state.lock().unwrap().writes += 1;
        self.record(format!("create {} {}", K::kind(&()), key));
        Ok(created)
    }

    async fn patch<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<K> {
        let mut patch = patch.clone();
        if let Value::Object(root) = &mut patch {
            root.remove("status");
        }
        let (before, after) = self.apply::<K>(key, &patch)?;
        let finalizers_changed = merge_diff(&finalizers(&before), &finalizers(&after)).is_some();
        self.record(format!("patch {} {}", K::kind(&()), key));
        if finalizers_changed {
            self.record(format!(
                "finalizers {} {} {}",
                K::kind(&()),
                key,
                finalizers(&after)
            ));
        }
        self.collect_garbage::<K>(key);
        Ok(serde_json::from_value(after)?)
    }

    async fn patch_status<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<K> {
        if self
            .state
            .lock()
            .unwrap()
            .failing_status
            .contains(&K::kind(&()).to_string())
        {
            return Err(api_error(500, "InternalError"));
        }
        let mut status_only = Map::new();
        if let Some(metadata) = patch.get("metadata") {
            status_only.insert("metadata".to_string(), metadata.clone());
        }
        if let Some(status) = patch.get("status") {
            status_only.insert("status".to_string(), status.clone());
        }
        let (_, after) = self.apply::<K>(key, &Value::Object(status_only))?;
        self.record(format!("status {} {}", K::kind(&()), key));
        Ok(serde_json::from_value(after)?)
    }

    async fn delete<K: StoredObject>(&self, key: &ObjectKey) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let id = store_key::<K>(key);
        let Some(value) = state.objects.get(&id).cloned() else {
            return Ok(());
        };
        state.writes += 1;
        if finalizers(&value).as_array().is_some_and(|f| !f.is_empty()) {
            let version = state.bump();
            if let Some(stored) = state.objects.get_mut(&id) {
                let metadata = metadata_mut(stored);
                metadata
                    .entry("deletionTimestamp")
                    .or_insert_with(|| Value::String("2026-01-01T00:00:00Z".to_string()));
                metadata.insert(
                    "resourceVersion".to_string(),
                    Value::String(version.to_string()),
                );
            }
        } else {
            state.objects.remove(&id);
        }
        drop(state);
        self.record(format!("delete {} {}", K::kind(&()), key));
        Ok(())
    }
}

impl FakeStore {
    fn apply<K: StoredObject>(&self, key: &ObjectKey, patch: &Value) -> Result<(Value, Value)> {
        let mut state = self.state.lock().unwrap();
        let id = store_key::<K>(key);
        let Some(before) = state.objects.get(&id).cloned() else {
            return Err(api_error(404, "NotFound"));
        };

        let kind = K::kind(&()).to_string();
        if let Some(remaining) = state.pending_conflicts.get_mut(&kind) {
            *remaining -= 1;
            if *remaining == 0 {
                state.pending_conflicts.remove(&kind);
                return Err(api_error(409, "Conflict"));
            }
        }

        let expected = patch
            .get("metadata")
            .and_then(|m| m.get("resourceVersion"))
            .and_then(Value::as_str);
        let stored = before
            .get("metadata")
            .and_then(|m| m.get("resourceVersion"))
            .and_then(Value::as_str);
        if expected.is_some() && expected != stored {
            return Err(api_error(409, "Conflict"));
        }

        let mut after = before.clone();
        json_patch::merge(&mut after, patch);
        let version = state.bump();
        metadata_mut(&mut after).insert(
            "resourceVersion".to_string(),
            Value::String(version.to_string()),
        );
        state.objects.insert(id, after.clone());
        state.writes += 1;
        Ok((before, after))
    }

    /// Objects marked for deletion go away once their last finalizer is removed
    fn collect_garbage<K: StoredObject>(&self, key: &ObjectKey) {
        let mut state = self.state.lock().unwrap();
        let id = store_key::<K>(key);
        let Some(value) = state.objects.get(&id) else {
            return;
        };
        let deleting = value
            .get("metadata")
            .is_some_and(|m| m.get("deletionTimestamp").is_some_and(|t| !t.is_null()));
        let finalized = finalizers(value).as_array().map_or(true, |f| f.is_empty());
        if deleting && finalized {
            state.objects.remove(&id);
        }
    }
}

fn store_key<K: StoredObject>(key: &ObjectKey) -> StoreKey {
    (K::kind(&()).to_string(), key.clone())
}

fn metadata_mut(value: &mut Value) -> &mut Map<String, Value> {
    let root = value.as_object_mut().expect("object");
    let metadata = root
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    metadata.as_object_mut().expect("metadata object")
}

fn finalizers(value: &Value) -> Value {
    value
        .get("metadata")
        .and_then(|m| m.get("finalizers"))
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

fn api_error(code: u16, reason: &str) -> ProviderError {
    ProviderError::KubeError(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: format!("fake store: {}", reason),
        reason: reason.to_string(),
        code,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::builders::kwok_cluster;
    use crate::types::KwokCluster;
    use serde_json::json;

    #[tokio::test]
    async fn test_merge_patch_removes_null_fields() {
        let store = FakeStore::new();
        let mut infra = kwok_cluster("default", "infra", "sim");
        infra.spec.runtime = Some("podman".to_string());
        store.insert(infra);
        let key = ObjectKey::new("default", "infra");

        let patched: KwokCluster = store
            .patch(&key, &json!({"spec": {"runtime": null, "workingDir": "/srv"}}))
            .await
            .unwrap();

        assert_eq!(patched.spec.runtime, None);
        assert_eq!(patched.spec.working_dir.as_deref(), Some("/srv"));
    }

    #[tokio::test]
    async fn test_nth_patch_conflicts_once() {
        let store = FakeStore::new();
        store.insert(kwok_cluster("default", "infra", "sim"));
        let key = ObjectKey::new("default", "infra");
        store.conflict_on_nth_patch::<KwokCluster>(2);
        let patch = json!({"spec": {"runtime": "kind"}});

        assert!(store.patch::<KwokCluster>(&key, &patch).await.is_ok());
        let err = store.patch::<KwokCluster>(&key, &patch).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(store.patch::<KwokCluster>(&key, &patch).await.is_ok());
    }
}
