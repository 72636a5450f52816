// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Snapshot based merge patches.
//!
//! A [`PatchHelper`] remembers how an object looked when it was read. Persisting
//! sends only what changed since then, guarded by the object's resourceVersion,
//! as a main patch followed by a status subresource patch.

use super::store::{ObjectStore, StoredObject};
use crate::error::Result;
use crate::types::ObjectKey;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use tracing::debug;

pub struct PatchHelper<K> {
    base: Value,
    _kind: PhantomData<fn() -> K>,
}

impl<K: StoredObject> PatchHelper<K> {
    pub fn new(obj: &K) -> Result<Self> {
        Ok(Self {
            base: serde_json::to_value(obj)?,
            _kind: PhantomData,
        })
    }

    /// Whether `obj` differs from the last persisted snapshot
    pub fn has_changes(&self, obj: &K) -> Result<bool> {
        Ok(serde_json::to_value(obj)? != self.base)
    }

    /// Persist the changes made to `obj` since the snapshot.
    ///
    /// `obj` receives the new resourceVersion and becomes the next snapshot.
    pub async fn patch<S: ObjectStore>(&mut self, store: &S, obj: &mut K) -> Result<()> {
        let current = serde_json::to_value(&*obj)?;
        let key = ObjectKey::of(obj);

        let mut base_main = self.base.clone();
        let mut current_main = current.clone();
        let base_status = take_field(&mut base_main, "status");
        let current_status = take_field(&mut current_main, "status");

        if let Some(mut diff) = merge_diff(&base_main, &current_main) {
            set_resource_version(&mut diff, obj.meta().resource_version.as_deref());
            let updated: K = store.patch(&key, &diff).await?;
            obj.meta_mut().resource_version = updated.meta().resource_version.clone();
        }

        if let Some(status) = merge_diff(&base_status, &current_status) {
            let mut diff = Value::Object(Map::from_iter([("status".to_string(), status)]));
            set_resource_version(&mut diff, obj.meta().resource_version.as_deref());
            let updated: K = store.patch_status(&key, &diff).await?;
            obj.meta_mut().resource_version = updated.meta().resource_version.clone();
        }

        debug!(object = %key, "Object persisted");
        self.base = serde_json::to_value(&*obj)?;
        Ok(())
    }
}

fn take_field(value: &mut Value, field: &str) -> Value {
    value
        .as_object_mut()
        .and_then(|obj| obj.remove(field))
        .unwrap_or(Value::Null)
}

fn set_resource_version(patch: &mut Value, resource_version: Option<&str>) {
    let Some(resource_version) = resource_version else {
        return;
    };
    if let Value::Object(root) = patch {
        let metadata = root
            .entry("metadata")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(metadata) = metadata {
            metadata.insert(
                "resourceVersion".to_string(),
                Value::String(resource_version.to_string()),
            );
        }
    }
}

/// JSON merge patch turning `before` into `after`, `None` when they are equal.
///
/// Objects are diffed key by key, removed keys become `null`, anything else
/// (arrays included) is replaced wholesale.
pub fn merge_diff(before: &Value, after: &Value) -> Option<Value> {
    if before == after {
        return None;
    }
    match (before, after) {
        (Value::Object(before), Value::Object(after)) => {
            let mut diff = Map::new();
            for (key, new) in after {
                match before.get(key) {
                    Some(old) => {
                        if let Some(changed) = merge_diff(old, new) {
                            diff.insert(key.clone(), changed);
                        }
                    }
                    None => {
                        diff.insert(key.clone(), new.clone());
                    }
                }
            }
            for key in before.keys() {
                if !after.contains_key(key) {
                    diff.insert(key.clone(), Value::Null);
                }
            }
            (!diff.is_empty()).then_some(Value::Object(diff))
        }
        _ => Some(after.clone()),
    }
}
