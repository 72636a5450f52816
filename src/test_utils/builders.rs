// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Object builders for tests.

use crate::constants::{annotations, labels};
use crate::types::capi::{Bootstrap, ClusterSpec, MachineSpec};
use crate::types::control_plane::KwokControlPlaneSpec;
use crate::types::kwok_cluster::KwokClusterSpec;
use crate::types::machine::KwokMachineSpec;
use crate::types::{Cluster, KwokCluster, KwokControlPlane, KwokMachine, Machine, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

fn meta(namespace: &str, name: &str, cluster_label: &str) -> ObjectMeta {
    let labels = (!cluster_label.is_empty()).then(|| {
        BTreeMap::from([(labels::CLUSTER_NAME.to_string(), cluster_label.to_string())])
    });
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels,
        ..Default::default()
    }
}

fn reference<K: Resource<DynamicType = ()>>(name: &str) -> ObjectReference {
    ObjectReference {
        api_version: Some(K::api_version(&()).to_string()),
        kind: K::kind(&()).to_string(),
        name: name.to_string(),
        namespace: None,
    }
}

pub fn cluster(namespace: &str, name: &str) -> Cluster {
    Cluster {
        metadata: meta(namespace, name, ""),
        spec: ClusterSpec::default(),
        status: None,
    }
}

/// A Cluster referencing a KwokControlPlane and a KwokCluster
pub fn cluster_with_refs(namespace: &str, name: &str, control_plane: &str, infra: &str) -> Cluster {
    let mut cluster = cluster(namespace, name);
    cluster.spec.control_plane_ref = Some(reference::<KwokControlPlane>(control_plane));
    cluster.spec.infrastructure_ref = Some(reference::<KwokCluster>(infra));
    cluster
}

pub fn kwok_cluster(namespace: &str, name: &str, cluster_label: &str) -> KwokCluster {
    KwokCluster {
        metadata: meta(namespace, name, cluster_label),
        spec: KwokClusterSpec::default(),
        status: None,
    }
}

pub fn control_plane(namespace: &str, name: &str, cluster_label: &str) -> KwokControlPlane {
    KwokControlPlane {
        metadata: meta(namespace, name, cluster_label),
        spec: KwokControlPlaneSpec::default(),
        status: None,
    }
}

/// A bootstrapped Machine whose infrastructure is the named KwokMachine
pub fn machine(namespace: &str, name: &str, cluster_name: &str, kwok_machine: &str) -> Machine {
    Machine {
        metadata: meta(namespace, name, cluster_name),
        spec: MachineSpec {
            cluster_name: cluster_name.to_string(),
            bootstrap: Bootstrap {
                data_secret_name: Some(format!("{}-bootstrap", name)),
            },
            infrastructure_ref: reference::<KwokMachine>(kwok_machine),
            provider_id: None,
        },
        status: None,
    }
}

pub fn kwok_machine(namespace: &str, name: &str, cluster_label: &str) -> KwokMachine {
    KwokMachine {
        metadata: meta(namespace, name, cluster_label),
        spec: KwokMachineSpec::default(),
        status: None,
    }
}

/// Add an owner reference pointing at `owner`
pub fn owned_by<K, O>(mut obj: K, owner: &O) -> K
where
    K: Resource,
    O: Resource<DynamicType = ()>,
{
    obj.meta_mut()
        .owner_references
        .get_or_insert_with(Vec::new)
        .push(OwnerReference {
            api_version: O::api_version(&()).to_string(),
            kind: O::kind(&()).to_string(),
            name: owner.name_any(),
            uid: owner.uid().unwrap_or_default(),
            ..Default::default()
        });
    obj
}

pub fn paused<K: Resource>(mut obj: K) -> K {
    obj.annotations_mut()
        .insert(annotations::PAUSED.to_string(), "true".to_string());
    obj
}

/// Mark an object as being deleted
pub fn deleting<K: Serialize + DeserializeOwned>(obj: K) -> K {
    let mut value = serde_json::to_value(obj).unwrap();
    value["metadata"]["deletionTimestamp"] = serde_json::json!("2026-01-01T00:00:00Z");
    serde_json::from_value(value).unwrap()
}
