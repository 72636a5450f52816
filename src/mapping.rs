// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Maps watch events on secondary objects to reconcile requests for primaries.
//!
//! Every mapper returns at most one request and returns `None` as soon as a
//! precondition fails.

use crate::constants::groups;
use crate::kubernetes::meta::{has_paused_annotation, is_deleting, owner_reference};
use crate::types::{Cluster, KwokCluster, KwokControlPlane, KwokMachine, Machine, ObjectKey, ObjectReference};
use kube::runtime::reflector::Store;
use kube::{Resource, ResourceExt};
use std::sync::Arc;

/// Read access to cached Clusters
pub trait OwnerLookup {
    fn cluster(&self, key: &ObjectKey) -> Option<Arc<Cluster>>;
}

impl OwnerLookup for Store<Cluster> {
    fn cluster(&self, key: &ObjectKey) -> Option<Arc<Cluster>> {
        self.get(&key.clone().into_ref())
    }
}

fn kind_of<K: Resource<DynamicType = ()>>() -> String {
    K::kind(&()).to_string()
}

fn map_secondary<O, L, F>(obj: &O, ready: bool, lookup: &L, cross_reference: F) -> Option<ObjectKey>
where
    O: Resource,
    L: OwnerLookup,
    F: Fn(&Cluster) -> Option<&ObjectReference>,
{
    if is_deleting(obj) || !ready {
        return None;
    }
    let owner = owner_reference(obj.meta(), groups::CLUSTER_API, "Cluster")?;
    let cluster = lookup.cluster(&ObjectKey::new(obj.namespace().unwrap_or_default(), &owner.name))?;
    let reference = cross_reference(&*cluster)?;
    Some(cluster.resolve(reference))
}

/// A ready KwokCluster wakes the KwokControlPlane of its Cluster
pub fn kwok_cluster_to_control_plane<L: OwnerLookup>(lookup: &L, infra: &KwokCluster) -> Option<ObjectKey> {
    let kind = kind_of::<KwokControlPlane>();
    map_secondary(infra, infra.is_ready(), lookup, |cluster| {
        cluster.control_plane_ref_of_kind(&kind)
    })
}

/// A KwokControlPlane with an endpoint wakes the KwokCluster of its Cluster
pub fn control_plane_to_kwok_cluster<L: OwnerLookup>(lookup: &L, control_plane: &KwokControlPlane) -> Option<ObjectKey> {
    let kind = kind_of::<KwokCluster>();
    map_secondary(control_plane, control_plane.has_endpoint(), lookup, |cluster| {
        cluster.infrastructure_ref_of_kind(&kind)
    })
}

fn cluster_is_active(cluster: &Cluster) -> bool {
    !is_deleting(cluster) && !cluster.spec.paused && !has_paused_annotation(&cluster.metadata)
}

/// Cluster changes reach its KwokControlPlane once the infrastructure is ready
pub fn cluster_to_control_plane(cluster: &Cluster) -> Option<ObjectKey> {
    if !cluster_is_active(cluster) || !cluster.infrastructure_ready() {
        return None;
    }
    let reference = cluster.control_plane_ref_of_kind(&kind_of::<KwokControlPlane>())?;
    Some(cluster.resolve(reference))
}

pub fn cluster_to_kwok_cluster(cluster: &Cluster) -> Option<ObjectKey> {
    if !cluster_is_active(cluster) {
        return None;
    }
    let reference = cluster.infrastructure_ref_of_kind(&kind_of::<KwokCluster>())?;
    Some(cluster.resolve(reference))
}

/// A Machine wakes the KwokMachine it names as infrastructure
pub fn machine_to_kwok_machine(machine: &Machine) -> Option<ObjectKey> {
    let reference = &machine.spec.infrastructure_ref;
    if reference.kind != kind_of::<KwokMachine>() || reference.name.is_empty() {
        return None;
    }
    Some(reference.key_within(&machine.namespace().unwrap_or_default()))
}
