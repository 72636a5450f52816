// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource graph model: Cluster API kinds and the kwok provider kinds.

pub mod capi;
pub mod control_plane;
pub mod kwok_cluster;
pub mod machine;
pub mod simulation;

use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};
use std::fmt;

pub use capi::{ApiEndpoint, Cluster, Machine, ObjectReference};
pub use control_plane::KwokControlPlane;
pub use kwok_cluster::KwokCluster;
pub use machine::KwokMachine;
pub use simulation::SimulationConfig;

/// Namespaced name identifying one object, and so one reconcile request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of<K: Resource>(obj: &K) -> Self {
        Self::new(obj.namespace().unwrap_or_default(), obj.name_any())
    }

    /// Convert into the reference type used by kube-runtime watches
    pub fn into_ref<K>(self) -> ObjectRef<K>
    where
        K: Resource<DynamicType = ()>,
    {
        ObjectRef::new(&self.name).within(&self.namespace)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
