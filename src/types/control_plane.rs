// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::{ApiEndpoint, SimulationConfig};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// The simulated apiserver of a cluster
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "controlplane.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "KwokControlPlane"
)]
#[kube(namespaced)]
#[kube(status = "KwokControlPlaneStatus")]
#[serde(rename_all = "camelCase")]
pub struct KwokControlPlaneSpec {
    #[serde(default)]
    pub control_plane_endpoint: ApiEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_config: Option<SimulationConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KwokControlPlaneStatus {
    /// Set once the backend cluster was created, never reset afterwards
    #[serde(default)]
    pub initialized: bool,
    #[serde(default)]
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_duration: Option<String>,
}

impl KwokControlPlane {
    pub fn is_initialized(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.initialized)
    }

    pub fn has_endpoint(&self) -> bool {
        !self.spec.control_plane_endpoint.is_zero()
    }

    pub fn status_mut(&mut self) -> &mut KwokControlPlaneStatus {
        self.status.get_or_insert_with(Default::default)
    }
}
