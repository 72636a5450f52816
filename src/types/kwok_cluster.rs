// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::{ApiEndpoint, SimulationConfig};
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Infrastructure for a simulated cluster: where and how kwok runs it
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "KwokCluster"
)]
#[kube(namespaced)]
#[kube(status = "KwokClusterStatus")]
#[serde(rename_all = "camelCase")]
pub struct KwokClusterSpec {
    /// Backend runtime name, `docker` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    /// Address the simulated apiserver listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub control_plane_endpoint: ApiEndpoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_config: Option<SimulationConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KwokClusterStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_duration: Option<String>,
}

impl KwokCluster {
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.ready)
    }

    pub fn status_mut(&mut self) -> &mut KwokClusterStatus {
        self.status.get_or_insert_with(Default::default)
    }
}
