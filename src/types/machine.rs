// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::SimulationConfig;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// A simulated node backing a Cluster API Machine
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(
    group = "infrastructure.cluster.x-k8s.io",
    version = "v1alpha1",
    kind = "KwokMachine"
)]
#[kube(namespaced)]
#[kube(status = "KwokMachineStatus")]
#[serde(rename_all = "camelCase")]
pub struct KwokMachineSpec {
    #[serde(rename = "providerID", skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_config: Option<SimulationConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KwokMachineStatus {
    #[serde(default)]
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reconcile_duration: Option<String>,
}

impl KwokMachine {
    /// A machine with failure details is terminal and left alone
    pub fn has_failed(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.failure_reason.is_some() || s.failure_message.is_some())
    }

    pub fn status_mut(&mut self) -> &mut KwokMachineStatus {
        self.status.get_or_insert_with(Default::default)
    }
}
