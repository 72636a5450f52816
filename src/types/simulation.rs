// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Knobs for simulating real-world provider behaviour.

use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    #[serde(default)]
    pub reconcile: ReconcileSimulation,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSimulation {
    /// Extra time a reconcile pass takes, e.g. `50ms` or `1m 30s`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<String>,
}

impl SimulationConfig {
    pub fn with_latency(latency: impl Into<String>) -> Self {
        Self {
            reconcile: ReconcileSimulation {
                latency: Some(latency.into()),
            },
        }
    }
}

/// Parse the reconcile latency of an optional simulation config.
///
/// Returns `None` when unset or zero.
pub fn reconcile_latency(config: Option<&SimulationConfig>) -> Result<Option<Duration>> {
    let Some(raw) = config.and_then(|c| c.reconcile.latency.as_deref()) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let latency = humantime::parse_duration(raw).map_err(|e| {
        ProviderError::SimulationConfigError(format!("invalid reconcile latency {:?}: {}", raw, e))
    })?;
    Ok(Some(latency).filter(|d| !d.is_zero()))
}

/// Render a pass duration for `status.lastReconcileDuration`, truncated to milliseconds
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = Duration::from_millis(elapsed.as_millis() as u64);
    humantime::format_duration(millis).to_string()
}
