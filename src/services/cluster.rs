// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle of the simulated cluster behind a KwokControlPlane.

use super::{kubeconfig, ReconcileResult, ScopedReconciler};
use crate::error::{ProviderError, Result};
use crate::kubernetes::ObjectStore;
use crate::runtime::{KwokctlConfiguration, RuntimeError, RuntimeRegistry};
use crate::scope::Scope;
use crate::types::simulation::{format_elapsed, reconcile_latency};
use crate::types::ApiEndpoint;
use async_trait::async_trait;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, info};

pub struct ClusterService<'a> {
    runtimes: &'a RuntimeRegistry,
    /// Fixed apiserver port, 0 allocates a free one per cluster
    apiserver_port: u16,
}

impl<'a> ClusterService<'a> {
    pub fn new(runtimes: &'a RuntimeRegistry, apiserver_port: u16) -> Self {
        Self {
            runtimes,
            apiserver_port,
        }
    }

    async fn allocate_port(&self, cluster: &str, address: &str) -> Result<u16> {
        if self.apiserver_port != 0 {
            return Ok(self.apiserver_port);
        }
        let listener = TcpListener::bind((address, 0))
            .await
            .map_err(|e| ProviderError::backend("allocate port", cluster, RuntimeError::Io(e)))?;
        listener
            .local_addr()
            .map(|addr| addr.port())
            .map_err(|e| ProviderError::backend("allocate port", cluster, RuntimeError::Io(e)))
    }
}

/// Publish the apiserver address unless the ControlPlane already carries one
fn ensure_endpoint<S: ObjectStore>(scope: &mut Scope<S>, port: u16) -> Result<()> {
    let host = scope.cluster_address().to_string();
    let control_plane = scope.control_plane_mut()?;
    if control_plane.spec.control_plane_endpoint.is_zero() {
        control_plane.spec.control_plane_endpoint = ApiEndpoint::new(host, i32::from(port));
    }
    Ok(())
}

#[async_trait]
impl<S: ObjectStore> ScopedReconciler<S> for ClusterService<'_> {
    async fn reconcile(&self, scope: &mut Scope<S>) -> Result<ReconcileResult> {
        let started = Instant::now();
        let name = scope.name().to_string();
        let runtime = scope.runtime().to_string();
        let mut handle = self.runtimes.build(&runtime, &name, &scope.work_dir())?;

        let existing = match handle.config().await {
            Ok(config) => Some(config),
            Err(e) => {
                debug!(cluster = %name, reason = %e, "Simulated cluster not configured");
                None
            }
        };

        if let Some(config) = existing {
            if handle.ready().await {
                debug!(cluster = %name, "Simulated cluster is ready");
                // A previous pass may have started the cluster without persisting its result
                ensure_endpoint(scope, config.options.kube_apiserver_port)?;
                let status = scope.control_plane_mut()?.status_mut();
                status.initialized = true;
                status.ready = true;
                return Ok(ReconcileResult::done());
            }
            debug!(cluster = %name, "Simulated cluster exists but is not ready");
        } else {
            info!(cluster = %name, runtime = %runtime, "Creating simulated cluster");
            let port = self.allocate_port(&name, scope.cluster_address()).await?;
            handle.set_config(KwokctlConfiguration::new(&runtime, port));
            handle
                .save()
                .await
                .map_err(|e| ProviderError::backend("save", &name, e))?;
            handle
                .install()
                .await
                .map_err(|e| ProviderError::backend("install", &name, e))?;
        }

        let config = handle
            .config()
            .await
            .map_err(|e| ProviderError::backend("config", &name, e))?;
        let port = config.options.kube_apiserver_port;
        ensure_endpoint(scope, port)?;

        kubeconfig::ensure_secret(scope, port).await?;

        handle
            .up()
            .await
            .map_err(|e| ProviderError::backend("up", &name, e))?;

        let control_plane = scope.control_plane_mut()?;
        let status = control_plane.status_mut();
        status.initialized = true;
        status.ready = true;
        status.last_reconcile_duration = Some(format_elapsed(started.elapsed()));
        info!(cluster = %name, endpoint = %control_plane.spec.control_plane_endpoint, "Simulated cluster started");

        if let Some(latency) = reconcile_latency(control_plane.spec.simulation_config.as_ref())? {
            debug!(cluster = %name, ?latency, "Simulating reconcile latency");
            tokio::time::sleep(latency).await;
        }

        Ok(ReconcileResult::done())
    }

    async fn delete(&self, scope: &mut Scope<S>) -> Result<ReconcileResult> {
        let name = scope.name().to_string();
        let Some(handle) = self
            .runtimes
            .load(scope.runtime(), &name, &scope.work_dir())
            .await?
        else {
            info!(cluster = %name, "Simulated cluster already deleted");
            return Ok(ReconcileResult::done());
        };

        handle
            .down()
            .await
            .map_err(|e| ProviderError::backend("down", &name, e))?;
        handle
            .uninstall()
            .await
            .map_err(|e| ProviderError::backend("uninstall", &name, e))?;

        info!(cluster = %name, "Simulated cluster deleted");
        Ok(ReconcileResult::done())
    }
}
