// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! KwokControlPlane controller: owns the simulated cluster's lifecycle.

use super::{error_policy, watcher_config, Context, ReconcileResult};
use crate::constants::finalizers;
use crate::error::{ProviderError, Result};
use crate::kubernetes::meta::{add_finalizer, is_deleting, is_paused, remove_finalizer};
use crate::kubernetes::owners::get_owner_cluster;
use crate::kubernetes::{KubeStore, ObjectStore};
use crate::mapping;
use crate::scope::{Scope, ScopeParams, ScopeTarget};
use crate::services::{delete_chain, reconcile_chain, ClusterService, ScopedReconciler};
use crate::types::{Cluster, KwokCluster, KwokControlPlane, ObjectKey};
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::Store;
use kube::runtime::Controller;
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, info_span, instrument, warn};

pub struct ControlPlaneReconciler {
    client: Client,
    ctx: Arc<Context<KubeStore>>,
    clusters: Store<Cluster>,
}

impl ControlPlaneReconciler {
    pub fn new(client: Client, ctx: Arc<Context<KubeStore>>, clusters: Store<Cluster>) -> Self {
        Self {
            client,
            ctx,
            clusters,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let wc = watcher_config(&self.ctx.config);
        let control_planes: Api<KwokControlPlane> = Api::all(self.client.clone());
        let kwok_clusters: Api<KwokCluster> = Api::all(self.client.clone());
        let clusters: Api<Cluster> = Api::all(self.client.clone());
        let cache = self.clusters;

        Controller::new(control_planes, wc.clone())
            .with_config(
                controller::Config::default().concurrency(self.ctx.config.control_plane_concurrency),
            )
            .watches(kwok_clusters, wc.clone(), move |infra| {
                mapping::kwok_cluster_to_control_plane(&cache, &infra).map(ObjectKey::into_ref)
            })
            .watches(clusters, wc, |cluster| {
                mapping::cluster_to_control_plane(&cluster).map(ObjectKey::into_ref)
            })
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled control plane: {}", obj),
                    Err(e) => warn!("Control plane reconciliation error: {}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(
    control_plane: Arc<KwokControlPlane>,
    ctx: Arc<Context<KubeStore>>,
) -> Result<Action> {
    let key = ObjectKey::of(control_plane.as_ref());
    let result = reconcile_control_plane(&key, &ctx).await?;
    Ok(result.into_action(&ctx.config))
}

/// One pass over a KwokControlPlane
#[instrument(skip(ctx), fields(control_plane = %key))]
pub async fn reconcile_control_plane<S: ObjectStore>(
    key: &ObjectKey,
    ctx: &Context<S>,
) -> Result<ReconcileResult> {
    let store = ctx.store.as_ref();

    let Some(control_plane) = store.get::<KwokControlPlane>(key).await? else {
        debug!("KwokControlPlane not found");
        return Ok(ReconcileResult::done());
    };

    let Some(cluster) = get_owner_cluster(store, &control_plane).await? else {
        info!("Waiting for Cluster Controller to set OwnerRef on KwokControlPlane");
        return Ok(ReconcileResult::requeue());
    };

    let infra_ref = cluster.spec.infrastructure_ref.as_ref().ok_or_else(|| {
        ProviderError::MissingReference(format!(
            "cluster {} has no infrastructureRef",
            cluster.name_any()
        ))
    })?;
    let infra_key = cluster.resolve(infra_ref);
    let kwok_cluster = store
        .get::<KwokCluster>(&infra_key)
        .await?
        .ok_or_else(|| ProviderError::MissingReference(format!("KwokCluster {}", infra_key)))?;

    if is_paused(&cluster, &control_plane) {
        info!("KwokControlPlane or linked Cluster is marked as paused, not reconciling");
        return Ok(ReconcileResult::done());
    }

    let span = info_span!(
        "scope",
        cluster = %cluster.name_any(),
        control_plane = %control_plane.name_any(),
    );
    let deleting = is_deleting(&control_plane);
    let mut scope = Scope::new(ScopeParams {
        store: ctx.store.clone(),
        cluster: Some(cluster),
        kwok_cluster: Some(kwok_cluster),
        control_plane: Some(control_plane),
        target: ScopeTarget::ControlPlane,
        default_work_dir: ctx.config.default_work_dir.clone(),
        span: Some(span),
    })?;

    let result = if deleting {
        reconcile_delete(&mut scope, ctx).await
    } else {
        reconcile_normal(&mut scope, ctx).await
    };
    scope.close_with(result).await
}

async fn reconcile_normal<S: ObjectStore>(
    scope: &mut Scope<S>,
    ctx: &Context<S>,
) -> Result<ReconcileResult> {
    if add_finalizer(scope.control_plane_mut()?, finalizers::CONTROL_PLANE) {
        scope.patch_object().await?;
    }

    let service = ClusterService::new(&ctx.runtimes, ctx.config.kube_apiserver_port);
    let steps: [&dyn ScopedReconciler<S>; 1] = [&service];
    reconcile_chain(&steps, scope).await
}

async fn reconcile_delete<S: ObjectStore>(
    scope: &mut Scope<S>,
    ctx: &Context<S>,
) -> Result<ReconcileResult> {
    info!("Deleting simulated cluster");

    let service = ClusterService::new(&ctx.runtimes, ctx.config.kube_apiserver_port);
    let steps: [&dyn ScopedReconciler<S>; 1] = [&service];
    let result = delete_chain(&steps, scope).await?;
    if result.is_requeue() {
        return Ok(result);
    }

    remove_finalizer(scope.control_plane_mut()?, finalizers::CONTROL_PLANE);
    Ok(ReconcileResult::done())
}
