// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! KwokCluster controller: publishes the control plane endpoint as infrastructure
//! and keeps the runtime settings around until the control plane is gone.

use super::{error_policy, watcher_config, Context, ReconcileResult};
use crate::constants::finalizers;
use crate::error::{ProviderError, Result};
use crate::kubernetes::meta::{add_finalizer, is_deleting, is_paused, remove_finalizer};
use crate::kubernetes::owners::get_owner_cluster;
use crate::kubernetes::{KubeStore, ObjectStore};
use crate::mapping;
use crate::scope::{Scope, ScopeParams, ScopeTarget};
use crate::types::simulation::{format_elapsed, reconcile_latency};
use crate::types::{Cluster, KwokCluster, KwokControlPlane, ObjectKey};
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::reflector::Store;
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, instrument, warn};

pub struct KwokClusterReconciler {
    client: Client,
    ctx: Arc<Context<KubeStore>>,
    clusters: Store<Cluster>,
}

impl KwokClusterReconciler {
    pub fn new(client: Client, ctx: Arc<Context<KubeStore>>, clusters: Store<Cluster>) -> Self {
        Self {
            client,
            ctx,
            clusters,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let wc = watcher_config(&self.ctx.config);
        let kwok_clusters: Api<KwokCluster> = Api::all(self.client.clone());
        let control_planes: Api<KwokControlPlane> = Api::all(self.client.clone());
        let clusters: Api<Cluster> = Api::all(self.client.clone());
        let cache = self.clusters;

        Controller::new(kwok_clusters, wc.clone())
            .with_config(controller::Config::default().concurrency(self.ctx.config.cluster_concurrency))
            .watches(control_planes, wc.clone(), move |control_plane| {
                mapping::control_plane_to_kwok_cluster(&cache, &control_plane).map(ObjectKey::into_ref)
            })
            .watches(clusters, wc, |cluster| {
                mapping::cluster_to_kwok_cluster(&cluster).map(ObjectKey::into_ref)
            })
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled kwok cluster: {}", obj),
                    Err(e) => warn!("KwokCluster reconciliation error: {}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(kwok_cluster: Arc<KwokCluster>, ctx: Arc<Context<KubeStore>>) -> Result<Action> {
    let key = ObjectKey::of(kwok_cluster.as_ref());
    let result = reconcile_kwok_cluster(&key, &ctx).await?;
    Ok(result.into_action(&ctx.config))
}

/// One pass over a KwokCluster
#[instrument(skip(ctx), fields(kwok_cluster = %key))]
pub async fn reconcile_kwok_cluster<S: ObjectStore>(
    key: &ObjectKey,
    ctx: &Context<S>,
) -> Result<ReconcileResult> {
    let started = Instant::now();
    let store = ctx.store.as_ref();

    let Some(kwok_cluster) = store.get::<KwokCluster>(key).await? else {
        debug!("KwokCluster not found");
        return Ok(ReconcileResult::done());
    };

    let Some(cluster) = get_owner_cluster(store, &kwok_cluster).await? else {
        info!("Waiting for Cluster Controller to set OwnerRef on KwokCluster");
        return Ok(ReconcileResult::requeue());
    };

    // Runs concurrently with the pass, awaited before returning
    let latency = reconcile_latency(kwok_cluster.spec.simulation_config.as_ref())?
        .map(tokio::time::sleep);

    if is_paused(&cluster, &kwok_cluster) {
        info!("KwokCluster or linked Cluster is marked as paused, not reconciling");
        return Ok(ReconcileResult::done());
    }

    let result = reconcile_owned(cluster, kwok_cluster, ctx, started).await;

    if let Some(latency) = latency {
        latency.await;
    }
    result
}

async fn reconcile_owned<S: ObjectStore>(
    cluster: Cluster,
    kwok_cluster: KwokCluster,
    ctx: &Context<S>,
    started: Instant,
) -> Result<ReconcileResult> {
    let span = info_span!(
        "scope",
        cluster = %cluster.name_any(),
        kwok_cluster = %kwok_cluster.name_any(),
    );
    let deleting = is_deleting(&kwok_cluster);
    let mut scope = Scope::new(ScopeParams {
        store: ctx.store.clone(),
        cluster: Some(cluster),
        kwok_cluster: Some(kwok_cluster),
        control_plane: None,
        target: ScopeTarget::InfraCluster,
        default_work_dir: ctx.config.default_work_dir.clone(),
        span: Some(span),
    })?;

    let result = if deleting {
        reconcile_delete(&mut scope).await
    } else {
        reconcile_normal(&mut scope, ctx, started).await
    };
    scope.close_with(result).await
}

fn control_plane_key<S: ObjectStore>(scope: &Scope<S>) -> Option<ObjectKey> {
    scope
        .cluster
        .control_plane_ref_of_kind(&KwokControlPlane::kind(&()))
        .map(|reference| scope.cluster.resolve(reference))
}

async fn reconcile_normal<S: ObjectStore>(
    scope: &mut Scope<S>,
    ctx: &Context<S>,
    started: Instant,
) -> Result<ReconcileResult> {
    if add_finalizer(&mut scope.kwok_cluster, finalizers::KWOK_CLUSTER) {
        scope.patch_object().await?;
    }

    let control_plane_key = control_plane_key(scope).ok_or_else(|| {
        ProviderError::MissingReference(format!(
            "cluster {} has no KwokControlPlane controlPlaneRef",
            scope.name()
        ))
    })?;
    let control_plane = scope
        .store()
        .get::<KwokControlPlane>(&control_plane_key)
        .await?
        .ok_or_else(|| {
            ProviderError::MissingReference(format!("KwokControlPlane {}", control_plane_key))
        })?;

    ctx.runtimes.get(scope.runtime())?;

    if !control_plane.has_endpoint() {
        debug!("Control plane endpoint not known yet");
        return Ok(ReconcileResult::done());
    }

    let endpoint = &control_plane.spec.control_plane_endpoint;
    let infra = &mut scope.kwok_cluster;
    if infra.spec.control_plane_endpoint != *endpoint || !infra.is_ready() {
        info!(endpoint = %endpoint, "KwokCluster infrastructure is ready");
        infra.spec.control_plane_endpoint = endpoint.clone();
        let status = infra.status_mut();
        status.ready = true;
        status.last_reconcile_duration = Some(format_elapsed(started.elapsed()));
    }

    Ok(ReconcileResult::done())
}

async fn reconcile_delete<S: ObjectStore>(scope: &mut Scope<S>) -> Result<ReconcileResult> {
    if let Some(control_plane_key) = control_plane_key(scope) {
        if scope
            .store()
            .get::<KwokControlPlane>(&control_plane_key)
            .await?
            .is_some()
        {
            info!(control_plane = %control_plane_key, "Waiting for control plane deletion");
            return Ok(ReconcileResult::requeue());
        }
    }

    remove_finalizer(&mut scope.kwok_cluster, finalizers::KWOK_CLUSTER);
    Ok(ReconcileResult::done())
}
