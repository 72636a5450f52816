// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! KwokMachine controller: marks simulated nodes ready once their cluster's
//! infrastructure provider is.

use super::{error_policy, watcher_config, Context, ReconcileResult};
use crate::constants::PROVIDER_ID_PREFIX;
use crate::error::Result;
use crate::kubernetes::meta::{is_deleting, is_paused};
use crate::kubernetes::owners::{get_cluster_from_metadata, get_owner_machine};
use crate::kubernetes::{KubeStore, ObjectStore, PatchHelper};
use crate::mapping;
use crate::types::simulation::{format_elapsed, reconcile_latency};
use crate::types::{Cluster, KwokCluster, KwokControlPlane, KwokMachine, Machine, ObjectKey};
use futures::StreamExt;
use kube::runtime::controller::{self, Action};
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

pub struct KwokMachineReconciler {
    client: Client,
    ctx: Arc<Context<KubeStore>>,
}

impl KwokMachineReconciler {
    pub fn new(client: Client, ctx: Arc<Context<KubeStore>>) -> Self {
        Self { client, ctx }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let wc = watcher_config(&self.ctx.config);
        let kwok_machines: Api<KwokMachine> = Api::all(self.client.clone());
        let machines: Api<Machine> = Api::all(self.client.clone());

        Controller::new(kwok_machines, wc.clone())
            .with_config(controller::Config::default().concurrency(self.ctx.config.machine_concurrency))
            .watches(machines, wc, |machine| {
                mapping::machine_to_kwok_machine(&machine).map(ObjectKey::into_ref)
            })
            .shutdown_on_signal()
            .run(reconcile, error_policy, self.ctx)
            .for_each(|res| async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled kwok machine: {}", obj),
                    Err(e) => warn!("KwokMachine reconciliation error: {}", e),
                }
            })
            .await;

        Ok(())
    }
}

async fn reconcile(kwok_machine: Arc<KwokMachine>, ctx: Arc<Context<KubeStore>>) -> Result<Action> {
    let key = ObjectKey::of(kwok_machine.as_ref());
    let result = reconcile_kwok_machine(&key, &ctx).await?;
    Ok(result.into_action(&ctx.config))
}

/// The object standing in for a Cluster's infrastructure, whichever kind it is
enum InfraProvider {
    ControlPlane(KwokControlPlane),
    InfraCluster(KwokCluster),
}

impl InfraProvider {
    /// Prefers a KwokControlPlane reference over a KwokCluster one
    async fn resolve<S: ObjectStore>(store: &S, cluster: &Cluster) -> Result<Option<Self>> {
        if let Some(reference) = cluster.control_plane_ref_of_kind(&KwokControlPlane::kind(&())) {
            let found = store.get::<KwokControlPlane>(&cluster.resolve(reference)).await?;
            return Ok(found.map(Self::ControlPlane));
        }
        if let Some(reference) = cluster.infrastructure_ref_of_kind(&KwokCluster::kind(&())) {
            let found = store.get::<KwokCluster>(&cluster.resolve(reference)).await?;
            return Ok(found.map(Self::InfraCluster));
        }
        Ok(None)
    }

    fn is_ready(&self) -> bool {
        match self {
            Self::ControlPlane(control_plane) => control_plane.is_initialized(),
            Self::InfraCluster(infra) => infra.is_ready(),
        }
    }
}

pub fn provider_id(cluster: &str, machine: &str) -> String {
    format!("{}{}/{}", PROVIDER_ID_PREFIX, cluster, machine)
}

#[instrument(skip(ctx), fields(kwok_machine = %key))]
pub async fn reconcile_kwok_machine<S: ObjectStore>(
    key: &ObjectKey,
    ctx: &Context<S>,
) -> Result<ReconcileResult> {
    let started = Instant::now();
    let store = ctx.store.as_ref();

    let Some(kwok_machine) = store.get::<KwokMachine>(key).await? else {
        debug!("KwokMachine not found");
        return Ok(ReconcileResult::done());
    };

    let Some(machine) = get_owner_machine(store, &kwok_machine).await? else {
        info!("Machine Controller has not yet set OwnerRef");
        return Ok(ReconcileResult::requeue());
    };

    if kwok_machine.has_failed() {
        info!(machine = %machine.name_any(), "KwokMachine has failed, not reconciling");
        return Ok(ReconcileResult::done());
    }

    let Some(cluster) = get_cluster_from_metadata(store, &machine).await? else {
        info!(machine = %machine.name_any(), "Machine is missing cluster label or cluster does not exist");
        return Ok(ReconcileResult::done());
    };

    if is_paused(&cluster, &kwok_machine) {
        info!("KwokMachine or linked Cluster is marked as paused, not reconciling");
        return Ok(ReconcileResult::done());
    }

    let latency = reconcile_latency(kwok_machine.spec.simulation_config.as_ref())?
        .map(tokio::time::sleep);

    let result = reconcile_owned(store, key, kwok_machine, &machine, &cluster, started).await;

    if let Some(latency) = latency {
        latency.await;
    }
    result
}

async fn reconcile_owned<S: ObjectStore>(
    store: &S,
    key: &ObjectKey,
    mut kwok_machine: KwokMachine,
    machine: &Machine,
    cluster: &Cluster,
    started: Instant,
) -> Result<ReconcileResult> {
    if is_deleting(machine) {
        return match store.delete::<KwokMachine>(key).await {
            Ok(()) => {
                info!("Machine is being deleted, deleted KwokMachine");
                Ok(ReconcileResult::done())
            }
            Err(e) => {
                warn!(error = %e, "Error deleting KwokMachine");
                Ok(ReconcileResult::requeue())
            }
        };
    }

    if !cluster.infrastructure_ready() {
        info!(cluster = %cluster.name_any(), "Cluster infrastructure is not ready yet");
        return Ok(ReconcileResult::done());
    }

    if machine.spec.bootstrap.data_secret_name.is_none() {
        info!("Bootstrap data secret is not present");
        return Ok(ReconcileResult::done());
    }

    match InfraProvider::resolve(store, cluster).await? {
        Some(provider) if provider.is_ready() => {}
        _ => {
            info!("KwokCluster or KwokControlPlane is not ready yet");
            return Ok(ReconcileResult::done());
        }
    }

    let mut helper = PatchHelper::new(&kwok_machine)?;
    if kwok_machine.spec.provider_id.is_none() {
        kwok_machine.spec.provider_id = Some(provider_id(&cluster.name_any(), &kwok_machine.name_any()));
    }
    kwok_machine.status_mut().ready = true;
    if helper.has_changes(&kwok_machine)? {
        kwok_machine.status_mut().last_reconcile_duration = Some(format_elapsed(started.elapsed()));
        helper.patch(store, &mut kwok_machine).await?;
        info!(provider_id = ?kwok_machine.spec.provider_id, "KwokMachine is ready");
    }

    Ok(ReconcileResult::done())
}
