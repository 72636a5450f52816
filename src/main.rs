// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use capk::config::Config;
use capk::constants::OPERATOR_NAME;
use capk::kubernetes::{cluster_cache, wait_for_cluster_crd, KubeStore};
use capk::reconcilers::{
    watcher_config, Context, ControlPlaneReconciler, KwokClusterReconciler, KwokMachineReconciler,
};
use capk::runtime::RuntimeRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting {} operator", OPERATOR_NAME);

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: work_dir={}, watch_filter={:?}",
        config.default_work_dir.display(),
        config.watch_filter
    );

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Wait for the Cluster API CRDs before starting reconcilers
    info!("Waiting for Cluster API Cluster CRD to become available...");
    wait_for_cluster_crd(&client).await?;

    let runtimes = RuntimeRegistry::with_kwokctl(config.kwokctl_path.clone());
    info!(
        "Registered runtimes: {}",
        runtimes.names().collect::<Vec<_>>().join(", ")
    );

    let (clusters, cache_driver) = cluster_cache(client.clone(), watcher_config(&config));
    let store = Arc::new(KubeStore::new(client.clone()));
    let ctx = Arc::new(Context::new(store, runtimes, config));

    let control_plane_reconciler =
        ControlPlaneReconciler::new(client.clone(), ctx.clone(), clusters.clone());
    let kwok_cluster_reconciler = KwokClusterReconciler::new(client.clone(), ctx.clone(), clusters);
    let kwok_machine_reconciler = KwokMachineReconciler::new(client, ctx);

    info!("Starting reconcilers...");

    // The cache lives until the reconcilers stop
    tokio::spawn(cache_driver);

    tokio::try_join!(
        control_plane_reconciler.run(),
        kwok_cluster_reconciler.run(),
        kwok_machine_reconciler.run()
    )?;

    warn!("All reconcilers stopped, shutting down");
    Ok(())
}
