// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Controllers for the kwok provider kinds.
//!
//! Each controller has a store-generic core, `reconcile_*`, which runs one pass
//! for an object key, and a reconciler type wiring that core into a
//! kube-runtime `Controller`.

pub mod control_plane;
pub mod kwok_cluster;
pub mod kwok_machine;

use crate::config::Config;
use crate::constants::labels;
use crate::error::ProviderError;
use crate::runtime::RuntimeRegistry;
use kube::runtime::controller::Action;
use kube::{Resource, ResourceExt};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::error;

pub use crate::services::ReconcileResult;
pub use control_plane::ControlPlaneReconciler;
pub use kwok_cluster::KwokClusterReconciler;
pub use kwok_machine::KwokMachineReconciler;

/// Shared state handed to every reconcile pass
pub struct Context<S> {
    pub store: Arc<S>,
    pub runtimes: RuntimeRegistry,
    pub config: Config,
}

impl<S> Context<S> {
    pub fn new(store: Arc<S>, runtimes: RuntimeRegistry, config: Config) -> Self {
        Self {
            store,
            runtimes,
            config,
        }
    }
}

fn error_policy<K, S>(obj: Arc<K>, error: &ProviderError, ctx: Arc<Context<S>>) -> Action
where
    K: Resource<DynamicType = ()>,
{
    error!(
        "Reconciliation of {} {}/{} failed: {}",
        K::kind(&()),
        obj.namespace().unwrap_or_default(),
        obj.name_any(),
        error
    );
    Action::requeue(ctx.config.error_requeue)
}

/// Watcher configuration honouring the watch-filter label
pub fn watcher_config(config: &Config) -> WatcherConfig {
    let wc = WatcherConfig::default();
    match &config.watch_filter {
        Some(filter) => wc.labels(&format!("{}={}", labels::WATCH_FILTER, filter)),
        None => wc,
    }
}
