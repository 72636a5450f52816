// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Services driving external systems on behalf of a reconcile pass.

pub mod cluster;
pub mod kubeconfig;

use crate::config::Config;
use crate::error::Result;
use crate::kubernetes::ObjectStore;
use crate::scope::Scope;
use async_trait::async_trait;
use kube::runtime::controller::Action;
use std::time::Duration;

pub use cluster::ClusterService;

/// Outcome of a reconcile step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub requeue: bool,
    pub requeue_after: Option<Duration>,
}

impl ReconcileResult {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requeue() -> Self {
        Self {
            requeue: true,
            requeue_after: None,
        }
    }

    pub fn requeue_after(after: Duration) -> Self {
        Self {
            requeue: true,
            requeue_after: Some(after),
        }
    }

    pub fn is_requeue(&self) -> bool {
        self.requeue || self.requeue_after.is_some()
    }

    /// Translate into a controller action; converged objects are revisited after the sync period
    pub fn into_action(self, config: &Config) -> Action {
        match (self.requeue_after, self.requeue) {
            (Some(after), _) => Action::requeue(after),
            (None, true) => Action::requeue(config.requeue_interval),
            (None, false) => Action::requeue(config.sync_period),
        }
    }
}

/// One step of a reconcile pass operating on a scope
#[async_trait]
pub trait ScopedReconciler<S: ObjectStore>: Send + Sync {
    async fn reconcile(&self, scope: &mut Scope<S>) -> Result<ReconcileResult>;

    async fn delete(&self, scope: &mut Scope<S>) -> Result<ReconcileResult>;
}

/// Run `reconcile` on each step in order, stopping at the first error or requeue
pub async fn reconcile_chain<S: ObjectStore>(
    steps: &[&dyn ScopedReconciler<S>],
    scope: &mut Scope<S>,
) -> Result<ReconcileResult> {
    for step in steps {
        let result = step.reconcile(scope).await?;
        if result.is_requeue() {
            return Ok(result);
        }
    }
    Ok(ReconcileResult::done())
}

/// Run `delete` on each step in order, stopping at the first error or requeue
pub async fn delete_chain<S: ObjectStore>(
    steps: &[&dyn ScopedReconciler<S>],
    scope: &mut Scope<S>,
) -> Result<ReconcileResult> {
    for step in steps {
        let result = step.delete(scope).await?;
        if result.is_requeue() {
            return Ok(result);
        }
    }
    Ok(ReconcileResult::done())
}
