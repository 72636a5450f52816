// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Per-reconcile context: the objects a pass works on, derived settings and
//! deferred persistence of the object the pass owns.

use crate::constants::{DEFAULT_BIND_ADDRESS, DEFAULT_RUNTIME};
use crate::error::{ProviderError, Result};
use crate::kubernetes::{ObjectStore, PatchHelper};
use crate::types::{Cluster, KwokCluster, KwokControlPlane};
use kube::ResourceExt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn, Instrument, Span};

/// The object a scope writes back on close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeTarget {
    ControlPlane,
    InfraCluster,
}

pub struct ScopeParams<S> {
    pub store: Arc<S>,
    pub cluster: Option<Cluster>,
    pub kwok_cluster: Option<KwokCluster>,
    pub control_plane: Option<KwokControlPlane>,
    pub target: ScopeTarget,
    pub default_work_dir: PathBuf,
    /// Span used for the scope's log lines, a fresh one is created when `None`
    pub span: Option<Span>,
}

enum Tracked {
    ControlPlane(PatchHelper<KwokControlPlane>),
    InfraCluster(PatchHelper<KwokCluster>),
}

pub struct Scope<S: ObjectStore> {
    store: Arc<S>,
    pub cluster: Cluster,
    pub kwok_cluster: KwokCluster,
    control_plane: Option<KwokControlPlane>,
    tracked: Tracked,
    default_work_dir: PathBuf,
    span: Span,
}

impl<S: ObjectStore> Scope<S> {
    pub fn new(params: ScopeParams<S>) -> Result<Self> {
        let cluster = params
            .cluster
            .ok_or_else(|| ProviderError::ScopeError("cluster is required".to_string()))?;
        let kwok_cluster = params
            .kwok_cluster
            .ok_or_else(|| ProviderError::ScopeError("kwok cluster is required".to_string()))?;

        let tracked = match params.target {
            ScopeTarget::ControlPlane => {
                let control_plane = params.control_plane.as_ref().ok_or_else(|| {
                    ProviderError::ScopeError("control plane is required".to_string())
                })?;
                Tracked::ControlPlane(PatchHelper::new(control_plane)?)
            }
            ScopeTarget::InfraCluster => Tracked::InfraCluster(PatchHelper::new(&kwok_cluster)?),
        };

        let span = params.span.unwrap_or_else(|| {
            tracing::info_span!(
                "scope",
                cluster = %cluster.name_any(),
                kwok_cluster = %kwok_cluster.name_any(),
            )
        });

        Ok(Self {
            store: params.store,
            cluster,
            kwok_cluster,
            control_plane: params.control_plane,
            tracked,
            default_work_dir: params.default_work_dir,
            span,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn control_plane(&self) -> Result<&KwokControlPlane> {
        self.control_plane
            .as_ref()
            .ok_or_else(|| ProviderError::ScopeError("scope has no control plane".to_string()))
    }

    pub fn control_plane_mut(&mut self) -> Result<&mut KwokControlPlane> {
        self.control_plane
            .as_mut()
            .ok_or_else(|| ProviderError::ScopeError("scope has no control plane".to_string()))
    }

    /// Backend runtime name, `docker` unless the KwokCluster picks one
    pub fn runtime(&self) -> &str {
        non_empty(self.kwok_cluster.spec.runtime.as_deref()).unwrap_or(DEFAULT_RUNTIME)
    }

    /// Backend cluster identifier
    pub fn name(&self) -> &str {
        self.cluster.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &str {
        self.cluster.metadata.namespace.as_deref().unwrap_or_default()
    }

    pub fn work_dir(&self) -> PathBuf {
        non_empty(self.kwok_cluster.spec.working_dir.as_deref())
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_work_dir.clone())
    }

    pub fn cluster_address(&self) -> &str {
        non_empty(self.kwok_cluster.spec.bind_address.as_deref()).unwrap_or(DEFAULT_BIND_ADDRESS)
    }

    /// Persist changes to the owned object now
    pub async fn patch_object(&mut self) -> Result<()> {
        let span = self.span.clone();
        async {
            match &mut self.tracked {
                Tracked::ControlPlane(helper) => {
                    let control_plane = self.control_plane.as_mut().ok_or_else(|| {
                        ProviderError::ScopeError("scope has no control plane".to_string())
                    })?;
                    helper.patch(&*self.store, control_plane).await
                }
                Tracked::InfraCluster(helper) => {
                    helper.patch(&*self.store, &mut self.kwok_cluster).await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Final flush; the scope cannot be used afterwards
    pub async fn close(mut self) -> Result<()> {
        self.patch_object().await?;
        debug!(parent: &self.span, "Scope closed");
        Ok(())
    }

    /// Close the scope after a pass produced `result`.
    ///
    /// A persistence failure replaces the pass result, including a failed one.
    pub async fn close_with<T>(self, result: Result<T>) -> Result<T> {
        let span = self.span.clone();
        match self.close().await {
            Ok(()) => result,
            Err(close_err) => {
                if let Err(pass_err) = &result {
                    warn!(parent: &span, error = %pass_err, "Dropping reconcile error, persisting the scope failed");
                }
                Err(close_err)
            }
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
