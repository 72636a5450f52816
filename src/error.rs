// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::runtime::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to serialize object: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to build scope: {0}")]
    ScopeError(String),

    #[error("Missing reference: {0}")]
    MissingReference(String),

    #[error("runtime {0:?} not found")]
    RuntimeNotFound(String),

    #[error("runtime {name:?} not available: {source}")]
    RuntimeUnavailable {
        name: String,
        #[source]
        source: RuntimeError,
    },

    #[error("{operation} failed for cluster {cluster:?}: {source}")]
    BackendError {
        operation: &'static str,
        cluster: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Failed to reconcile kubeconfig: {0}")]
    KubeconfigError(String),

    #[error("Invalid simulation config: {0}")]
    SimulationConfigError(String),
}

impl ProviderError {
    /// Wrap a runtime failure with the backend operation and cluster it belongs to
    pub fn backend(operation: &'static str, cluster: &str, source: RuntimeError) -> Self {
        Self::BackendError {
            operation,
            cluster: cluster.to_string(),
            source,
        }
    }

    /// True when the API server rejected a write because of a stale resourceVersion
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::KubeError(kube::Error::Api(err)) if err.code == 409)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KubeError(kube::Error::Api(err)) if err.code == 404)
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
