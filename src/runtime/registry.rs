// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::{KwokctlRuntime, Runtime, RuntimeError};
use crate::error::{ProviderError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Builds a runtime handle for `(cluster name, working directory)`
pub type RuntimeFactory =
    Arc<dyn Fn(&str, &Path) -> std::result::Result<Box<dyn Runtime>, RuntimeError> + Send + Sync>;

/// Wrap a closure as a [`RuntimeFactory`]
pub fn runtime_factory<F>(factory: F) -> RuntimeFactory
where
    F: Fn(&str, &Path) -> std::result::Result<Box<dyn Runtime>, RuntimeError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(factory)
}

/// Runtime names backed by the kwokctl driver
pub const KWOKCTL_RUNTIMES: &[&str] = &["docker", "podman", "nerdctl", "kind", "kind-podman", "binary"];

/// Explicit name to factory table, shared by all controllers through their context
#[derive(Clone, Default)]
pub struct RuntimeRegistry {
    factories: BTreeMap<String, RuntimeFactory>,
}

impl RuntimeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every kwokctl-backed runtime, invoking the given binary
    pub fn with_kwokctl(kwokctl: impl Into<PathBuf>) -> Self {
        let kwokctl = kwokctl.into();
        let mut registry = Self::new();
        for runtime in KWOKCTL_RUNTIMES {
            let kwokctl = kwokctl.clone();
            let runtime_name = runtime.to_string();
            registry.register(
                *runtime,
                runtime_factory(move |name, work_dir| {
                    Ok(Box::new(KwokctlRuntime::new(
                        kwokctl.clone(),
                        runtime_name.clone(),
                        name,
                        work_dir,
                    )))
                }),
            );
        }
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: RuntimeFactory) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Result<&RuntimeFactory> {
        self.factories
            .get(name)
            .ok_or_else(|| ProviderError::RuntimeNotFound(name.to_string()))
    }

    /// Build a handle for a cluster, whether or not it exists yet
    pub fn build(&self, runtime: &str, cluster: &str, work_dir: &Path) -> Result<Box<dyn Runtime>> {
        let factory = self.get(runtime)?;
        factory(cluster, work_dir).map_err(|source| ProviderError::RuntimeUnavailable {
            name: runtime.to_string(),
            source,
        })
    }

    /// Build a handle for an existing cluster, `None` when the backend has no record of it
    pub async fn load(
        &self,
        runtime: &str,
        cluster: &str,
        work_dir: &Path,
    ) -> Result<Option<Box<dyn Runtime>>> {
        let handle = self.build(runtime, cluster, work_dir)?;
        match handle.config().await {
            Ok(_) => Ok(Some(handle)),
            Err(e) if e.is_not_found() => {
                debug!(cluster, runtime, "Cluster not known to backend");
                Ok(None)
            }
            Err(e) => Err(ProviderError::backend("load", cluster, e)),
        }
    }
}

impl fmt::Debug for RuntimeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeRegistry")
            .field("runtimes", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
