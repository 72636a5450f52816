// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory backend counting every lifecycle call.

use super::Journal;
use crate::runtime::registry::KWOKCTL_RUNTIMES;
use crate::runtime::{
    runtime_factory, KwokctlConfiguration, Runtime, RuntimeError, RuntimeFactory, RuntimeRegistry,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct FakeCluster {
    config: KwokctlConfiguration,
    installed: bool,
    running: bool,
}

#[derive(Default)]
struct BackendState {
    clusters: HashMap<String, FakeCluster>,
    calls: HashMap<&'static str, usize>,
    failures: HashMap<&'static str, String>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
    journal: Journal,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn factory(&self) -> RuntimeFactory {
        let backend = self.clone();
        runtime_factory(move |name, _work_dir| {
            Ok(Box::new(FakeRuntime {
                name: name.to_string(),
                config: None,
                backend: backend.clone(),
            }))
        })
    }

    /// Registry mapping every known runtime name onto this backend
    pub fn registry(&self) -> RuntimeRegistry {
        let mut registry = RuntimeRegistry::new();
        for name in KWOKCTL_RUNTIMES {
            registry.register(*name, self.factory());
        }
        registry
    }

    /// Pretend a cluster was already created and started
    pub fn seed_running(&self, name: &str, config: KwokctlConfiguration) {
        self.state.lock().unwrap().clusters.insert(
            name.to_string(),
            FakeCluster {
                config,
                installed: true,
                running: true,
            },
        );
    }

    /// Pretend a cluster exists but is stopped
    pub fn seed_stopped(&self, name: &str, config: KwokctlConfiguration) {
        self.seed_running(name, config);
        if let Some(cluster) = self.state.lock().unwrap().clusters.get_mut(name) {
            cluster.running = false;
        }
    }

    /// Make every future call of the operation fail
    pub fn fail_on(&self, op: &'static str) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(op, format!("simulated {} failure", op));
    }

    pub fn calls(&self, op: &str) -> usize {
        self.state.lock().unwrap().calls.get(op).copied().unwrap_or(0)
    }

    /// Calls that change backend state
    pub fn mutations(&self) -> usize {
        ["save", "install", "up", "down", "uninstall"]
            .iter()
            .map(|op| self.calls(op))
            .sum()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.state.lock().unwrap().clusters.contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .clusters
            .get(name)
            .is_some_and(|c| c.running)
    }
}

struct FakeRuntime {
    name: String,
    config: Option<KwokctlConfiguration>,
    backend: FakeBackend,
}

impl FakeRuntime {
    fn call(&self, op: &'static str) -> Result<(), RuntimeError> {
        let mut state = self.backend.state.lock().unwrap();
        *state.calls.entry(op).or_default() += 1;
        self.backend
            .journal
            .lock()
            .unwrap()
            .push(format!("backend {} {}", op, self.name));
        match state.failures.get(op) {
            Some(message) => Err(RuntimeError::command_failed(
                format!("kwokctl {}", op),
                1,
                message.clone(),
            )),
            None => Ok(()),
        }
    }

    fn with_cluster<T>(
        &self,
        f: impl FnOnce(&mut FakeCluster) -> T,
    ) -> Result<T, RuntimeError> {
        let mut state = self.backend.state.lock().unwrap();
        state
            .clusters
            .get_mut(&self.name)
            .map(f)
            .ok_or_else(|| RuntimeError::NotFound(self.name.clone()))
    }
}

#[async_trait]
impl Runtime for FakeRuntime {
    async fn config(&self) -> Result<KwokctlConfiguration, RuntimeError> {
        if let Some(config) = &self.config {
            return Ok(config.clone());
        }
        self.with_cluster(|c| c.config.clone())
    }

    fn set_config(&mut self, config: KwokctlConfiguration) {
        self.config = Some(config);
    }

    async fn save(&self) -> Result<(), RuntimeError> {
        self.call("save")?;
        let config = self
            .config
            .clone()
            .ok_or_else(|| RuntimeError::MissingConfig(self.name.clone()))?;
        let mut state = self.backend.state.lock().unwrap();
        state
            .clusters
            .entry(self.name.clone())
            .and_modify(|c| c.config = config.clone())
            .or_insert(FakeCluster {
                config,
                installed: false,
                running: false,
            });
        Ok(())
    }

    async fn install(&self) -> Result<(), RuntimeError> {
        self.call("install")?;
        self.with_cluster(|c| c.installed = true)
    }

    async fn up(&self) -> Result<(), RuntimeError> {
        self.call("up")?;
        let installed = self.with_cluster(|c| {
            c.running = c.installed;
            c.installed
        })?;
        if installed {
            Ok(())
        } else {
            Err(RuntimeError::NotFound(self.name.clone()))
        }
    }

    async fn ready(&self) -> bool {
        let mut state = self.backend.state.lock().unwrap();
        *state.calls.entry("ready").or_default() += 1;
        state.clusters.get(&self.name).is_some_and(|c| c.running)
    }

    async fn down(&self) -> Result<(), RuntimeError> {
        self.call("down")?;
        self.with_cluster(|c| c.running = false)
    }

    async fn uninstall(&self) -> Result<(), RuntimeError> {
        self.call("uninstall")?;
        self.backend.state.lock().unwrap().clusters.remove(&self.name);
        Ok(())
    }
}
