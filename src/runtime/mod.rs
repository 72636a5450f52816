// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! The simulated-cluster backend.
//!
//! A [`Runtime`] handle is bound to one cluster name and working directory and
//! exposes the lifecycle protocol the provider drives: configure, install,
//! start, probe, stop and uninstall. Handles are built through a
//! [`RuntimeRegistry`] keyed by runtime name.

pub mod command;
pub mod kwokctl;
pub mod registry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use kwokctl::KwokctlRuntime;
pub use registry::{runtime_factory, RuntimeFactory, RuntimeRegistry};

pub const CONFIG_API_VERSION: &str = "config.kwok.x-k8s.io/v1alpha1";
pub const CONFIG_KIND: &str = "KwokctlConfiguration";

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("cluster {0:?} does not exist")]
    NotFound(String),

    #[error("no configuration set for cluster {0:?}")]
    MissingConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid kwokctl configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("command `{command}` exited with {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

impl RuntimeError {
    pub fn command_failed(
        command: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Lifecycle protocol of one simulated cluster
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Effective configuration; fails with `NotFound` when the cluster was never configured
    async fn config(&self) -> Result<KwokctlConfiguration, RuntimeError>;

    /// Replace the in-memory configuration, written by [`Runtime::save`]
    fn set_config(&mut self, config: KwokctlConfiguration);

    async fn save(&self) -> Result<(), RuntimeError>;

    async fn install(&self) -> Result<(), RuntimeError>;

    async fn up(&self) -> Result<(), RuntimeError>;

    /// Whether the simulated apiserver answers its readiness probe
    async fn ready(&self) -> bool;

    async fn down(&self) -> Result<(), RuntimeError>;

    async fn uninstall(&self) -> Result<(), RuntimeError>;
}

/// The persisted kwokctl cluster configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KwokctlConfiguration {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub options: KwokctlOptions,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KwokctlOptions {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub runtime: String,
    #[serde(default)]
    pub kube_apiserver_port: u16,
}

impl KwokctlConfiguration {
    pub fn new(runtime: impl Into<String>, kube_apiserver_port: u16) -> Self {
        Self {
            api_version: CONFIG_API_VERSION.to_string(),
            kind: CONFIG_KIND.to_string(),
            options: KwokctlOptions {
                runtime: runtime.into(),
                kube_apiserver_port,
            },
        }
    }
}
