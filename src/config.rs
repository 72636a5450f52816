// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Operator configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of KwokControlPlanes reconciled simultaneously
    pub control_plane_concurrency: u16,
    /// Number of KwokClusters reconciled simultaneously
    pub cluster_concurrency: u16,
    /// Number of KwokMachines reconciled simultaneously
    pub machine_concurrency: u16,
    /// Only objects labelled `cluster.x-k8s.io/watch-filter=<value>` are watched
    pub watch_filter: Option<String>,
    /// Interval at which converged objects are reconciled again
    pub sync_period: Duration,
    /// Delay used when a pass explicitly asks to be requeued
    pub requeue_interval: Duration,
    /// Delay before retrying a pass that failed
    pub error_requeue: Duration,
    /// Working directory used when a KwokCluster does not set one
    pub default_work_dir: PathBuf,
    /// Port for simulated apiservers, 0 picks a free port per cluster
    pub kube_apiserver_port: u16,
    pub kwokctl_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_plane_concurrency: 1,
            cluster_concurrency: 1,
            machine_concurrency: 1,
            watch_filter: None,
            sync_period: Duration::from_secs(600),
            requeue_interval: Duration::from_secs(5),
            error_requeue: Duration::from_secs(60),
            default_work_dir: PathBuf::from("/var/lib/kwok"),
            kube_apiserver_port: 0,
            kwokctl_path: PathBuf::from("kwokctl"),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        Ok(Config {
            control_plane_concurrency: parse_var(&lookup, "CONTROLPLANE_CONCURRENCY")?
                .unwrap_or(defaults.control_plane_concurrency),
            cluster_concurrency: parse_var(&lookup, "CLUSTER_CONCURRENCY")?
                .unwrap_or(defaults.cluster_concurrency),
            machine_concurrency: parse_var(&lookup, "MACHINE_CONCURRENCY")?
                .unwrap_or(defaults.machine_concurrency),
            watch_filter: lookup("WATCH_FILTER").filter(|v| !v.is_empty()),
            sync_period: duration_var(&lookup, "SYNC_PERIOD")?.unwrap_or(defaults.sync_period),
            requeue_interval: duration_var(&lookup, "REQUEUE_INTERVAL")?
                .unwrap_or(defaults.requeue_interval),
            error_requeue: duration_var(&lookup, "ERROR_REQUEUE")?
                .unwrap_or(defaults.error_requeue),
            default_work_dir: lookup("KWOK_WORKDIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.default_work_dir),
            kube_apiserver_port: parse_var(&lookup, "KWOK_APISERVER_PORT")?
                .unwrap_or(defaults.kube_apiserver_port),
            kwokctl_path: lookup("KWOKCTL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.kwokctl_path),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|v| v.parse::<T>())
        .transpose()
        .with_context(|| format!("{} environment variable is not valid", key))
}

fn duration_var<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| humantime::parse_duration(&v))
        .transpose()
        .with_context(|| format!("{} environment variable is not a valid duration", key))
}
