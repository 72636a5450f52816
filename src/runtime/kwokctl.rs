// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

use super::command::{exec, exec_unchecked};
use super::{KwokctlConfiguration, Runtime, RuntimeError, CONFIG_KIND};
use async_trait::async_trait;
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info};

const CONFIG_FILE: &str = "kwok.yaml";
const STAGING_DIR: &str = "staging";

/// Drives a simulated cluster through the `kwokctl` command line
pub struct KwokctlRuntime {
    kwokctl: PathBuf,
    runtime: String,
    name: String,
    work_dir: PathBuf,
    config: Option<KwokctlConfiguration>,
}

impl KwokctlRuntime {
    pub fn new(
        kwokctl: impl Into<PathBuf>,
        runtime: impl Into<String>,
        name: impl Into<String>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kwokctl: kwokctl.into(),
            runtime: runtime.into(),
            name: name.into(),
            work_dir: work_dir.into(),
            config: None,
        }
    }

    /// `<work dir>/clusters/<name>/kwok.yaml`, written by `kwokctl create cluster`.
    ///
    /// Its presence is what marks the cluster as created, so the provider never
    /// writes it itself.
    pub fn config_path(&self) -> PathBuf {
        self.work_dir
            .join("clusters")
            .join(&self.name)
            .join(CONFIG_FILE)
    }

    /// `<work dir>/staging/<name>.yaml`, handed to `kwokctl create cluster --config`
    pub fn staged_config_path(&self) -> PathBuf {
        self.work_dir
            .join(STAGING_DIR)
            .join(format!("{}.yaml", self.name))
    }

    async fn read_config(&self) -> Result<KwokctlConfiguration, RuntimeError> {
        match tokio::fs::read_to_string(self.config_path()).await {
            Ok(raw) => parse_config(&raw),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(RuntimeError::NotFound(self.name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    fn install_args(&self) -> Vec<String> {
        vec![
            "create".to_string(),
            "cluster".to_string(),
            "--runtime".to_string(),
            self.runtime.clone(),
            "--config".to_string(),
            self.staged_config_path().to_string_lossy().to_string(),
        ]
    }

    fn args<'a>(&'a self, subcommand: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec!["--name", self.name.as_str()];
        args.extend_from_slice(subcommand);
        args
    }

    fn work_dir_env(&self) -> String {
        self.work_dir.to_string_lossy().to_string()
    }

    async fn kwokctl(&self, subcommand: &[&str]) -> Result<(), RuntimeError> {
        let work_dir = self.work_dir_env();
        exec(
            &self.kwokctl,
            &self.args(subcommand),
            &[("KWOK_WORKDIR", work_dir.as_str())],
        )
        .await
        .map(|_| ())
    }
}

#[async_trait]
impl Runtime for KwokctlRuntime {
    async fn config(&self) -> Result<KwokctlConfiguration, RuntimeError> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => self.read_config().await,
        }
    }

    fn set_config(&mut self, config: KwokctlConfiguration) {
        self.config = Some(config);
    }

    async fn save(&self) -> Result<(), RuntimeError> {
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| RuntimeError::MissingConfig(self.name.clone()))?;
        let path = self.staged_config_path();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        tokio::fs::write(&path, serde_yaml::to_string(config)?).await?;
        debug!(cluster = %self.name, path = %path.display(), "Staged kwokctl configuration");
        Ok(())
    }

    async fn install(&self) -> Result<(), RuntimeError> {
        if !tokio::fs::try_exists(self.staged_config_path()).await? {
            return Err(RuntimeError::MissingConfig(self.name.clone()));
        }
        info!(cluster = %self.name, runtime = %self.runtime, "Creating simulated cluster");
        let args = self.install_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.kwokctl(&args).await
    }

    async fn up(&self) -> Result<(), RuntimeError> {
        self.kwokctl(&["start", "cluster"]).await
    }

    async fn ready(&self) -> bool {
        let work_dir = self.work_dir_env();
        let args = self.args(&["kubectl", "get", "--raw", "/readyz"]);
        match exec_unchecked(
            &self.kwokctl,
            &args,
            &[("KWOK_WORKDIR", work_dir.as_str())],
        )
        .await
        {
            Ok(output) => output.success(),
            Err(e) => {
                debug!(cluster = %self.name, error = %e, "Readiness probe could not run");
                false
            }
        }
    }

    async fn down(&self) -> Result<(), RuntimeError> {
        info!(cluster = %self.name, "Stopping simulated cluster");
        self.kwokctl(&["stop", "cluster"]).await
    }

    async fn uninstall(&self) -> Result<(), RuntimeError> {
        info!(cluster = %self.name, "Deleting simulated cluster");
        self.kwokctl(&["delete", "cluster"]).await
    }
}

/// The KwokctlConfiguration document of a possibly multi-document file
fn parse_config(raw: &str) -> Result<KwokctlConfiguration, RuntimeError> {
    for document in serde_yaml::Deserializer::from_str(raw) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.get("kind").and_then(serde_yaml::Value::as_str) == Some(CONFIG_KIND) {
            return Ok(serde_yaml::from_value(value)?);
        }
    }
    Err(RuntimeError::Config(serde::de::Error::custom(format!(
        "no {} document",
        CONFIG_KIND
    ))))
}
