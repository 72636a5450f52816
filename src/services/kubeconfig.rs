// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubeconfig secret for a simulated cluster, in the Cluster API layout.

use crate::constants::{kubeconfig, labels};
use crate::error::{ProviderError, Result};
use crate::kubernetes::ObjectStore;
use crate::scope::Scope;
use crate::types::ObjectKey;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::config::{AuthInfo, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext};
use kube::Resource;
use std::collections::BTreeMap;
use tracing::{debug, info};
use url::Url;

pub fn secret_name(cluster: &str) -> String {
    format!("{}-{}", cluster, kubeconfig::SECRET_SUFFIX)
}

pub fn user_name(cluster: &str) -> String {
    format!("{}-capk-admin", cluster)
}

/// Plain HTTP address of the simulated apiserver
pub fn server_url(address: &str, port: u16) -> Result<Url> {
    let host = if address.contains(':') && !address.starts_with('[') {
        format!("[{}]", address)
    } else {
        address.to_string()
    };
    Url::parse(&format!("{}://{}:{}", kubeconfig::SCHEME, host, port)).map_err(|e| {
        ProviderError::KubeconfigError(format!("invalid apiserver address {:?}: {}", address, e))
    })
}

/// Render a kubeconfig with a single cluster, user and current context.
///
/// The simulated apiserver serves plain HTTP, so the user carries no credentials.
pub fn render(cluster: &str, server: &Url) -> Result<String> {
    let user = user_name(cluster);
    let context = format!("{}@{}", user, cluster);

    let document = Kubeconfig {
        api_version: Some("v1".to_string()),
        kind: Some("Config".to_string()),
        clusters: vec![NamedCluster {
            name: cluster.to_string(),
            cluster: Some(kube::config::Cluster {
                server: Some(server.as_str().trim_end_matches('/').to_string()),
                ..Default::default()
            }),
        }],
        auth_infos: vec![NamedAuthInfo {
            name: user.clone(),
            auth_info: Some(AuthInfo::default()),
        }],
        contexts: vec![NamedContext {
            name: context.clone(),
            context: Some(Context {
                cluster: cluster.to_string(),
                user: Some(user),
                ..Default::default()
            }),
        }],
        current_context: Some(context),
        ..Default::default()
    };

    serde_yaml::to_string(&document)
        .map_err(|e| ProviderError::KubeconfigError(format!("failed to render kubeconfig: {}", e)))
}

/// Create the `<cluster>-kubeconfig` secret unless it already exists
pub async fn ensure_secret<S: ObjectStore>(scope: &Scope<S>, port: u16) -> Result<()> {
    let cluster = scope.name();
    let key = ObjectKey::new(scope.namespace(), secret_name(cluster));

    if scope.store().get::<Secret>(&key).await?.is_some() {
        debug!(secret = %key, "Kubeconfig secret exists");
        return Ok(());
    }

    let owner = scope.control_plane()?.controller_owner_ref(&()).ok_or_else(|| {
        ProviderError::KubeconfigError("control plane has no uid to own the secret".to_string())
    })?;
    let server = server_url(scope.cluster_address(), port)?;
    let document = render(cluster, &server)?;

    let secret = Secret {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            labels: Some(BTreeMap::from([(
                labels::CLUSTER_NAME.to_string(),
                cluster.to_string(),
            )])),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        type_: Some(kubeconfig::SECRET_TYPE.to_string()),
        data: Some(BTreeMap::from([(
            kubeconfig::DATA_KEY.to_string(),
            ByteString(document.into_bytes()),
        )])),
        ..Default::default()
    };

    match scope.store().create(&secret).await {
        Ok(_) => {
            info!(secret = %key, server = %server, "Created kubeconfig secret");
            Ok(())
        }
        Err(e) if e.is_conflict() => {
            debug!(secret = %key, "Kubeconfig secret created concurrently");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
