// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Watch-backed Cluster cache consulted by the event mappers.

use crate::types::Cluster;
use futures::{Future, StreamExt};
use kube::runtime::reflector::Store;
use kube::runtime::{reflector, watcher, WatchStreamExt};
use kube::{Api, Client};
use tracing::warn;

/// Build the Cluster cache.
///
/// The returned future keeps the cache current and has to be polled for the
/// lifetime of the operator.
pub fn cluster_cache(
    client: Client,
    watcher_config: watcher::Config,
) -> (Store<Cluster>, impl Future<Output = ()> + Send + 'static) {
    let api: Api<Cluster> = Api::all(client);
    let (reader, writer) = reflector::store();

    let driver = reflector(writer, watcher(api, watcher_config))
        .default_backoff()
        .applied_objects()
        .for_each(|event| async move {
            if let Err(e) = event {
                warn!("Cluster cache watch error: {}", e);
            }
        });

    (reader, driver)
}
