// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities: the store seam, patching, metadata helpers and CRD discovery.

pub mod cache;
pub mod crd;
pub mod meta;
pub mod owners;
pub mod patch;
pub mod store;

pub use cache::cluster_cache;
pub use crd::wait_for_cluster_crd;
pub use patch::PatchHelper;
pub use store::{KubeStore, ObjectStore, StoredObject};
