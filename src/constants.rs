// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Cluster API annotation keys
pub mod annotations {
    /// Present on an object (or its Cluster) when reconciliation must stop
    pub const PAUSED: &str = "cluster.x-k8s.io/paused";
}

/// Cluster API label keys
pub mod labels {
    /// Name of the Cluster an object belongs to
    pub const CLUSTER_NAME: &str = "cluster.x-k8s.io/cluster-name";
    /// Label used to shard objects between provider instances
    pub const WATCH_FILTER: &str = "cluster.x-k8s.io/watch-filter";
}

/// Finalizers guarding backend teardown
pub mod finalizers {
    pub const CONTROL_PLANE: &str = "kwokcontrolplane.controlplane.cluster.x-k8s.io";
    pub const KWOK_CLUSTER: &str = "kwokcluster.infrastructure.cluster.x-k8s.io";
}

/// API groups of the kinds this provider resolves through references
pub mod groups {
    pub const CLUSTER_API: &str = "cluster.x-k8s.io";
    pub const INFRASTRUCTURE: &str = "infrastructure.cluster.x-k8s.io";
    pub const CONTROL_PLANE: &str = "controlplane.cluster.x-k8s.io";
}

/// Backend runtime used when a KwokCluster does not name one
pub const DEFAULT_RUNTIME: &str = "docker";

/// Address the simulated apiserver is reached on when no bind address is set
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Operator name reported in the startup log
pub const OPERATOR_NAME: &str = "capk";

/// Kubeconfig secret conventions shared with Cluster API
pub mod kubeconfig {
    pub const SECRET_SUFFIX: &str = "kubeconfig";
    pub const SECRET_TYPE: &str = "cluster.x-k8s.io/secret";
    pub const DATA_KEY: &str = "value";
    pub const SCHEME: &str = "http";
}

/// Provider ID prefix written to KwokMachines
pub const PROVIDER_ID_PREFIX: &str = "kwok://";

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
