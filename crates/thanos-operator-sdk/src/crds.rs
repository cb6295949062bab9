//! # Custom Resource Definitions
//!
//! Kubernetes CRDs managed by the Thanos operator

use k8s_openapi::api::core::v1::ResourceRequirements;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// API group shared by every resource of the operator
pub const API_GROUP: &str = "monitoring.thanos.io";

/// API version shared by every resource of the operator
pub const API_VERSION: &str = "v1alpha1";

/// Thanos CRD - one instance describes a whole Thanos deployment
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "monitoring.thanos.io",
    version = "v1alpha1",
    kind = "Thanos",
    plural = "thanos",
    derive = "Default",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ThanosSpec {
    /// Query component, not deployed when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<QuerySpec>,

    /// Store gateway component, not deployed when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_gateway: Option<StoreGatewaySpec>,
}

/// Container image reference
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageSpec {
    /// Repository name (e.g., "quay.io/thanos/thanos")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,

    /// Image tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,

    /// Image pull policy (Always, IfNotPresent, Never)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pull_policy: String,
}

impl ImageSpec {
    /// Image reference in `repository:tag` form
    pub fn reference(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// Query component specification
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Labels attached to the generated objects
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations attached to the generated objects and pods
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Container image
    #[serde(default)]
    pub image: ImageSpec,

    /// gRPC listen address in `host:port` form
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub grpc_address: String,

    /// HTTP listen address in `host:port` form
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_address: String,

    /// Container resource requests and limits
    #[serde(default)]
    pub resources: ResourceRequirements,
}

/// Store gateway component specification
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreGatewaySpec {
    /// Labels attached to the generated objects
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Annotations attached to the generated objects and pods
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Container image
    #[serde(default)]
    pub image: ImageSpec,

    /// gRPC listen address in `host:port` form
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub grpc_address: String,

    /// HTTP listen address in `host:port` form
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_address: String,

    /// Container resource requests and limits
    #[serde(default)]
    pub resources: ResourceRequirements,

    /// Local data directory used for index caches
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_dir: String,

    /// Maximum size of the in-memory index cache (e.g., "250MB")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index_cache_size: String,

    /// Maximum size of the chunk pool (e.g., "2GB")
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chunk_pool_size: String,
}

/// ObjectStore CRD - bucket configuration consumed by the store gateway
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "monitoring.thanos.io",
    version = "v1alpha1",
    kind = "ObjectStore",
    plural = "objectstores",
    derive = "Default",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreSpec {
    /// Secret holding the object storage configuration file
    pub config: ObjectStoreConfig,
}

/// Reference to a key of a Secret in the same namespace
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStoreConfig {
    /// Secret name
    pub name: String,

    /// Key inside the secret
    #[serde(default = "default_config_key")]
    pub key: String,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            key: default_config_key(),
        }
    }
}

fn default_config_key() -> String {
    "object-store.yaml".to_string()
}
