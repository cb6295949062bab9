//! # Defaulting
//!
//! Field-by-field merge of a user supplied component spec with its compiled-in
//! default. Only unset fields are filled; explicit values always win.

use crate::crds::{ImageSpec, QuerySpec, StoreGatewaySpec};
use crate::defaults::{DEFAULT_QUERY, DEFAULT_STORE_GATEWAY};
use k8s_openapi::api::core::v1::ResourceRequirements;
use std::collections::BTreeMap;

/// Errors raised while completing a component spec
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    #[error("{component} spec is missing required field `{field}` after applying defaults")]
    MissingField {
        component: &'static str,
        field: &'static str,
    },
}

/// Fill every unset field of `self` from `defaults`
pub trait Merge {
    fn merge(&mut self, defaults: &Self);
}

/// Empty strings are unset
impl Merge for String {
    fn merge(&mut self, defaults: &Self) {
        if self.is_empty() {
            self.clone_from(defaults);
        }
    }
}

/// Missing keys are copied, existing keys are kept
impl<K: Ord + Clone, V: Clone> Merge for BTreeMap<K, V> {
    fn merge(&mut self, defaults: &Self) {
        for (key, value) in defaults {
            self.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

/// Empty lists are unset
impl<T: Clone> Merge for Vec<T> {
    fn merge(&mut self, defaults: &Self) {
        if self.is_empty() {
            self.clone_from(defaults);
        }
    }
}

impl<T: Merge + Clone> Merge for Option<T> {
    fn merge(&mut self, defaults: &Self) {
        match (self.as_mut(), defaults) {
            (None, Some(default)) => *self = Some(default.clone()),
            (Some(value), Some(default)) => value.merge(default),
            _ => {}
        }
    }
}

impl Merge for ResourceRequirements {
    fn merge(&mut self, defaults: &Self) {
        self.claims.merge(&defaults.claims);
        self.limits.merge(&defaults.limits);
        self.requests.merge(&defaults.requests);
    }
}

impl Merge for ImageSpec {
    fn merge(&mut self, defaults: &Self) {
        self.repository.merge(&defaults.repository);
        self.tag.merge(&defaults.tag);
        self.pull_policy.merge(&defaults.pull_policy);
    }
}

impl Merge for QuerySpec {
    fn merge(&mut self, defaults: &Self) {
        Merge::merge(&mut self.labels, &defaults.labels);
        Merge::merge(&mut self.annotations, &defaults.annotations);
        self.image.merge(&defaults.image);
        self.grpc_address.merge(&defaults.grpc_address);
        self.http_address.merge(&defaults.http_address);
        self.resources.merge(&defaults.resources);
    }
}

impl Merge for StoreGatewaySpec {
    fn merge(&mut self, defaults: &Self) {
        Merge::merge(&mut self.labels, &defaults.labels);
        Merge::merge(&mut self.annotations, &defaults.annotations);
        self.image.merge(&defaults.image);
        self.grpc_address.merge(&defaults.grpc_address);
        self.http_address.merge(&defaults.http_address);
        self.resources.merge(&defaults.resources);
        self.data_dir.merge(&defaults.data_dir);
        self.index_cache_size.merge(&defaults.index_cache_size);
        self.chunk_pool_size.merge(&defaults.chunk_pool_size);
    }
}

/// A deployable component with a compiled-in default
pub trait Component: Merge + Clone + 'static {
    /// Component name used in error messages
    const NAME: &'static str;

    fn defaults() -> &'static Self;

    /// First required field that is still unset
    fn missing_field(&self) -> Option<&'static str>;

    /// Merged copy of `self` with [`Component::defaults`]
    fn with_defaults(&self) -> Result<Self, MergeError> {
        merge_with_defaults(self, Self::defaults())
    }
}

fn missing_image_field(image: &ImageSpec) -> Option<&'static str> {
    if image.repository.is_empty() {
        Some("image.repository")
    } else if image.tag.is_empty() {
        Some("image.tag")
    } else if image.pull_policy.is_empty() {
        Some("image.pullPolicy")
    } else {
        None
    }
}

impl Component for QuerySpec {
    const NAME: &'static str = "query";

    fn defaults() -> &'static Self {
        &DEFAULT_QUERY
    }

    fn missing_field(&self) -> Option<&'static str> {
        missing_image_field(&self.image)
            .or_else(|| self.grpc_address.is_empty().then_some("grpcAddress"))
            .or_else(|| self.http_address.is_empty().then_some("httpAddress"))
    }
}

impl Component for StoreGatewaySpec {
    const NAME: &'static str = "storeGateway";

    fn defaults() -> &'static Self {
        &DEFAULT_STORE_GATEWAY
    }

    fn missing_field(&self) -> Option<&'static str> {
        missing_image_field(&self.image)
            .or_else(|| self.grpc_address.is_empty().then_some("grpcAddress"))
            .or_else(|| self.http_address.is_empty().then_some("httpAddress"))
            .or_else(|| self.data_dir.is_empty().then_some("dataDir"))
            .or_else(|| self.index_cache_size.is_empty().then_some("indexCacheSize"))
            .or_else(|| self.chunk_pool_size.is_empty().then_some("chunkPoolSize"))
    }
}

/// Merge a copy of `spec` with `defaults` and check that it is complete.
///
/// Neither argument is modified.
pub fn merge_with_defaults<T: Component>(spec: &T, defaults: &T) -> Result<T, MergeError> {
    let mut merged = spec.clone();
    merged.merge(defaults);

    match merged.missing_field() {
        Some(field) => Err(MergeError::MissingField {
            component: T::NAME,
            field,
        }),
        None => Ok(merged),
    }
}
