//! Compiled-in component defaults, used only as merge sources.

use crate::crds::{ImageSpec, QuerySpec, StoreGatewaySpec};
use lazy_static::lazy_static;

pub const DEFAULT_IMAGE_REPOSITORY: &str = "quay.io/thanos/thanos";
pub const DEFAULT_IMAGE_TAG: &str = "v0.9.0";
pub const DEFAULT_PULL_POLICY: &str = "IfNotPresent";
pub const DEFAULT_GRPC_ADDRESS: &str = "0.0.0.0:10901";
pub const DEFAULT_HTTP_ADDRESS: &str = "0.0.0.0:10902";

pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_INDEX_CACHE_SIZE: &str = "250MB";
pub const DEFAULT_CHUNK_POOL_SIZE: &str = "2GB";

fn default_image() -> ImageSpec {
    ImageSpec {
        repository: DEFAULT_IMAGE_REPOSITORY.to_string(),
        tag: DEFAULT_IMAGE_TAG.to_string(),
        pull_policy: DEFAULT_PULL_POLICY.to_string(),
    }
}

lazy_static! {
    pub static ref DEFAULT_QUERY: QuerySpec = QuerySpec {
        image: default_image(),
        grpc_address: DEFAULT_GRPC_ADDRESS.to_string(),
        http_address: DEFAULT_HTTP_ADDRESS.to_string(),
        ..Default::default()
    };

    pub static ref DEFAULT_STORE_GATEWAY: StoreGatewaySpec = StoreGatewaySpec {
        image: default_image(),
        grpc_address: DEFAULT_GRPC_ADDRESS.to_string(),
        http_address: DEFAULT_HTTP_ADDRESS.to_string(),
        data_dir: DEFAULT_DATA_DIR.to_string(),
        index_cache_size: DEFAULT_INDEX_CACHE_SIZE.to_string(),
        chunk_pool_size: DEFAULT_CHUNK_POOL_SIZE.to_string(),
        ..Default::default()
    };
}
