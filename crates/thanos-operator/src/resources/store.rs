use super::{
    bare_metadata, get_port, non_empty, pod_labels, selector_labels, tcp_port, BuildResult,
    DesiredState,
};
use crate::reconciler::ThanosComponentReconciler;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, PodSpec, PodTemplateSpec, SecretVolumeSource, Service,
    ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use thanos_operator_sdk::{Component, ObjectStore, StoreGatewaySpec};

pub const STORE_DEPLOYMENT: &str = "store-deployment";
pub const STORE_SERVICE: &str = "store-service";

/// Mount point of the object storage configuration secret
pub const OBJSTORE_CONFIG_DIR: &str = "/etc/config";

const DATA_VOLUME: &str = "data";
const OBJSTORE_VOLUME: &str = "objstore-secret";

fn store_args(store: &StoreGatewaySpec, object_store: Option<&ObjectStore>) -> Vec<String> {
    let mut args = vec![
        "store".to_string(),
        format!("--grpc-address={}", store.grpc_address),
        format!("--http-address={}", store.http_address),
        format!("--data-dir={}", store.data_dir),
        format!("--index-cache-size={}", store.index_cache_size),
        format!("--chunk-pool-size={}", store.chunk_pool_size),
    ];

    if let Some(object_store) = object_store {
        args.push(format!(
            "--objstore.config-file={}/{}",
            OBJSTORE_CONFIG_DIR, object_store.spec.config.key
        ));
    }

    args
}

impl ThanosComponentReconciler<'_> {
    /// Store gateway deployment, or a deletion marker when the store gateway is unset
    pub fn store_deployment(&self) -> BuildResult {
        let name = STORE_DEPLOYMENT;
        let namespace = self.namespace();

        let Some(store) = self.thanos().spec.store_gateway.as_ref() else {
            let delete = Deployment {
                metadata: bare_metadata(name, namespace),
                ..Default::default()
            };
            return Ok((Some(delete.into()), DesiredState::Absent));
        };

        let store = store.with_defaults()?;
        let object_store = self.object_stores().first();

        let mut volumes = vec![Volume {
            name: DATA_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }];
        let mut volume_mounts = vec![VolumeMount {
            name: DATA_VOLUME.to_string(),
            mount_path: store.data_dir.clone(),
            ..Default::default()
        }];

        if let Some(object_store) = object_store {
            volumes.push(Volume {
                name: OBJSTORE_VOLUME.to_string(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(object_store.spec.config.name.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            });
            volume_mounts.push(VolumeMount {
                name: OBJSTORE_VOLUME.to_string(),
                mount_path: OBJSTORE_CONFIG_DIR.to_string(),
                read_only: Some(true),
                ..Default::default()
            });
        }

        let container = Container {
            name: "store".to_string(),
            image: Some(store.image.reference()),
            image_pull_policy: Some(store.image.pull_policy.clone()),
            args: Some(store_args(&store, object_store)),
            ports: Some(vec![
                tcp_port("http", &store.http_address),
                tcp_port("grpc", &store.grpc_address),
            ]),
            resources: Some(store.resources.clone()),
            volume_mounts: Some(volume_mounts),
            ..Default::default()
        };

        let template = PodTemplateSpec {
            metadata: Some(ObjectMeta {
                name: Some("store".to_string()),
                labels: Some(pod_labels("store", &self.instance(), &store.image.tag)),
                annotations: non_empty(&store.annotations),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![container],
                volumes: Some(volumes),
                ..Default::default()
            }),
        };

        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: non_empty(&store.labels),
                annotations: non_empty(&store.annotations),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(selector_labels("store")),
                    ..Default::default()
                },
                template,
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok((Some(deployment.into()), DesiredState::Present))
    }

    /// Store gateway service, or a deletion marker when the store gateway is unset
    pub fn store_service(&self) -> BuildResult {
        let name = STORE_SERVICE;
        let namespace = self.namespace();

        let Some(store) = self.thanos().spec.store_gateway.as_ref() else {
            let delete = Service {
                metadata: bare_metadata(name, namespace),
                ..Default::default()
            };
            return Ok((Some(delete.into()), DesiredState::Absent));
        };

        let store = store.with_defaults()?;

        let port = |name: &str, address: &str| {
            let port = get_port(address);
            ServicePort {
                name: Some(name.to_string()),
                port,
                target_port: Some(IntOrString::Int(port)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }
        };

        let service = Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: non_empty(&store.labels),
                annotations: non_empty(&store.annotations),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: Some("ClusterIP".to_string()),
                selector: Some(selector_labels("store")),
                ports: Some(vec![
                    port("grpc", &store.grpc_address),
                    port("http", &store.http_address),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok((Some(service.into()), DesiredState::Present))
    }
}
