//! # Desired-state builders
//!
//! Every managed object has a builder that turns the Thanos resource into the
//! object to apply, or into a bare deletion marker when its component is unset.

mod query;
mod store;

pub use query::QUERY_DEPLOYMENT;
pub use store::{OBJSTORE_CONFIG_DIR, STORE_DEPLOYMENT, STORE_SERVICE};

use crate::error::BuildError;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ContainerPort, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use std::fmt;

pub const NAME_LABEL: &str = "app.kubernetes.io/name";
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";
pub const VERSION_LABEL: &str = "app.kubernetes.io/version";
pub const COMPONENT_LABEL: &str = "app.kubernetes.io/component";
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

pub const MANAGED_BY: &str = "thanos-operator";

/// Maximum length of a label value
pub const LABEL_VALUE_MAX_LEN: usize = 63;

/// Whether a desired object should exist in the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredState {
    /// Create or update
    Present,
    /// Delete if it exists
    Absent,
}

/// Object produced by a builder
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredObject {
    Deployment(Deployment),
    Service(Service),
}

impl DesiredObject {
    pub fn kind(&self) -> &'static str {
        match self {
            DesiredObject::Deployment(_) => "Deployment",
            DesiredObject::Service(_) => "Service",
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            DesiredObject::Deployment(deployment) => &deployment.metadata,
            DesiredObject::Service(service) => &service.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            DesiredObject::Deployment(deployment) => &mut deployment.metadata,
            DesiredObject::Service(service) => &mut service.metadata,
        }
    }
}

impl From<Deployment> for DesiredObject {
    fn from(deployment: Deployment) -> Self {
        DesiredObject::Deployment(deployment)
    }
}

impl From<Service> for DesiredObject {
    fn from(service: Service) -> Self {
        DesiredObject::Service(service)
    }
}

/// Builder output. `None` as object is an invariant violation caught by the driver.
pub type BuildResult = Result<(Option<DesiredObject>, DesiredState), BuildError>;

/// A named builder in the ordered resource list
pub struct Resource<'a> {
    name: &'static str,
    build: Box<dyn Fn() -> BuildResult + Send + Sync + 'a>,
}

impl<'a> Resource<'a> {
    pub fn new<F>(name: &'static str, build: F) -> Self
    where
        F: Fn() -> BuildResult + Send + Sync + 'a,
    {
        Self {
            name,
            build: Box::new(build),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn build(&self) -> BuildResult {
        (self.build)()
    }
}

impl fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("name", &self.name).finish()
    }
}

/// Port number of a `host:port` address.
///
/// Lenient: a missing colon or a non-numeric port yields `0`.
pub fn get_port(address: &str) -> i32 {
    address
        .split(':')
        .nth(1)
        .and_then(|port| port.parse().ok())
        .unwrap_or(0)
}

fn tcp_port(name: &str, address: &str) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_string()),
        container_port: get_port(address),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

fn selector_labels(app: &str) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), app.to_string())])
}

/// Selector labels plus the recommended `app.kubernetes.io` set
fn pod_labels(app: &str, instance: &str, version: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(app);
    labels.extend([
        (NAME_LABEL.to_string(), "thanos".to_string()),
        (INSTANCE_LABEL.to_string(), label_value(instance)),
        (VERSION_LABEL.to_string(), label_value(version)),
        (COMPONENT_LABEL.to_string(), app.to_string()),
        (MANAGED_BY_LABEL.to_string(), MANAGED_BY.to_string()),
    ]);
    labels
}

/// Coerce `value` into a valid label value.
///
/// Characters outside `[A-Za-z0-9._-]` become `-`, the result is cut to 63
/// characters and must start and end with an alphanumeric character.
fn label_value(value: &str) -> String {
    let sanitized: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .take(LABEL_VALUE_MAX_LEN)
        .collect();

    sanitized
        .trim_matches(|c: char| !c.is_ascii_alphanumeric())
        .to_string()
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}

/// Metadata with only name and namespace, used for deletion markers
fn bare_metadata(name: &str, namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_port() {
        assert_eq!(get_port("10.0.0.1:10901"), 10901);
        assert_eq!(get_port("0.0.0.0:10902"), 10902);
        assert_eq!(get_port(":9090"), 9090);
    }

    #[test]
    fn test_get_port_is_lenient() {
        assert_eq!(get_port("no-colon-here"), 0);
        assert_eq!(get_port("localhost:http"), 0);
        assert_eq!(get_port("localhost:"), 0);
        assert_eq!(get_port(""), 0);
        assert_eq!(get_port("[::1]:10901"), 0);
    }

    #[test]
    fn test_pod_labels() {
        let labels = pod_labels("query", "my-thanos", "v0.9.0");

        assert_eq!(labels.get("app"), Some(&"query".to_string()));
        assert_eq!(labels.get(INSTANCE_LABEL), Some(&"my-thanos".to_string()));
        assert_eq!(labels.get(VERSION_LABEL), Some(&"v0.9.0".to_string()));
        assert_eq!(labels.get(MANAGED_BY_LABEL), Some(&MANAGED_BY.to_string()));
    }

    #[test]
    fn test_pod_labels_fit_label_value_limit() {
        let instance = "a".repeat(80);
        let tag = format!("v1.0.0-{}", "b".repeat(100));

        let labels = pod_labels("store", &instance, &tag);

        assert_eq!(labels[INSTANCE_LABEL], "a".repeat(LABEL_VALUE_MAX_LEN));
        assert_eq!(labels[VERSION_LABEL].len(), LABEL_VALUE_MAX_LEN);
        assert!(labels[VERSION_LABEL].starts_with("v1.0.0-b"));
    }

    #[test]
    fn test_label_value() {
        assert_eq!(label_value("my-thanos"), "my-thanos");
        assert_eq!(label_value("v0.9.0"), "v0.9.0");
        assert_eq!(label_value("_debug+build."), "debug-build");
        assert_eq!(label_value(&format!("{}-x", "a".repeat(62))), "a".repeat(62));
        assert_eq!(label_value("---"), "");
    }

    #[test]
    fn test_resource_debug_shows_name() {
        let resource = Resource::new("query-deployment", || Ok((None, DesiredState::Absent)));
        assert_eq!(format!("{resource:?}"), r#"Resource { name: "query-deployment" }"#);
        assert_eq!(resource.name(), "query-deployment");
    }
}
