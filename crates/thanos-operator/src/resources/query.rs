use super::{
    bare_metadata, non_empty, pod_labels, selector_labels, tcp_port, BuildResult, DesiredState,
};
use crate::reconciler::ThanosComponentReconciler;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use thanos_operator_sdk::Component;

pub const QUERY_DEPLOYMENT: &str = "query-deployment";

impl ThanosComponentReconciler<'_> {
    /// Query deployment, or a deletion marker when the query component is unset
    pub fn query_deployment(&self) -> BuildResult {
        let name = QUERY_DEPLOYMENT;
        let namespace = self.namespace();

        let Some(query) = self.thanos().spec.query.as_ref() else {
            let delete = Deployment {
                metadata: bare_metadata(name, namespace),
                ..Default::default()
            };
            return Ok((Some(delete.into()), DesiredState::Absent));
        };

        let query = query.with_defaults()?;

        let container = Container {
            name: "query".to_string(),
            image: Some(query.image.reference()),
            image_pull_policy: Some(query.image.pull_policy.clone()),
            args: Some(vec![
                "query".to_string(),
                format!("--grpc-address={}", query.grpc_address),
                format!("--http-address={}", query.http_address),
            ]),
            ports: Some(vec![
                tcp_port("http", &query.http_address),
                tcp_port("grpc", &query.grpc_address),
            ]),
            resources: Some(query.resources.clone()),
            ..Default::default()
        };

        let template = PodTemplateSpec {
            metadata: Some(ObjectMeta {
                name: Some("query".to_string()),
                labels: Some(pod_labels("query", &self.instance(), &query.image.tag)),
                annotations: non_empty(&query.annotations),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![container],
                ..Default::default()
            }),
        };

        let deployment = Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                labels: non_empty(&query.labels),
                annotations: non_empty(&query.annotations),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(1),
                selector: LabelSelector {
                    match_labels: Some(selector_labels("query")),
                    ..Default::default()
                },
                template,
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok((Some(deployment.into()), DesiredState::Present))
    }
}
