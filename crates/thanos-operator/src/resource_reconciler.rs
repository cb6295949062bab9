//! # Resource Reconciler
//!
//! Applies or deletes a single desired object against the cluster.

use crate::error::ApplyError;
use crate::resources::{DesiredObject, DesiredState};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::runtime::controller::Action;
use kube::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::time::Duration;
use tracing::{debug, info, instrument, Level};

/// Requeue delay while a deleted object is still terminating
pub const DELETE_REQUEUE: Duration = Duration::from_secs(5);

/// Generic apply-or-delete primitive.
///
/// `Ok(Some(action))` asks the caller to stop the current pass and return
/// `action`; `Ok(None)` lets it continue with the next object.
#[async_trait::async_trait]
pub trait ResourceReconciler: Send + Sync {
    async fn reconcile_resource(
        &self,
        object: DesiredObject,
        state: DesiredState,
    ) -> Result<Option<Action>, ApplyError>;
}

/// Kube backed reconciler using server-side apply
#[derive(Clone)]
pub struct GenericResourceReconciler {
    client: Client,
    field_manager: String,
    owner: Option<OwnerReference>,
}

impl GenericResourceReconciler {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            owner: None,
        }
    }

    /// Attach `owner` to every applied object
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner = Some(owner);
        self
    }

    async fn apply<K>(
        &self,
        namespace: &str,
        name: &str,
        object: &K,
    ) -> Result<Option<Action>, ApplyError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let params = PatchParams::apply(&self.field_manager).force();

        api.patch(name, &params, &Patch::Apply(object)).await?;
        debug!("Applied object.");
        Ok(None)
    }

    async fn delete<K>(&self, namespace: &str, name: &str) -> Result<Option<Action>, ApplyError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Debug
            + DeserializeOwned,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);

        match api.delete(name, &DeleteParams::default()).await {
            Ok(deleted) if deleted.is_left() => {
                debug!("Deletion in progress.");
                Ok(Some(Action::requeue(DELETE_REQUEUE)))
            }
            Ok(_) => {
                info!("Deleted object.");
                Ok(None)
            }
            Err(kube::Error::Api(e)) if e.code == 404 => {
                debug!("Object already absent.");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Add `owner` unless an owner with the same uid is already present
pub fn add_owner(metadata: &mut ObjectMeta, owner: &OwnerReference) {
    let owners = metadata.owner_references.get_or_insert_with(Vec::new);
    if !owners.iter().any(|existing| existing.uid == owner.uid) {
        owners.push(owner.clone());
    }
}

#[async_trait::async_trait]
impl ResourceReconciler for GenericResourceReconciler {
    #[instrument(
        skip(self, object),
        fields(kind = object.kind(), name = object.metadata().name),
        err(level = Level::WARN)
    )]
    async fn reconcile_resource(
        &self,
        mut object: DesiredObject,
        state: DesiredState,
    ) -> Result<Option<Action>, ApplyError> {
        let kind = object.kind();
        let metadata = object.metadata();
        let name = metadata.name.clone().ok_or(ApplyError::MissingName(kind))?;
        let namespace = metadata
            .namespace
            .clone()
            .ok_or_else(|| ApplyError::MissingNamespace {
                kind,
                name: name.clone(),
            })?;

        match state {
            DesiredState::Present => {
                if let Some(owner) = &self.owner {
                    add_owner(object.metadata_mut(), owner);
                }

                match &object {
                    DesiredObject::Deployment(deployment) => {
                        self.apply(&namespace, &name, deployment).await
                    }
                    DesiredObject::Service(service) => self.apply(&namespace, &name, service).await,
                }
            }
            DesiredState::Absent => match object {
                DesiredObject::Deployment(_) => self.delete::<Deployment>(&namespace, &name).await,
                DesiredObject::Service(_) => self.delete::<Service>(&namespace, &name).await,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::testing::{meta, mock_client, MockHandle};
    use http::{Method, Response, StatusCode};
    use hyper::Body;
    use serde_json::{json, Value};
    use tokio::task::JoinHandle;

    fn owner(uid: &str) -> OwnerReference {
        OwnerReference {
            api_version: "monitoring.thanos.io/v1alpha1".to_string(),
            kind: "Thanos".to_string(),
            name: "thanos-sample".to_string(),
            uid: uid.to_string(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    fn deployment(name: &str) -> DesiredObject {
        Deployment {
            metadata: meta(name),
            ..Default::default()
        }
        .into()
    }

    fn service(name: &str) -> DesiredObject {
        Service {
            metadata: meta(name),
            ..Default::default()
        }
        .into()
    }

    /// Request as seen by the API server
    struct Received {
        method: Method,
        path: String,
        query: String,
        body: Value,
    }

    /// Answer the next request with `status` and `body`, or echo the request body
    fn serve_once(
        mut handle: MockHandle,
        status: StatusCode,
        body: Option<Value>,
    ) -> JoinHandle<Received> {
        tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("no request sent");
            let (parts, request_body) = request.into_parts();
            let bytes = hyper::body::to_bytes(request_body).await.unwrap();
            let received: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            let response_body = body.unwrap_or_else(|| received.clone());
            send.send_response(
                Response::builder()
                    .status(status)
                    .body(Body::from(response_body.to_string()))
                    .unwrap(),
            );

            Received {
                method: parts.method,
                path: parts.uri.path().to_string(),
                query: parts.uri.query().unwrap_or_default().to_string(),
                body: received,
            }
        })
    }

    fn not_found() -> Value {
        json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "not found",
            "reason": "NotFound",
            "code": 404
        })
    }

    #[test]
    fn test_add_owner() {
        let mut metadata = ObjectMeta::default();

        add_owner(&mut metadata, &owner("1234"));
        add_owner(&mut metadata, &owner("1234"));
        add_owner(&mut metadata, &owner("5678"));

        let owners = metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].uid, "1234");
        assert_eq!(owners[1].uid, "5678");
    }

    #[tokio::test]
    async fn test_present_deployment_is_applied_with_owner() {
        let (client, handle) = mock_client();
        let engine =
            GenericResourceReconciler::new(client, "thanos-operator").with_owner(owner("1234"));
        let server = serve_once(handle, StatusCode::OK, None);

        let result = engine
            .reconcile_resource(deployment("query-deployment"), DesiredState::Present)
            .await
            .unwrap();
        let received = server.await.unwrap();

        assert!(result.is_none());
        assert_eq!(received.method, Method::PATCH);
        assert_eq!(
            received.path,
            "/apis/apps/v1/namespaces/monitoring/deployments/query-deployment"
        );
        assert!(received.query.contains("fieldManager=thanos-operator"));
        assert!(received.query.contains("force=true"));
        assert_eq!(received.body["metadata"]["ownerReferences"][0]["uid"], "1234");
    }

    #[tokio::test]
    async fn test_present_service_without_owner() {
        let (client, handle) = mock_client();
        let engine = GenericResourceReconciler::new(client, "thanos-operator");
        let server = serve_once(handle, StatusCode::OK, None);

        let result = engine
            .reconcile_resource(service("store-service"), DesiredState::Present)
            .await
            .unwrap();
        let received = server.await.unwrap();

        assert!(result.is_none());
        assert_eq!(received.method, Method::PATCH);
        assert_eq!(received.path, "/api/v1/namespaces/monitoring/services/store-service");
        assert!(received.body["metadata"].get("ownerReferences").is_none());
    }

    #[tokio::test]
    async fn test_absent_object_is_deleted_without_owner() {
        let (client, handle) = mock_client();
        let engine =
            GenericResourceReconciler::new(client, "thanos-operator").with_owner(owner("1234"));
        let status = json!({"kind": "Status", "apiVersion": "v1", "status": "Success"});
        let server = serve_once(handle, StatusCode::OK, Some(status));

        let result = engine
            .reconcile_resource(service("store-service"), DesiredState::Absent)
            .await
            .unwrap();
        let received = server.await.unwrap();

        assert!(result.is_none());
        assert_eq!(received.method, Method::DELETE);
        assert_eq!(received.path, "/api/v1/namespaces/monitoring/services/store-service");
        assert!(!received.body.to_string().contains("ownerReferences"));
    }

    #[tokio::test]
    async fn test_delete_of_missing_object_succeeds() {
        let (client, handle) = mock_client();
        let engine = GenericResourceReconciler::new(client, "thanos-operator");
        let server = serve_once(handle, StatusCode::NOT_FOUND, Some(not_found()));

        let result = engine
            .reconcile_resource(deployment("store-deployment"), DesiredState::Absent)
            .await
            .unwrap();
        let received = server.await.unwrap();

        assert!(result.is_none());
        assert_eq!(received.method, Method::DELETE);
        assert_eq!(
            received.path,
            "/apis/apps/v1/namespaces/monitoring/deployments/store-deployment"
        );
    }

    #[tokio::test]
    async fn test_terminating_object_requeues() {
        let (client, handle) = mock_client();
        let engine = GenericResourceReconciler::new(client, "thanos-operator");
        let terminating = json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {
                "name": "query-deployment",
                "namespace": "monitoring",
                "deletionTimestamp": "2024-01-01T00:00:00Z"
            }
        });
        let server = serve_once(handle, StatusCode::OK, Some(terminating));

        let result = engine
            .reconcile_resource(deployment("query-deployment"), DesiredState::Absent)
            .await
            .unwrap();
        server.await.unwrap();

        assert_eq!(result, Some(Action::requeue(DELETE_REQUEUE)));
    }

    #[tokio::test]
    async fn test_server_error_is_returned() {
        let (client, handle) = mock_client();
        let engine = GenericResourceReconciler::new(client, "thanos-operator");
        let failure = json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "etcd unavailable",
            "reason": "InternalError",
            "code": 500
        });
        let server = serve_once(handle, StatusCode::INTERNAL_SERVER_ERROR, Some(failure));

        let err = engine
            .reconcile_resource(deployment("query-deployment"), DesiredState::Absent)
            .await
            .unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, ApplyError::Kube(kube::Error::Api(e)) if e.code == 500));
    }

    #[tokio::test]
    async fn test_object_without_name_or_namespace() {
        let (client, _handle) = mock_client();
        let engine = GenericResourceReconciler::new(client, "thanos-operator");

        let err = engine
            .reconcile_resource(Deployment::default().into(), DesiredState::Present)
            .await
            .unwrap_err();
        assert!(matches!(err, ApplyError::MissingName("Deployment")));

        let unscoped = Service {
            metadata: ObjectMeta {
                name: Some("store-service".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = engine
            .reconcile_resource(unscoped.into(), DesiredState::Absent)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplyError::MissingNamespace { kind: "Service", ref name } if name == "store-service"
        ));
    }
}
