//! # Component Reconciler
//!
//! Drives one reconciliation pass over the managed objects of a Thanos resource.

use crate::error::{Error, Result};
use crate::resource_reconciler::ResourceReconciler;
use crate::resources::{Resource, QUERY_DEPLOYMENT, STORE_DEPLOYMENT, STORE_SERVICE};
use kube::runtime::controller::Action;
use kube::ResourceExt;
use thanos_operator_sdk::{Component, ObjectStore, Thanos};
use tracing::{debug, info};

/// Reconciler context for one pass over a single Thanos resource
pub struct ThanosComponentReconciler<'a> {
    thanos: Thanos,
    namespace: String,
    object_stores: Vec<ObjectStore>,
    engine: &'a dyn ResourceReconciler,
}

impl<'a> ThanosComponentReconciler<'a> {
    /// Create a reconciler with defaults applied to every configured component
    pub fn new(
        thanos: Thanos,
        object_stores: Vec<ObjectStore>,
        engine: &'a dyn ResourceReconciler,
    ) -> Result<Self> {
        let namespace = thanos
            .namespace()
            .ok_or_else(|| Error::MissingNamespace(thanos.name_any()))?;

        let mut reconciler = Self {
            thanos,
            namespace,
            object_stores,
            engine,
        };
        reconciler.set_defaults()?;
        Ok(reconciler)
    }

    fn set_defaults(&mut self) -> Result<()> {
        let spec = &mut self.thanos.spec;
        if let Some(query) = spec.query.as_mut() {
            *query = query.with_defaults()?;
        }
        if let Some(store) = spec.store_gateway.as_mut() {
            *store = store.with_defaults()?;
        }
        Ok(())
    }

    pub fn thanos(&self) -> &Thanos {
        &self.thanos
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn object_stores(&self) -> &[ObjectStore] {
        &self.object_stores
    }

    /// Name of the Thanos resource, used as instance label
    pub fn instance(&self) -> String {
        self.thanos.name_any()
    }

    /// Managed objects in reconciliation order
    pub fn resources(&self) -> Vec<Resource<'_>> {
        vec![
            Resource::new(QUERY_DEPLOYMENT, || self.query_deployment()),
            Resource::new(STORE_DEPLOYMENT, || self.store_deployment()),
            Resource::new(STORE_SERVICE, || self.store_service()),
        ]
    }

    /// Run one pass. `Some(action)` means the pass stopped early.
    pub async fn reconcile(&self) -> Result<Option<Action>> {
        reconcile_resources(self.engine, &self.resources()).await
    }
}

/// Build and reconcile every resource in order.
///
/// Stops at the first error or at the first non-empty engine result, which is
/// returned unchanged. Resources after that point are not built.
pub async fn reconcile_resources(
    engine: &dyn ResourceReconciler,
    resources: &[Resource<'_>],
) -> Result<Option<Action>> {
    for resource in resources {
        let (object, state) = resource.build().map_err(|source| Error::Build {
            resource: resource.name(),
            source,
        })?;

        let object = object.ok_or(Error::MissingObject {
            resource: resource.name(),
        })?;

        debug!(resource = resource.name(), ?state, "Reconciling resource");

        let result = engine
            .reconcile_resource(object, state)
            .await
            .map_err(|source| Error::Apply {
                resource: resource.name(),
                source,
            })?;

        if result.is_some() {
            info!(resource = resource.name(), "Resource requested early return");
            return Ok(result);
        }
    }

    Ok(None)
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::ApplyError;
    use crate::resource_reconciler::ResourceReconciler;
    use crate::resources::{DesiredObject, DesiredState};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use kube::runtime::controller::Action;
    use kube::Client;
    use std::sync::Mutex;
    use thanos_operator_sdk::{ObjectStore, ObjectStoreConfig, ObjectStoreSpec, Thanos, ThanosSpec};
    use tower_test::mock;

    pub type MockHandle = mock::Handle<http::Request<hyper::Body>, http::Response<hyper::Body>>;

    /// Kube client whose requests are answered through the returned handle
    pub fn mock_client() -> (Client, MockHandle) {
        let (service, handle) = mock::pair();
        (Client::new(service, "default"), handle)
    }

    pub fn thanos(spec: ThanosSpec) -> Thanos {
        let mut thanos = Thanos::new("thanos-sample", spec);
        thanos.metadata.namespace = Some("monitoring".to_string());
        thanos
    }

    pub fn object_store(name: &str, secret: &str, key: &str) -> ObjectStore {
        let mut store = ObjectStore::new(
            name,
            ObjectStoreSpec {
                config: ObjectStoreConfig {
                    name: secret.to_string(),
                    key: key.to_string(),
                },
            },
        );
        store.metadata.namespace = Some("monitoring".to_string());
        store
    }

    /// In-memory engine recording every call
    #[derive(Default)]
    pub struct RecordingReconciler {
        pub calls: Mutex<Vec<(DesiredObject, DesiredState)>>,
        /// Call index answered with `Some(action)`
        pub short_circuit_at: Option<(usize, Action)>,
        /// Call index answered with an error
        pub fail_at: Option<usize>,
    }

    impl RecordingReconciler {
        pub fn names(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(object, _)| object.metadata().name.clone().unwrap_or_default())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl ResourceReconciler for RecordingReconciler {
        async fn reconcile_resource(
            &self,
            object: DesiredObject,
            state: DesiredState,
        ) -> Result<Option<Action>, ApplyError> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((object.clone(), state));
                calls.len() - 1
            };

            if self.fail_at == Some(index) {
                return Err(ApplyError::MissingName(object.kind()));
            }

            Ok(self
                .short_circuit_at
                .as_ref()
                .filter(|(at, _)| *at == index)
                .map(|(_, action)| action.clone()))
        }
    }

    pub fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("monitoring".to_string()),
            ..Default::default()
        }
    }
}
